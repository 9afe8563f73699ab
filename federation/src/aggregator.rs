//! Folds the outcomes of one fan-out into the per-participant response tree.
//!
//! - Outer key: participant name; `api_url` comes from its first outcome.
//! - Inner key: field; failed calls keep an empty `results` list and set
//!   `error`.
//! - Fields that produced no outcome are simply absent.
//!
//! Outcomes are put in a total order (planned sequence first) before folding,
//! so the tree, key order included, is the same whatever order the calls
//! completed in. When a pair reports more than once, any error wins over
//! results, and the lowest error in that order is the one reported.

use indexmap::IndexMap;

use crate::dispatcher::CallOutcome;
use crate::protocol::ParticipantResults;

/// Sort key for one outcome; errors rank before results of the same sequence.
fn merge_rank(outcome: &CallOutcome) -> (usize, u8, &'static str, String, String) {
    let (class, kind, detail) = match &outcome.result {
        Err(e) => (0, e.kind(), e.to_string()),
        Ok(results) => (1, "", serde_json::to_string(results).unwrap_or_default()),
    };
    (outcome.seq, class, kind, detail, outcome.endpoint.to_string())
}

pub fn aggregate(mut outcomes: Vec<CallOutcome>) -> IndexMap<String, ParticipantResults> {
    outcomes.sort_by_cached_key(merge_rank);

    let mut aggregated: IndexMap<String, ParticipantResults> = IndexMap::new();

    for outcome in outcomes {
        let participant = aggregated
            .entry(outcome.participant)
            .or_insert_with(|| ParticipantResults {
                api_url: outcome.endpoint.to_string(),
                field_results: IndexMap::new(),
            });

        let field_result = participant.field_results.entry(outcome.field).or_default();

        // The first error in merge order is final and discards any results
        if field_result.error.is_some() {
            continue;
        }
        match outcome.result {
            Ok(results) => field_result.results.extend(results),
            Err(e) => {
                field_result.results.clear();
                field_result.error = Some(e.to_string());
            }
        }
    }

    aggregated
}
