//! Fan-out of one validated search across every (participant, field) pair.
//!
//! A search for D datasets and F fields becomes D×F [`CallTask`]s. All tasks
//! are spawned together on a [`JoinSet`] and the dispatcher waits until every
//! one of them has produced a [`CallOutcome`]. Each task carries its own
//! timeout, so a slow participant only fails its own pairs and never delays or
//! cancels its siblings beyond that bound.

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::time::Instant;
use tokio::task::JoinSet;
use url::Url;

use crate::client::query_participant;
use crate::config::Timeouts;
use crate::errors::{CallError, FederationError};
use crate::metrics_defs::{CALL_DURATION, CALL_ERRORS};
use crate::protocol::ValidatedSearch;
use crate::registry::ParticipantRegistry;

/// One scheduled participant call
#[derive(Clone, Debug, PartialEq)]
pub struct CallTask {
    /// Position in the planned batch: dataset order first, then field order
    pub seq: usize,
    pub participant: String,
    pub endpoint: Url,
    pub field: String,
    pub query: String,
}

/// Terminal result of one [`CallTask`]
#[derive(Clone, Debug, PartialEq)]
pub struct CallOutcome {
    pub seq: usize,
    pub participant: String,
    pub endpoint: Url,
    pub field: String,
    pub result: Result<Vec<JsonValue>, CallError>,
}

impl CallOutcome {
    fn new(task: CallTask, result: Result<Vec<JsonValue>, CallError>) -> Self {
        Self {
            seq: task.seq,
            participant: task.participant,
            endpoint: task.endpoint,
            field: task.field,
            result,
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    /// Shared connection pool for every call of every request
    client: reqwest::Client,
    registry: ParticipantRegistry,
    timeouts: Timeouts,
}

impl Dispatcher {
    pub fn new(registry: ParticipantRegistry, timeouts: Timeouts) -> Result<Self, FederationError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            registry,
            timeouts,
        })
    }

    /// Builds one task per (dataset, field) pair.
    ///
    /// Fails without producing any task if a dataset is not registered.
    pub fn plan(&self, search: &ValidatedSearch) -> Result<Vec<CallTask>, FederationError> {
        let participants = self.registry.resolve(&search.datasets)?;

        let tasks = participants
            .iter()
            .flat_map(|(participant, endpoint)| {
                search
                    .fields
                    .iter()
                    .map(move |field| (participant, endpoint, field))
            })
            .enumerate()
            .map(|(seq, (participant, endpoint, field))| CallTask {
                seq,
                participant: participant.clone(),
                endpoint: endpoint.clone(),
                field: field.clone(),
                query: search.search_text.clone(),
            })
            .collect();

        Ok(tasks)
    }

    /// Runs every task concurrently and returns one outcome per task, in
    /// completion order.
    pub async fn dispatch(&self, tasks: Vec<CallTask>) -> Vec<CallOutcome> {
        let client = self.client.clone();
        let call_timeout = self.timeouts.http_timeout;

        dispatch_with(tasks, move |task| {
            let client = client.clone();
            async move {
                let started = Instant::now();
                let result = query_participant(
                    &client,
                    &task.participant,
                    &task.endpoint,
                    &task.field,
                    &task.query,
                    call_timeout,
                )
                .await;
                record_call(&task, &result, started);
                CallOutcome::new(task, result)
            }
        })
        .await
    }
}

/// Spawns `call` for every task on one [`JoinSet`] and collects an outcome per
/// task. A task that panics yields a [`CallError::TaskFailed`] outcome for its
/// own pair.
async fn dispatch_with<F, Fut>(tasks: Vec<CallTask>, call: F) -> Vec<CallOutcome>
where
    F: Fn(CallTask) -> Fut,
    Fut: Future<Output = CallOutcome> + Send + 'static,
{
    let mut join_set = JoinSet::new();

    // Tracked outside the tasks so a panicking task still yields an outcome
    let mut in_flight: HashMap<tokio::task::Id, CallTask> = HashMap::new();

    for task in tasks {
        let tracked = task.clone();
        let abort_handle = join_set.spawn(call(task));
        in_flight.insert(abort_handle.id(), tracked);
    }

    let mut outcomes = Vec::with_capacity(in_flight.len());

    while let Some(join_result) = join_set.join_next_with_id().await {
        match join_result {
            Ok((task_id, outcome)) => {
                in_flight.remove(&task_id);
                outcomes.push(outcome);
            }
            Err(e) => {
                tracing::error!(error = %e, "Call task failed");
                if let Some(task) = in_flight.remove(&e.id()) {
                    let error = CallError::TaskFailed {
                        participant: task.participant.clone(),
                        message: e.to_string(),
                    };
                    outcomes.push(CallOutcome::new(task, Err(error)));
                }
            }
        }
    }

    outcomes
}

fn record_call(task: &CallTask, result: &Result<Vec<JsonValue>, CallError>, started: Instant) {
    let outcome = match result {
        Ok(results) => {
            tracing::debug!(
                participant = %task.participant,
                field = %task.field,
                results = results.len(),
                "Participant call succeeded"
            );
            "success"
        }
        Err(e) => {
            tracing::warn!(
                participant = %task.participant,
                field = %task.field,
                error = %e,
                "Participant call failed"
            );
            shared::counter!(
                CALL_ERRORS,
                "participant" => task.participant.clone(),
                "kind" => e.kind()
            )
            .increment(1);
            "error"
        }
    };

    shared::histogram!(
        CALL_DURATION,
        "participant" => task.participant.clone(),
        "outcome" => outcome
    )
    .record(started.elapsed().as_secs_f64());
}
