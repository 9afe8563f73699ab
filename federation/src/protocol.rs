//! Wire types for `POST /federated-search` and for the participant search API.
//!
//! # Inbound request
//!
//! ```json
//! {
//!   "category": ["biodiversity"],
//!   "dataset": ["kew", "cpmp"],
//!   "fields": ["taxon_scientific_name"],
//!   "search_text": "Rosa"
//! }
//! ```
//!
//! # Response
//!
//! ```json
//! {
//!   "category": ["biodiversity"],
//!   "dataset": ["kew", "cpmp"],
//!   "fields": ["taxon_scientific_name"],
//!   "search_text": "Rosa",
//!   "results": {
//!     "kew": {
//!       "api_url": "http://134.209.145.106:8000/search",
//!       "field_results": {
//!         "taxon_scientific_name": {"results": [{"id": 1}], "error": null}
//!       }
//!     },
//!     "cpmp": {
//!       "api_url": "http://139.59.84.243:8050/search",
//!       "field_results": {
//!         "taxon_scientific_name": {"results": [], "error": "cpmp timed out after 10s"}
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! # Participant call
//!
//! `GET <participant_url>?field=<field>&query=<search_text>` answering
//! `{"results": [...]}`.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::errors::FederationError;

/// The category every federated search must include
pub const BIODIVERSITY_CATEGORY: &str = "biodiversity";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    #[serde(rename = "category")]
    pub categories: Vec<String>,

    /// Participant (dataset) identifiers to query
    #[serde(rename = "dataset")]
    pub datasets: Vec<String>,

    /// Fields to query every participant for. Defaults apply when empty.
    #[serde(default)]
    pub fields: Vec<String>,

    pub search_text: String,
}

/// A search request that passed validation, with datasets and fields
/// de-duplicated in first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSearch {
    pub datasets: Vec<String>,
    pub fields: Vec<String>,
    pub search_text: String,
}

impl SearchRequest {
    /// Checks the request-level invariants that do not depend on the registry.
    pub fn validate(&self, default_fields: &[String]) -> Result<ValidatedSearch, FederationError> {
        let has_biodiversity = self
            .categories
            .iter()
            .any(|category| category.to_lowercase() == BIODIVERSITY_CATEGORY);
        if !has_biodiversity {
            return Err(FederationError::MissingBiodiversityCategory);
        }

        let datasets: IndexSet<&String> = self.datasets.iter().collect();
        if datasets.is_empty() {
            return Err(FederationError::NoDatasets);
        }

        let requested = if self.fields.is_empty() {
            default_fields
        } else {
            &self.fields
        };
        let fields: IndexSet<&String> = requested.iter().collect();
        if fields.is_empty() {
            return Err(FederationError::NoFields);
        }

        Ok(ValidatedSearch {
            datasets: datasets.into_iter().cloned().collect(),
            fields: fields.into_iter().cloned().collect(),
            search_text: self.search_text.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    #[serde(rename = "category")]
    pub categories: Vec<String>,

    #[serde(rename = "dataset")]
    pub datasets: Vec<String>,

    /// The fields that were actually queried
    pub fields: Vec<String>,

    pub search_text: String,

    /// Participant name to its per-field results
    pub results: IndexMap<String, ParticipantResults>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantResults {
    pub api_url: String,
    pub field_results: IndexMap<String, FieldResult>,
}

/// Outcome of querying one participant for one field.
///
/// `error` is only set when the call failed; an empty `results` list with no
/// error means the participant found nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldResult {
    pub results: Vec<JsonValue>,
    pub error: Option<String>,
}

/// Body returned by a participant search endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantResponse {
    pub results: Vec<JsonValue>,
}
