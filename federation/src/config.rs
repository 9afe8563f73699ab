use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("HTTP timeout cannot be 0")]
    InvalidTimeout,

    #[error("Empty participant name")]
    EmptyParticipantName,

    #[error("Duplicate participant name: {0}")]
    DuplicateParticipant(String),

    #[error("Empty default field name")]
    EmptyDefaultField,
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_fields() -> Vec<String> {
    vec!["vernacular_name_common_names".to_string()]
}

/// Federated search configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Upper bound for a single participant call, including reading the body
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Fields queried when a search request does not name any
    #[serde(default = "default_fields")]
    pub default_fields: Vec<String>,
    /// Also register the participants stored in the catalog at startup
    #[serde(default)]
    pub load_participants_from_catalog: bool,
    /// Statically registered participants, keyed by dataset identifier
    #[serde(default)]
    pub participants: Vec<ParticipantConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout_secs(),
            default_fields: default_fields(),
            load_participants_from_catalog: false,
            participants: Vec::new(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.http_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }

        if self.default_fields.iter().any(|field| field.is_empty()) {
            return Err(ValidationError::EmptyDefaultField);
        }

        let mut names = HashSet::new();
        for participant in &self.participants {
            if participant.name.is_empty() {
                return Err(ValidationError::EmptyParticipantName);
            }

            if !names.insert(&participant.name) {
                return Err(ValidationError::DuplicateParticipant(
                    participant.name.clone(),
                ));
            }
        }

        Ok(())
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            http_timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }
}

/// A participant service answering searches for one dataset
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ParticipantConfig {
    /// Dataset identifier used in search requests (e.g. "kew")
    pub name: String,
    /// Search endpoint of the participant
    pub url: Url,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timeouts {
    pub http_timeout: Duration,
}
