//! Participant Registry
//!
//! Maps dataset identifiers to the search endpoint of the participant serving
//! that dataset.
//!
//! ```text
//! "kew"  → http://134.209.145.106:8000/search
//! "cpmp" → http://139.59.84.243:8050/search
//! ```
//!
//! The registry is built once at startup from configuration (and optionally
//! the catalog) and is immutable while requests are processed, so it is shared
//! between concurrent searches without locking.

use indexmap::IndexMap;
use std::sync::Arc;
use url::Url;

use crate::config::ParticipantConfig;
use crate::errors::FederationError;

#[derive(Clone, Debug, Default)]
pub struct ParticipantRegistry {
    /// Participant name to endpoint, in registration order
    participants: Arc<IndexMap<String, Url>>,
}

impl ParticipantRegistry {
    /// Builds a registry from `(name, endpoint)` pairs. The first entry for a
    /// name wins.
    pub fn new(participants: impl IntoIterator<Item = (String, Url)>) -> Self {
        let mut map = IndexMap::new();
        for (name, url) in participants {
            map.entry(name).or_insert(url);
        }

        Self {
            participants: Arc::new(map),
        }
    }

    pub fn from_config(participants: &[ParticipantConfig]) -> Self {
        Self::new(
            participants
                .iter()
                .map(|participant| (participant.name.clone(), participant.url.clone())),
        )
    }

    /// Returns a new registry with `additional` participants appended.
    /// Names already registered keep their existing endpoint.
    pub fn with_additional(&self, additional: impl IntoIterator<Item = (String, Url)>) -> Self {
        let existing = self
            .participants
            .iter()
            .map(|(name, url)| (name.clone(), url.clone()));
        Self::new(existing.chain(additional))
    }

    pub fn get(&self, name: &str) -> Option<&Url> {
        self.participants.get(name)
    }

    /// Participant names in registration order
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.participants.keys()
    }

    /// Resolves every dataset to its endpoint, preserving the given order.
    ///
    /// Fails with all unresolvable names if any dataset is not registered.
    pub fn resolve(&self, datasets: &[String]) -> Result<Vec<(String, Url)>, FederationError> {
        let mut resolved = Vec::with_capacity(datasets.len());
        let mut unknown = Vec::new();

        for dataset in datasets {
            match self.participants.get(dataset) {
                Some(url) => resolved.push((dataset.clone(), url.clone())),
                None => unknown.push(dataset.clone()),
            }
        }

        if !unknown.is_empty() {
            return Err(FederationError::UnknownDatasets(unknown));
        }

        Ok(resolved)
    }
}
