pub mod aggregator;
mod client;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod handler;
pub mod metrics_defs;
pub mod protocol;
pub mod registry;

#[cfg(test)]
mod testutils;

pub use config::Config;
pub use errors::{CallError, FederationError};
pub use handler::{SearchService, router};
pub use registry::ParticipantRegistry;
