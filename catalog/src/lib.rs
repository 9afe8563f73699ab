//! Biodiversity metadata catalog: categories, datasets, participants and the
//! mapping of participant columns onto federated fields.

pub mod api;
pub mod config;
pub mod errors;
pub mod metrics_defs;
pub mod store;
pub mod tree;
pub mod types;

#[cfg(test)]
mod testutils;

pub use api::router;
pub use config::Config;
pub use errors::CatalogError;
pub use store::{CatalogStore, PgCatalogStore};
