use axum::routing::get;
use axum::{Json, Router};
use catalog::{CatalogError, CatalogStore, PgCatalogStore};
use federation::{FederationError, ParticipantRegistry, SearchService};
use serde_json::{Value as JsonValue, json};
use shared::admin_service::admin_router;
use shared::http::run_http_service;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use url::Url;

use crate::config::{Config, CorsConfig};

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("federation error: {0}")]
    Federation(#[from] FederationError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Assembles the public API: `/ping`, federated search, and the catalog
/// endpoints when a store is available.
pub fn build_router(
    cors: &CorsConfig,
    search: SearchService,
    store: Option<Arc<dyn CatalogStore>>,
) -> Router {
    let mut router = Router::new()
        .route("/ping", get(ping))
        .merge(federation::router(search));

    if let Some(store) = store {
        router = router.merge(catalog::router(store));
    }

    if cors.allow_any_origin {
        router = router.layer(CorsLayer::permissive());
    }

    router.layer(TraceLayer::new_for_http())
}

async fn ping() -> Json<JsonValue> {
    Json(json!({ "ping": "pong" }))
}

/// Participants registered in the catalog that have a usable search URL.
async fn catalog_participants(
    store: &dyn CatalogStore,
) -> Result<Vec<(String, Url)>, CatalogError> {
    let participants = store.list_participants().await?;

    Ok(participants
        .into_iter()
        .filter_map(|participant| {
            let Some(base_url) = participant.base_url.as_deref() else {
                tracing::warn!(
                    participant = %participant.participant_name,
                    "Skipping catalog participant without base_url"
                );
                return None;
            };
            match Url::parse(base_url) {
                Ok(url) => Some((participant.participant_name, url)),
                Err(e) => {
                    tracing::warn!(
                        participant = %participant.participant_name,
                        base_url,
                        error = %e,
                        "Skipping catalog participant with invalid base_url"
                    );
                    None
                }
            }
        })
        .collect())
}

async fn build_registry(
    config: &Config,
    store: Option<&dyn CatalogStore>,
) -> Result<ParticipantRegistry, CatalogError> {
    let registry = ParticipantRegistry::from_config(&config.federation.participants);

    let registry = match store {
        Some(store) if config.federation.load_participants_from_catalog => {
            registry.with_additional(catalog_participants(store).await?)
        }
        _ => registry,
    };

    tracing::info!(
        participants = ?registry.names().collect::<Vec<_>>(),
        "Participant registry loaded"
    );
    Ok(registry)
}

pub async fn run(config: Config) -> Result<(), GatewayError> {
    let store = match &config.catalog {
        Some(catalog_config) => {
            let store: Arc<dyn CatalogStore> =
                Arc::new(PgCatalogStore::open(catalog_config).await?);
            Some(store)
        }
        None => {
            tracing::info!("No catalog configured, catalog endpoints disabled");
            None
        }
    };

    let registry = build_registry(&config, store.as_deref()).await?;
    let search = SearchService::from_config(&config.federation, registry)?;
    let app = build_router(&config.cors, search, store.clone());

    let admin = admin_router(move || store.as_ref().is_none_or(|store| store.is_ready()));

    tokio::try_join!(
        run_http_service(&config.listener, app),
        run_http_service(&config.admin_listener, admin),
    )?;

    tracing::info!("Gateway stopped");
    Ok(())
}
