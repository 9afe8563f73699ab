//! `POST /federated-search`
//!
//! Validates the request, plans one call per (dataset, field) pair, runs the
//! fan-out and answers with the aggregated tree. Only request validation
//! errors fail the request (400); participant failures are reported inline
//! with a 200.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Instant;

use crate::aggregator::aggregate;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::errors::FederationError;
use crate::metrics_defs::{FANOUT_WIDTH, SEARCH_DURATION, SEARCH_REQUESTS};
use crate::protocol::{SearchRequest, SearchResponse};
use crate::registry::ParticipantRegistry;

#[derive(Clone)]
pub struct SearchService {
    dispatcher: Dispatcher,
    default_fields: Arc<Vec<String>>,
}

impl SearchService {
    pub fn new(dispatcher: Dispatcher, default_fields: Vec<String>) -> Self {
        Self {
            dispatcher,
            default_fields: Arc::new(default_fields),
        }
    }

    pub fn from_config(
        config: &Config,
        registry: ParticipantRegistry,
    ) -> Result<Self, FederationError> {
        let dispatcher = Dispatcher::new(registry, config.timeouts())?;
        Ok(Self::new(dispatcher, config.default_fields.clone()))
    }

    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, FederationError> {
        let search = request.validate(&self.default_fields)?;
        let tasks = self.dispatcher.plan(&search)?;

        tracing::debug!(
            datasets = search.datasets.len(),
            fields = search.fields.len(),
            calls = tasks.len(),
            "Dispatching federated search"
        );
        shared::histogram!(FANOUT_WIDTH).record(tasks.len() as f64);

        let outcomes = self.dispatcher.dispatch(tasks).await;
        let results = aggregate(outcomes);

        Ok(SearchResponse {
            categories: request.categories,
            datasets: request.datasets,
            fields: search.fields,
            search_text: request.search_text,
            results,
        })
    }
}

pub fn router(service: SearchService) -> Router {
    Router::new()
        .route("/federated-search", post(federated_search))
        .with_state(service)
}

async fn federated_search(
    State(service): State<SearchService>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, FederationError> {
    let started = Instant::now();

    let result = match payload {
        Ok(Json(request)) => service.search(request).await,
        Err(rejection) => Err(FederationError::InvalidBody(rejection.body_text())),
    };

    let status = match &result {
        Ok(_) => "ok",
        Err(e) => {
            tracing::info!(error = %e, "Rejected federated search");
            "rejected"
        }
    };
    shared::counter!(SEARCH_REQUESTS, "status" => status).increment(1);
    shared::histogram!(SEARCH_DURATION).record(started.elapsed().as_secs_f64());

    result.map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timeouts;
    use crate::testutils::{MockBehavior, MockParticipant};
    use axum::body::Body;
    use http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value as JsonValue, json};
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_router(participants: &[(&str, &MockParticipant)], timeout: Duration) -> Router {
        let registry = ParticipantRegistry::new(
            participants
                .iter()
                .map(|(name, mock)| (name.to_string(), mock.url.clone())),
        );
        let dispatcher = Dispatcher::new(registry, Timeouts { http_timeout: timeout }).unwrap();
        router(SearchService::new(
            dispatcher,
            vec!["vernacular_name_common_names".to_string()],
        ))
    }

    async fn post_search(router: Router, body: JsonValue) -> (StatusCode, JsonValue) {
        let request = Request::builder()
            .method("POST")
            .uri("/federated-search")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_kew_succeeds_cpmp_times_out() {
        let kew = MockParticipant::start(|_| MockBehavior::Results(json!([{"id": 1}]))).await;
        let cpmp = MockParticipant::start(|_| {
            MockBehavior::Delay(Duration::from_secs(3), json!([{"id": 2}]))
        })
        .await;
        let router = test_router(
            &[("kew", &kew), ("cpmp", &cpmp)],
            Duration::from_millis(300),
        );

        let (status, body) = post_search(
            router,
            json!({
                "category": ["biodiversity"],
                "dataset": ["kew", "cpmp"],
                "fields": ["taxon_scientific_name"],
                "search_text": "Rosa"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["category"], json!(["biodiversity"]));
        assert_eq!(body["dataset"], json!(["kew", "cpmp"]));
        assert_eq!(body["fields"], json!(["taxon_scientific_name"]));
        assert_eq!(body["search_text"], "Rosa");

        assert_eq!(body["results"]["kew"]["api_url"], kew.url.as_str());
        assert_eq!(
            body["results"]["kew"]["field_results"]["taxon_scientific_name"],
            json!({"results": [{"id": 1}], "error": null})
        );
        assert_eq!(
            body["results"]["cpmp"]["field_results"]["taxon_scientific_name"],
            json!({"results": [], "error": "cpmp timed out after 300ms"})
        );

        assert_eq!(
            kew.calls(),
            vec![("taxon_scientific_name".to_string(), "Rosa".to_string())]
        );
        assert_eq!(cpmp.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_biodiversity_issues_no_calls() {
        let kew = MockParticipant::start(|_| MockBehavior::Results(json!([]))).await;
        let router = test_router(&[("kew", &kew)], Duration::from_secs(5));

        let (status, body) = post_search(
            router,
            json!({
                "category": ["marine"],
                "dataset": ["kew"],
                "fields": ["habitat"],
                "search_text": "Rosa"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"detail": "At least one category must be 'biodiversity'."})
        );
        assert_eq!(kew.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_dataset_issues_no_calls() {
        let kew = MockParticipant::start(|_| MockBehavior::Results(json!([]))).await;
        let router = test_router(&[("kew", &kew)], Duration::from_secs(5));

        let (status, body) = post_search(
            router,
            json!({
                "category": ["BioDiversity"],
                "dataset": ["kew", "gbif", "obis"],
                "fields": ["habitat"],
                "search_text": "Rosa"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"detail": "Unknown datasets: gbif, obis"}));
        assert_eq!(kew.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fan_out_covers_every_pair() {
        let kew = MockParticipant::start(|field| MockBehavior::Results(json!([{"f": field}]))).await;
        let cpmp = MockParticipant::start(|field| MockBehavior::Results(json!([{"f": field}]))).await;
        let router = test_router(&[("kew", &kew), ("cpmp", &cpmp)], Duration::from_secs(5));

        let fields = ["habitat", "family_name", "medicinal_uses"];
        let (status, body) = post_search(
            router,
            json!({
                "category": ["biodiversity"],
                "dataset": ["kew", "cpmp"],
                "fields": fields,
                "search_text": "Rosa"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(kew.call_count() + cpmp.call_count(), 6);
        for participant in ["kew", "cpmp"] {
            for field in fields {
                assert_eq!(
                    body["results"][participant]["field_results"][field],
                    json!({"results": [{"f": field}], "error": null})
                );
            }
        }
    }

    #[tokio::test]
    async fn test_single_failure_is_isolated() {
        let kew = MockParticipant::start(|field| match field {
            "habitat" => MockBehavior::Status(StatusCode::BAD_GATEWAY),
            _ => MockBehavior::Results(json!([{"id": 1}])),
        })
        .await;
        let cpmp = MockParticipant::start(|_| MockBehavior::Results(json!([{"id": 2}]))).await;
        let router = test_router(&[("kew", &kew), ("cpmp", &cpmp)], Duration::from_secs(5));

        let (status, body) = post_search(
            router,
            json!({
                "category": ["biodiversity"],
                "dataset": ["kew", "cpmp"],
                "fields": ["habitat", "family_name"],
                "search_text": "Rosa"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["results"]["kew"]["field_results"]["habitat"],
            json!({"results": [], "error": "kew returned HTTP 502"})
        );
        assert_eq!(
            body["results"]["kew"]["field_results"]["family_name"],
            json!({"results": [{"id": 1}], "error": null})
        );
        for field in ["habitat", "family_name"] {
            assert_eq!(
                body["results"]["cpmp"]["field_results"][field],
                json!({"results": [{"id": 2}], "error": null})
            );
        }
    }

    #[tokio::test]
    async fn test_default_fields_when_omitted() {
        let kew = MockParticipant::start(|_| MockBehavior::Results(json!([]))).await;
        let router = test_router(&[("kew", &kew)], Duration::from_secs(5));

        let (status, body) = post_search(
            router,
            json!({
                "category": ["biodiversity"],
                "dataset": ["kew"],
                "search_text": "rose"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fields"], json!(["vernacular_name_common_names"]));
        assert_eq!(
            kew.calls(),
            vec![("vernacular_name_common_names".to_string(), "rose".to_string())]
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let kew = MockParticipant::start(|_| MockBehavior::Results(json!([]))).await;
        let router = test_router(&[("kew", &kew)], Duration::from_secs(5));

        let (status, body) = post_search(router, json!({"category": "biodiversity"})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["detail"]
                .as_str()
                .unwrap()
                .starts_with("Invalid request body")
        );
        assert_eq!(kew.call_count(), 0);
    }
}
