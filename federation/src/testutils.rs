use axum::Router;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use http::StatusCode;
use serde_json::{Value as JsonValue, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

/// How a mock participant answers a search for a given field
#[derive(Clone, Debug)]
pub enum MockBehavior {
    /// `{"results": <value>}` with status 200
    Results(JsonValue),
    /// An empty body with the given status
    Status(StatusCode),
    /// A raw body with status 200
    Body(&'static str),
    /// `Results` after sleeping
    Delay(Duration, JsonValue),
}

type BehaviorFn = dyn Fn(&str) -> MockBehavior + Send + Sync;

#[derive(Clone)]
struct MockState {
    behavior: Arc<BehaviorFn>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

/// A participant search endpoint served on an ephemeral local port.
pub struct MockParticipant {
    pub url: Url,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockParticipant {
    pub async fn start<F>(behavior: F) -> Self
    where
        F: Fn(&str) -> MockBehavior + Send + Sync + 'static,
    {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            behavior: Arc::new(behavior),
            calls: calls.clone(),
        };

        let app = Router::new().route("/search", get(search)).with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: Url::parse(&format!("http://127.0.0.1:{port}/search")).unwrap(),
            calls,
        }
    }

    /// `(field, query)` of every call received so far
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

async fn search(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let field = params.get("field").cloned().unwrap_or_default();
    let query = params.get("query").cloned().unwrap_or_default();
    state.calls.lock().unwrap().push((field.clone(), query));

    match (state.behavior)(&field) {
        MockBehavior::Results(results) => Json(json!({ "results": results })).into_response(),
        MockBehavior::Status(status) => status.into_response(),
        MockBehavior::Body(body) => body.into_response(),
        MockBehavior::Delay(delay, results) => {
            tokio::time::sleep(delay).await;
            Json(json!({ "results": results })).into_response()
        }
    }
}

/// A URL on localhost that nothing listens on.
pub async fn unused_local_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    Url::parse(&format!("http://127.0.0.1:{port}/search")).unwrap()
}
