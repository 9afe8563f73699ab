use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;

/// Router for the admin listener.
///
/// `/health` always answers once the process is serving; `/ready` consults
/// `is_ready` on every call.
pub fn admin_router<F>(is_ready: F) -> Router
where
    F: Fn() -> bool + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(|| async { "ok\n" }))
        .route(
            "/ready",
            get(move || {
                let ready = is_ready();
                async move {
                    match ready {
                        true => (StatusCode::OK, "ok\n"),
                        false => (StatusCode::SERVICE_UNAVAILABLE, "not ready\n"),
                    }
                }
            }),
        )
        .fallback(|| async { StatusCode::NOT_FOUND })
}
