use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ListenerError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Listener host cannot be empty")]
    EmptyHost,
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ListenerError> {
        if self.host.is_empty() {
            return Err(ListenerError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ListenerError::InvalidPort);
        }
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Binds the listener and serves `router` until ctrl-c is received.
pub async fn run_http_service(listener: &Listener, router: Router) -> Result<(), std::io::Error> {
    let address = listener.address();
    let tcp_listener = TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Listening");

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to install ctrl-c handler");
            }
        })
        .await
}
