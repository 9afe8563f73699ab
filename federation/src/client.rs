use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

use crate::errors::CallError;
use crate::protocol::ParticipantResponse;

/// Query a single participant search endpoint with a hard timeout.
///
/// Issues `GET <endpoint>?field=<field>&query=<query>` and expects a
/// `{"results": [...]}` body.
///
/// # Timeout Behavior
///
/// `call_timeout` applies to the entire request/response cycle, including:
/// - Establishing the connection
/// - Receiving response headers
/// - **Collecting the complete response body**
///
/// Every failure mode is returned as a [`CallError`] naming the participant.
pub async fn query_participant(
    client: &reqwest::Client,
    participant: &str,
    endpoint: &Url,
    field: &str,
    query: &str,
    call_timeout: Duration,
) -> Result<Vec<JsonValue>, CallError> {
    let call = async {
        let response = client
            .get(endpoint.clone())
            .query(&[("field", field), ("query", query)])
            .send()
            .await
            .map_err(|e| CallError::Transport {
                participant: participant.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CallError::Status {
                participant: participant.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| CallError::Transport {
            participant: participant.to_string(),
            message: e.to_string(),
        })?;

        let parsed: ParticipantResponse =
            serde_json::from_slice(&body).map_err(|e| CallError::InvalidBody {
                participant: participant.to_string(),
                message: e.to_string(),
            })?;

        Ok::<_, CallError>(parsed.results)
    };

    // Outer error: deadline elapsed; inner: the call's own failure
    timeout(call_timeout, call)
        .await
        .map_err(|_| CallError::Timeout {
            participant: participant.to_string(),
            timeout: call_timeout,
        })?
}
