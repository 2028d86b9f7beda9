use axum::{
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, header},
};
use tracing::info;

use crate::SharedState;
use crate::error::{BridgeError, Result};
use crate::event::translate;

/// Health/liveness check.
pub async fn root() -> &'static str {
    "OK"
}

/// Handles a GitLab webhook POST. Always answers 200 "OK" once the payload is
/// accepted, even when nothing was relayed or the relay call failed; the
/// response means "event accepted", not "message delivered".
pub async fn new_event(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str> {
    if let Some(expected) = &state.gitlab_token {
        let supplied = headers.get("X-Gitlab-Token").and_then(|v| v.to_str().ok());
        if supplied != Some(expected.as_str()) {
            info!("Rejected event with missing or mismatched X-Gitlab-Token");
            return Err(BridgeError::Unauthorized);
        }
    }

    // Compare the media type alone; parameters like charset are fine, but
    // "application/jsonp" is not JSON.
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|media_type| media_type.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false);
    if !is_json {
        info!("Invalid Content-Type");
        return Err(BridgeError::InvalidBody);
    }

    let payload: serde_json::Value =
        serde_json::from_slice(&body).map_err(|_| BridgeError::InvalidBody)?;

    let Some(text) = translate(&payload, &state.policy)? else {
        return Ok("OK");
    };

    // Delivery failure is logged inside the relay and never surfaced to the
    // event source.
    let _ = state.relay.post_text(text).await;

    Ok("OK")
}
