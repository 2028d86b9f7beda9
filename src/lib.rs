pub mod error;
pub mod event;
pub mod handlers;
pub mod relay;

use axum::{Router, routing};
use std::sync::Arc;

use crate::event::EventKind;
use crate::relay::MattermostRelay;

pub const DEFAULT_USERNAME: &str = "gitlab";
pub const DEFAULT_ICON_URL: &str =
    "https://gitlab.com/uploads/project/avatar/13083/gitlab-logo-square.png";

/// Settings for the outbound Mattermost incoming-webhook call.
/// Loaded once from the environment at startup, read-only afterwards.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Destination incoming-webhook URL. Must be non-empty.
    pub webhook_url: String,
    /// Display name attached to relayed messages. Empty = omit.
    pub username: String,
    /// Avatar URL attached to relayed messages. Empty = omit.
    pub icon_url: String,
    /// Channel override. Empty = post to the webhook's own default channel.
    pub channel: String,
    /// Skip TLS certificate verification on the outbound call.
    pub insecure_tls: bool,
    /// Outbound request timeout in seconds.
    pub timeout_secs: u64,
}

/// Per-event-kind enable/disable table. Immutable after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventPolicy {
    pub push: bool,
    pub issue: bool,
    pub tag_push: bool,
    pub note: bool,
    pub merge_request: bool,
}

impl EventPolicy {
    pub fn is_enabled(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Push => self.push,
            EventKind::Issue => self.issue,
            EventKind::TagPush => self.tag_push,
            EventKind::Note => self.note,
            EventKind::MergeRequest => self.merge_request,
        }
    }
}

impl Default for EventPolicy {
    /// Mirrors the defaults of the upstream integration: pushes and tags are
    /// noisy and off, issues, comments and merge requests are on.
    fn default() -> Self {
        Self {
            push: false,
            issue: true,
            tag_push: false,
            note: true,
            merge_request: true,
        }
    }
}

pub struct AppState {
    pub policy: EventPolicy,
    pub relay: MattermostRelay,
    /// Expected value of the `X-Gitlab-Token` header. None = no check.
    pub gitlab_token: Option<String>,
}

pub type SharedState = Arc<AppState>;

/// Builds the application router. Split out of `main` so integration tests
/// can drive it without binding a socket.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::get(handlers::root))
        .route("/new_event", routing::post(handlers::new_event))
        .with_state(state)
}
