use gitlab_mattermost_bridge::error::BridgeError;
use gitlab_mattermost_bridge::relay::MattermostRelay;
use gitlab_mattermost_bridge::{
    AppState, DEFAULT_ICON_URL, DEFAULT_USERNAME, EventPolicy, RelayConfig, router,
};
use std::sync::Arc;
use tracing::{self, info};

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_RELAY_TIMEOUT_SECS: u64 = 5;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Reads the relay settings from the environment. The destination URL is the
/// one setting without which the process refuses to start.
fn load_relay_config() -> Result<RelayConfig, BridgeError> {
    let webhook_url = env_or("MATTERMOST_WEBHOOK_URL", "");
    if webhook_url.is_empty() {
        return Err(BridgeError::ConfigError(
            "MATTERMOST_WEBHOOK_URL must be configured. Please see instructions in README.md"
                .to_string(),
        ));
    }

    let timeout_secs = env_or("RELAY_TIMEOUT_SECS", "")
        .parse()
        .unwrap_or(DEFAULT_RELAY_TIMEOUT_SECS);

    Ok(RelayConfig {
        webhook_url,
        username: env_or("USERNAME", DEFAULT_USERNAME),
        icon_url: env_or("ICON_URL", DEFAULT_ICON_URL),
        channel: env_or("CHANNEL", ""),
        insecure_tls: env_flag("INSECURE_TLS", true),
        timeout_secs,
    })
}

fn load_policy() -> EventPolicy {
    let defaults = EventPolicy::default();
    EventPolicy {
        push: env_flag("REPORT_PUSH", defaults.push),
        issue: env_flag("REPORT_ISSUE", defaults.issue),
        tag_push: env_flag("REPORT_TAG_PUSH", defaults.tag_push),
        note: env_flag("REPORT_NOTE", defaults.note),
        merge_request: env_flag("REPORT_MERGE_REQUEST", defaults.merge_request),
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config = match load_relay_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let relay = match MattermostRelay::new(config) {
        Ok(relay) => relay,
        Err(e) => {
            eprintln!("Failed to build relay client: {}", e);
            std::process::exit(1);
        }
    };

    let policy = load_policy();
    let gitlab_token = std::env::var("GITLAB_TOKEN").ok().filter(|t| !t.is_empty());
    let port: u16 = env_or("PORT", "").parse().unwrap_or(DEFAULT_PORT);

    let state = Arc::new(AppState {
        policy,
        relay,
        gitlab_token,
    });

    tracing_subscriber::fmt::init();
    let app = router(state);

    let bind_address = format!("0.0.0.0:{}", port);
    info!("Listening on {}", bind_address);
    info!("Event policy: {:?}", policy);
    let listener = tokio::net::TcpListener::bind(bind_address).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
