//! Webhook Relay: delivers a rendered message to the configured Mattermost
//! incoming-webhook URL.

use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

use crate::RelayConfig;
use crate::error::{BridgeError, Result};

/// The JSON body posted to the incoming webhook. Optional keys are omitted
/// entirely when unset, never sent as null.
#[derive(Debug, Serialize)]
pub struct OutboundMessage {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

pub struct MattermostRelay {
    client: reqwest::Client,
    config: RelayConfig,
}

impl MattermostRelay {
    pub fn new(config: RelayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            // The upstream integration posts with certificate verification
            // disabled; kept as a config flag rather than hardcoded.
            .danger_accept_invalid_certs(config.insecure_tls)
            .build()
            .map_err(BridgeError::Http)?;

        Ok(Self { client, config })
    }

    /// Wraps rendered text in an OutboundMessage, attaching the configured
    /// username/icon/channel only when non-empty.
    pub fn message_for(&self, text: String) -> OutboundMessage {
        OutboundMessage {
            text,
            username: non_empty(&self.config.username),
            icon_url: non_empty(&self.config.icon_url),
            channel: non_empty(&self.config.channel),
        }
    }

    /// POSTs a single message to the destination. A non-2xx status or a
    /// transport error is reported to the caller; it is never retried here.
    pub async fn post_text(&self, text: String) -> Result<()> {
        let message = self.message_for(text);

        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                "Error posting to Mattermost URL {}, status={}, response_body={}",
                self.config.webhook_url,
                status.as_u16(),
                body
            );
            return Err(BridgeError::RelayStatus {
                status: status.as_u16(),
                body,
            });
        }

        info!("Relayed message to Mattermost");
        Ok(())
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
