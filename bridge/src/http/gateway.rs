//! Event gateway client
//!
//! Posts report envelopes (discovery add-or-update, change reports, state
//! reports, doorbell presses) to the assistant's event gateway with the
//! user's bearer credential.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::{debug, error};

use crate::alexa::envelope::ResponseEnvelope;
use crate::errors::BridgeError;

/// Event gateway operations, behind a trait for testability
#[async_trait]
pub trait EventGatewayExt: Send + Sync {
    /// Post one report with the given bearer credential
    async fn post_report(
        &self,
        access_token: &str,
        report: &ResponseEnvelope,
    ) -> Result<(), BridgeError>;
}

/// Gateway client options
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// Event gateway endpoint
    pub events_url: String,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            events_url: "https://api.amazonalexa.com/v3/events".to_string(),
        }
    }
}

/// HTTP client for the event gateway
pub struct GatewayClient {
    client: Client,
    options: GatewayOptions,
}

impl GatewayClient {
    pub fn new(options: GatewayOptions) -> Result<Self, BridgeError> {
        url::Url::parse(&options.events_url)
            .map_err(|e| BridgeError::ConfigError(format!("{}: {}", options.events_url, e)))?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self { client, options })
    }
}

#[async_trait]
impl EventGatewayExt for GatewayClient {
    async fn post_report(
        &self,
        access_token: &str,
        report: &ResponseEnvelope,
    ) -> Result<(), BridgeError> {
        debug!("POST {} (report)", self.options.events_url);

        let response = self
            .client
            .post(&self.options.events_url)
            .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
            .json(report)
            .send()
            .await
            .map_err(|e| BridgeError::UpstreamUnavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = response.text().await.unwrap_or_default();
                error!("Gateway rejected credential: {}", body);
                Err(BridgeError::AuthExpired(body))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                error!("Gateway post failed: {} - {}", status, body);
                Err(BridgeError::UpstreamUnavailable(format!(
                    "{}: {}",
                    status, body
                )))
            }
        }
    }
}
