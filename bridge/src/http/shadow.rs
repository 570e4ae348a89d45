//! HTTP shadow-store adapter
//!
//! Talks to a REST shadow service exposing the classic shadow document:
//! `state.reported`/`state.desired`, per-property report timestamps under
//! `metadata.reported`, and a document-level `timestamp`.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::alexa::capability::CapabilityName;
use crate::errors::BridgeError;
use crate::shadow::store::{from_epoch_seconds, ShadowState, ShadowStore};

/// Shadow service options
#[derive(Debug, Clone)]
pub struct ShadowOptions {
    /// Base URL of the shadow service, e.g. `https://iot.example.com`
    pub base_url: String,
}

impl Default for ShadowOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9125".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ShadowDocument {
    #[serde(default)]
    state: ShadowDocumentState,

    #[serde(default)]
    metadata: ShadowDocumentMetadata,

    #[serde(default)]
    timestamp: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct ShadowDocumentState {
    #[serde(default)]
    reported: HashMap<CapabilityName, Value>,

    #[serde(default)]
    desired: HashMap<CapabilityName, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ShadowDocumentMetadata {
    #[serde(default)]
    reported: HashMap<CapabilityName, PropertyMetadata>,
}

#[derive(Debug, Deserialize)]
struct PropertyMetadata {
    timestamp: i64,
}

/// HTTP client for the shadow service
pub struct HttpShadowStore {
    client: Client,
    options: ShadowOptions,
}

impl HttpShadowStore {
    pub fn new(options: ShadowOptions) -> Result<Self, BridgeError> {
        url::Url::parse(&options.base_url)
            .map_err(|e| BridgeError::ConfigError(format!("{}: {}", options.base_url, e)))?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            options: ShadowOptions {
                base_url: options.base_url.trim_end_matches('/').to_string(),
            },
        })
    }

    fn shadow_url(&self, device_id: &str) -> String {
        format!("{}/things/{}/shadow", self.options.base_url, device_id)
    }
}

#[async_trait]
impl ShadowStore for HttpShadowStore {
    async fn get(&self, device_id: &str) -> Result<ShadowState, BridgeError> {
        let url = self.shadow_url(device_id);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BridgeError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Shadow get failed: {} - {}", status, body);
            return Err(BridgeError::UpstreamUnavailable(format!(
                "{}: {}",
                status, body
            )));
        }

        let document: ShadowDocument = response.json().await?;

        Ok(ShadowState {
            reported: document.state.reported,
            desired: document.state.desired,
            reported_at: document
                .metadata
                .reported
                .into_iter()
                .filter_map(|(capability, metadata)| {
                    from_epoch_seconds(metadata.timestamp)
                        .map(|at| (capability, at))
                })
                .collect(),
            observed_at: document.timestamp.and_then(from_epoch_seconds),
        })
    }

    async fn update_desired(
        &self,
        device_id: &str,
        patch: &HashMap<CapabilityName, Value>,
    ) -> Result<HashMap<CapabilityName, Value>, BridgeError> {
        let url = self.shadow_url(device_id);
        debug!("POST {} (desired patch)", url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "state": { "desired": patch } }))
            .send()
            .await
            .map_err(|e| BridgeError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Shadow update failed: {} - {}", status, body);
            return Err(BridgeError::UpstreamUnavailable(format!(
                "{}: {}",
                status, body
            )));
        }

        // the caller needs the acknowledged values, not the requested ones
        let document: ShadowDocument = response.json().await?;
        Ok(document.state.desired)
    }
}
