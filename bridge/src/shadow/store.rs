//! Device-shadow store access
//!
//! The shadow is the server-side desired/reported state document each
//! device synchronizes against. Its replication and durability belong to
//! the shadow service; the bridge only reads state and patches desired
//! values.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::alexa::capability::CapabilityName;
use crate::errors::BridgeError;

/// A device's shadow state as the bridge sees it
#[derive(Debug, Clone, Default)]
pub struct ShadowState {
    /// Values the device last reported
    pub reported: HashMap<CapabilityName, Value>,

    /// Values waiting to be applied on the device
    pub desired: HashMap<CapabilityName, Value>,

    /// When each reported value was last written
    pub reported_at: HashMap<CapabilityName, DateTime<Utc>>,

    /// When the shadow document itself was last touched
    pub observed_at: Option<DateTime<Utc>>,
}

/// Shadow store operations the bridge needs
#[async_trait]
pub trait ShadowStore: Send + Sync {
    /// Fetch reported state, pending desired state and report timestamps
    async fn get(&self, device_id: &str) -> Result<ShadowState, BridgeError>;

    /// Patch desired state; returns the values the shadow acknowledged,
    /// which callers must prefer over the requested ones
    async fn update_desired(
        &self,
        device_id: &str,
        patch: &HashMap<CapabilityName, Value>,
    ) -> Result<HashMap<CapabilityName, Value>, BridgeError>;
}

/// Epoch-seconds helper for shadow document timestamps
pub(crate) fn from_epoch_seconds(seconds: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0).single()
}

/// In-memory shadow store for tests and loopback development
#[derive(Default)]
pub struct MemoryShadowStore {
    shadows: RwLock<HashMap<String, ShadowState>>,
}

impl MemoryShadowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a device's reported state, as if the device had synced
    pub async fn seed_reported(
        &self,
        device_id: &str,
        reported: HashMap<CapabilityName, Value>,
        reported_at: HashMap<CapabilityName, DateTime<Utc>>,
        observed_at: DateTime<Utc>,
    ) {
        let mut shadows = self.shadows.write().await;
        let shadow = shadows.entry(device_id.to_string()).or_default();
        shadow.reported = reported;
        shadow.reported_at = reported_at;
        shadow.observed_at = Some(observed_at);
    }
}

#[async_trait]
impl ShadowStore for MemoryShadowStore {
    async fn get(&self, device_id: &str) -> Result<ShadowState, BridgeError> {
        Ok(self
            .shadows
            .read()
            .await
            .get(device_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_desired(
        &self,
        device_id: &str,
        patch: &HashMap<CapabilityName, Value>,
    ) -> Result<HashMap<CapabilityName, Value>, BridgeError> {
        let mut shadows = self.shadows.write().await;
        let shadow = shadows.entry(device_id.to_string()).or_default();
        for (capability, value) in patch {
            shadow.desired.insert(capability.clone(), value.clone());
        }
        // echo the accepted patch, as the shadow service does
        Ok(patch.clone())
    }
}
