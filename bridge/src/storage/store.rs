//! Store traits
//!
//! The durable device/token store is an external collaborator; the bridge
//! only needs key-value access plus an owner query. Adapters: in-memory
//! (tests, default dev mode) and JSON-file (single-node deployments).

use async_trait::async_trait;

use crate::authn::token::OAuthToken;
use crate::errors::BridgeError;
use crate::models::device::Device;

/// Device records keyed by device id
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn get(&self, device_id: &str) -> Result<Option<Device>, BridgeError>;

    async fn put(&self, device: &Device) -> Result<(), BridgeError>;

    /// Devices owned by a user, for discovery
    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<Device>, BridgeError>;
}

/// OAuth tokens keyed by user id, one live token per user
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<OAuthToken>, BridgeError>;

    async fn put(&self, token: &OAuthToken) -> Result<(), BridgeError>;
}
