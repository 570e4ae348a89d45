//! In-memory store adapters

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::authn::token::OAuthToken;
use crate::errors::BridgeError;
use crate::models::device::Device;
use crate::storage::store::{DeviceStore, TokenStore};

/// In-memory device store
#[derive(Default)]
pub struct MemoryDeviceStore {
    devices: RwLock<HashMap<String, Device>>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceStore for MemoryDeviceStore {
    async fn get(&self, device_id: &str) -> Result<Option<Device>, BridgeError> {
        Ok(self.devices.read().await.get(device_id).cloned())
    }

    async fn put(&self, device: &Device) -> Result<(), BridgeError> {
        self.devices
            .write()
            .await
            .insert(device.id.clone(), device.clone());
        Ok(())
    }

    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<Device>, BridgeError> {
        let mut devices: Vec<Device> = self
            .devices
            .read()
            .await
            .values()
            .filter(|device| device.owner_user_id == user_id)
            .cloned()
            .collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(devices)
    }
}

/// In-memory token store
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<String, OAuthToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, user_id: &str) -> Result<Option<OAuthToken>, BridgeError> {
        Ok(self.tokens.read().await.get(user_id).cloned())
    }

    async fn put(&self, token: &OAuthToken) -> Result<(), BridgeError> {
        self.tokens
            .write()
            .await
            .insert(token.user_id.clone(), token.clone());
        Ok(())
    }
}
