//! JSON-file store adapters
//!
//! Single-node persistence: each store is one JSON document holding the
//! whole keyed map, rewritten atomically on every put. Fine for the
//! handful of devices and users a DIY deployment has.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::authn::token::OAuthToken;
use crate::errors::BridgeError;
use crate::filesys::file::File;
use crate::models::device::Device;
use crate::storage::store::{DeviceStore, TokenStore};

/// Device store backed by a single JSON file
pub struct FileDeviceStore {
    file: File,
    // serializes read-modify-write cycles on the backing file
    write_lock: Mutex<()>,
}

impl FileDeviceStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            file: File::new(path.as_ref().to_path_buf()),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<HashMap<String, Device>, BridgeError> {
        if !self.file.exists().await {
            return Ok(HashMap::new());
        }
        self.file.read_json().await
    }
}

#[async_trait]
impl DeviceStore for FileDeviceStore {
    async fn get(&self, device_id: &str) -> Result<Option<Device>, BridgeError> {
        Ok(self.load().await?.remove(device_id))
    }

    async fn put(&self, device: &Device) -> Result<(), BridgeError> {
        let _guard = self.write_lock.lock().await;
        let mut devices = self.load().await?;
        devices.insert(device.id.clone(), device.clone());
        self.file.write_json(&devices).await
    }

    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<Device>, BridgeError> {
        let mut devices: Vec<Device> = self
            .load()
            .await?
            .into_values()
            .filter(|device| device.owner_user_id == user_id)
            .collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(devices)
    }
}

/// Token store backed by a single JSON file
pub struct FileTokenStore {
    file: File,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            file: File::new(path.as_ref().to_path_buf()),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<HashMap<String, OAuthToken>, BridgeError> {
        if !self.file.exists().await {
            return Ok(HashMap::new());
        }
        self.file.read_json().await
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self, user_id: &str) -> Result<Option<OAuthToken>, BridgeError> {
        Ok(self.load().await?.remove(user_id))
    }

    async fn put(&self, token: &OAuthToken) -> Result<(), BridgeError> {
        let _guard = self.write_lock.lock().await;
        let mut tokens = self.load().await?;
        tokens.insert(token.user_id.clone(), token.clone());
        self.file.write_json(&tokens).await
    }
}
