//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::{AppOptions, ShadowBackend};
use crate::authn::token_mngr::TokenManager;
use crate::directive::router::DirectiveRouter;
use crate::errors::BridgeError;
use crate::events::translator::EventTranslator;
use crate::http::auth::AuthClient;
use crate::http::gateway::GatewayClient;
use crate::http::shadow::HttpShadowStore;
use crate::shadow::store::{MemoryShadowStore, ShadowStore};
use crate::shadow::synchronizer::StateSynchronizer;
use crate::storage::file::{FileDeviceStore, FileTokenStore};
use crate::storage::memory::{MemoryDeviceStore, MemoryTokenStore};
use crate::storage::store::{DeviceStore, TokenStore};
use crate::utils::SystemClock;

/// Main application state
pub struct AppState {
    /// Directive router
    pub router: Arc<DirectiveRouter>,

    /// Event translator
    pub translator: Arc<EventTranslator>,

    /// Token manager
    pub token_mngr: Arc<TokenManager>,
}

impl AppState {
    /// Wire up all components from the resolved options.
    ///
    /// Every collaborator is injected explicitly; nothing reaches for a
    /// global client handle.
    pub fn init(options: &AppOptions) -> Result<Self, BridgeError> {
        info!("Initializing application state...");

        let clock = Arc::new(SystemClock);

        let (devices, tokens): (Arc<dyn DeviceStore>, Arc<dyn TokenStore>) =
            match (options.storage.devices_file(), options.storage.tokens_file()) {
                (Some(devices_path), Some(tokens_path)) => {
                    info!("Using JSON-file stores in {:?}", options.storage.data_dir);
                    (
                        Arc::new(FileDeviceStore::new(devices_path)),
                        Arc::new(FileTokenStore::new(tokens_path)),
                    )
                }
                _ => {
                    info!("Using in-memory stores");
                    (
                        Arc::new(MemoryDeviceStore::new()),
                        Arc::new(MemoryTokenStore::new()),
                    )
                }
            };

        let shadow: Arc<dyn ShadowStore> = match &options.shadow {
            ShadowBackend::Memory => {
                info!("Using in-memory shadow store");
                Arc::new(MemoryShadowStore::new())
            }
            ShadowBackend::Http(shadow_options) => {
                Arc::new(HttpShadowStore::new(shadow_options.clone())?)
            }
        };

        let auth_client = Arc::new(AuthClient::new(options.auth.clone())?);
        let gateway = Arc::new(GatewayClient::new(options.gateway.clone())?);

        let synchronizer = Arc::new(StateSynchronizer::new(
            shadow,
            clock.clone(),
            options.windows.clone(),
        ));

        let token_mngr = Arc::new(TokenManager::new(
            tokens.clone(),
            auth_client.clone(),
            clock.clone(),
        ));

        let translator = Arc::new(EventTranslator::new(
            devices.clone(),
            synchronizer.clone(),
            token_mngr.clone(),
            gateway,
            clock.clone(),
        ));

        let router = Arc::new(DirectiveRouter::new(
            devices,
            tokens,
            synchronizer,
            translator.clone(),
            auth_client,
            clock,
        ));

        Ok(Self {
            router,
            translator,
            token_mngr,
        })
    }
}
