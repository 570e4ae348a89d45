//! Application configuration options

use std::path::PathBuf;

use crate::http::auth::AuthOptions;
use crate::http::gateway::GatewayOptions;
use crate::http::shadow::ShadowOptions;
use crate::shadow::synchronizer::ReportWindows;
use crate::workers::events;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Enable the local HTTP server for inbound directives
    pub enable_socket_server: bool,

    /// Enable the bus event worker
    pub enable_event_worker: bool,

    /// Server configuration
    pub server: ServerOptions,

    /// Event worker options
    pub event_worker: events::Options,

    /// Authorization server options
    pub auth: AuthOptions,

    /// Event gateway options
    pub gateway: GatewayOptions,

    /// Shadow store backend
    pub shadow: ShadowBackend,

    /// Device/token store backend
    pub storage: StorageOptions,

    /// Staleness and reachability windows for reports
    pub windows: ReportWindows,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            enable_socket_server: true,
            enable_event_worker: true,
            server: ServerOptions::default(),
            event_worker: events::Options::default(),
            auth: AuthOptions::default(),
            gateway: GatewayOptions::default(),
            shadow: ShadowBackend::default(),
            storage: StorageOptions::default(),
            windows: ReportWindows::default(),
        }
    }
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Which shadow store the synchronizer talks to
#[derive(Debug, Clone)]
pub enum ShadowBackend {
    /// In-process shadow, for tests and loopback development
    Memory,

    /// HTTP shadow service
    Http(ShadowOptions),
}

impl Default for ShadowBackend {
    fn default() -> Self {
        ShadowBackend::Http(ShadowOptions::default())
    }
}

/// Device/token store configuration
#[derive(Debug, Clone, Default)]
pub struct StorageOptions {
    /// Directory for the JSON-file stores; `None` keeps everything in memory
    pub data_dir: Option<PathBuf>,
}

impl StorageOptions {
    pub fn devices_file(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join("devices.json"))
    }

    pub fn tokens_file(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join("tokens.json"))
    }
}
