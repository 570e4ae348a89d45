//! Settings file management

use serde::Deserialize;

use crate::logs::LogLevel;

/// Bridge settings, read from a JSON file at startup
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Local HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// MQTT broker configuration
    #[serde(default)]
    pub mqtt_broker: MqttBrokerSettings,

    /// Authorization server configuration
    #[serde(default)]
    pub auth: AuthSettings,

    /// Event gateway configuration
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Shadow service configuration
    #[serde(default)]
    pub shadow: ShadowSettings,

    /// Device/token store configuration
    #[serde(default)]
    pub storage: StorageSettings,

    /// Report windows
    #[serde(default)]
    pub windows: WindowSettings,

    /// Enable local HTTP server
    #[serde(default = "default_true")]
    pub enable_socket_server: bool,

    /// Enable bus event worker
    #[serde(default = "default_true")]
    pub enable_event_worker: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            server: ServerSettings::default(),
            mqtt_broker: MqttBrokerSettings::default(),
            auth: AuthSettings::default(),
            gateway: GatewaySettings::default(),
            shadow: ShadowSettings::default(),
            storage: StorageSettings::default(),
            windows: WindowSettings::default(),
            enable_socket_server: true,
            enable_event_worker: true,
        }
    }
}

/// Local HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

/// MQTT broker settings
#[derive(Debug, Clone, Deserialize)]
pub struct MqttBrokerSettings {
    /// Broker host
    #[serde(default)]
    pub host: String,

    /// Broker port
    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    /// Use TLS
    #[serde(default = "default_true")]
    pub tls: bool,

    /// Optional path to a PEM-encoded CA certificate for broker TLS verification.
    /// When absent, the system certificate store is used.
    #[serde(default)]
    pub ca_cert_path: Option<String>,

    /// Broker username, when the broker requires credentials
    #[serde(default)]
    pub username: Option<String>,

    /// Broker password
    #[serde(default)]
    pub password: Option<String>,
}

fn default_mqtt_port() -> u16 {
    8883
}

impl Default for MqttBrokerSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_mqtt_port(),
            tls: true,
            ca_cert_path: None,
            username: None,
            password: None,
        }
    }
}

/// Authorization server settings
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_profile_url")]
    pub profile_url: String,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,
}

fn default_token_url() -> String {
    "https://api.amazon.com/auth/o2/token".to_string()
}

fn default_profile_url() -> String {
    "https://api.amazon.com/user/profile".to_string()
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_url: default_token_url(),
            profile_url: default_profile_url(),
            client_id: String::new(),
            client_secret: String::new(),
        }
    }
}

/// Event gateway settings
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    #[serde(default = "default_events_url")]
    pub events_url: String,
}

fn default_events_url() -> String {
    "https://api.amazonalexa.com/v3/events".to_string()
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            events_url: default_events_url(),
        }
    }
}

/// Shadow service settings
#[derive(Debug, Clone, Deserialize)]
pub struct ShadowSettings {
    #[serde(default = "default_shadow_url")]
    pub base_url: String,

    /// Keep shadows in process instead of calling the shadow service
    #[serde(default)]
    pub in_memory: bool,
}

fn default_shadow_url() -> String {
    "http://localhost:9125".to_string()
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            base_url: default_shadow_url(),
            in_memory: false,
        }
    }
}

/// Device/token store settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageSettings {
    /// Directory for the JSON-file stores; absent keeps stores in memory
    #[serde(default)]
    pub data_dir: Option<String>,
}

/// Report window settings, in seconds
#[derive(Debug, Clone, Deserialize)]
pub struct WindowSettings {
    #[serde(default = "default_stale_window_secs")]
    pub stale_window_secs: u64,

    #[serde(default = "default_reachability_window_secs")]
    pub reachability_window_secs: u64,
}

fn default_stale_window_secs() -> u64 {
    600
}

fn default_reachability_window_secs() -> u64 {
    3600
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            stale_window_secs: default_stale_window_secs(),
            reachability_window_secs: default_reachability_window_secs(),
        }
    }
}
