//! MQTT client implementation

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::errors::BridgeError;
use crate::mqtt::topics::Topics;

/// MQTT broker address
#[derive(Debug, Clone)]
pub struct MqttAddress {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    /// Optional path to a PEM-encoded CA certificate for broker verification.
    /// When `None` and `use_tls` is `true`, the system certificate store is used.
    pub ca_cert_path: Option<String>,
}

impl Default for MqttAddress {
    fn default() -> Self {
        Self {
            host: "".to_string(),
            port: 8883,
            use_tls: true,
            ca_cert_path: None,
        }
    }
}

/// Broker credentials for the bridge's bus session
#[derive(Debug, Clone, Default)]
pub struct MqttCredentials {
    pub username: String,
    pub password: String,
}

/// MQTT client wrapper
pub struct MqttClient {
    client: AsyncClient,
    eventloop: EventLoop,
}

impl MqttClient {
    /// Create a new MQTT client
    pub async fn new(
        address: &MqttAddress,
        client_id: &str,
        credentials: Option<&MqttCredentials>,
    ) -> Result<Self, BridgeError> {
        if address.host.is_empty() {
            return Err(BridgeError::MqttError("MQTT host is not configured".to_string()));
        }

        let mut options = MqttOptions::new(client_id, &address.host, address.port);
        options.set_keep_alive(std::time::Duration::from_secs(30));
        if let Some(credentials) = credentials {
            options.set_credentials(&credentials.username, &credentials.password);
        }

        if address.use_tls {
            use rumqttc::{TlsConfiguration, Transport};
            use rustls::ClientConfig;
            use std::sync::Arc;

            let mut root_cert_store = rustls::RootCertStore::empty();

            if let Some(ref ca_path) = address.ca_cert_path {
                let ca_pem = std::fs::read(ca_path)
                    .map_err(|e| BridgeError::MqttError(format!("Failed to read CA cert {ca_path}: {e}")))?;
                let mut cursor = std::io::Cursor::new(ca_pem);
                for cert in rustls_pemfile::certs(&mut cursor).flatten() {
                    let _ = root_cert_store.add(cert);
                }
            } else {
                for cert in rustls_native_certs::load_native_certs().unwrap_or_default() {
                    let _ = root_cert_store.add(cert);
                }
            }

            let client_config = ClientConfig::builder()
                .with_root_certificates(root_cert_store)
                .with_no_client_auth();

            options.set_transport(Transport::tls_with_config(TlsConfiguration::Rustls(
                Arc::new(client_config),
            )));
        }

        let (client, eventloop) = AsyncClient::new(options, 10);

        Ok(Self { client, eventloop })
    }

    /// Subscribe to every device's event topic
    pub async fn subscribe_device_events(&mut self) -> Result<(), BridgeError> {
        let filter = Topics::device_event_filter();
        self.client
            .subscribe(&filter, QoS::AtLeastOnce)
            .await
            .map_err(|e| BridgeError::MqttError(e.to_string()))?;
        info!("Subscribed to: {}", filter);
        Ok(())
    }

    /// Poll for events
    pub async fn poll(&mut self) -> Result<Option<MqttMessage>, BridgeError> {
        match self.eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let topic = publish.topic.clone();
                let payload = publish.payload.to_vec();

                debug!("Received message on topic: {}", topic);

                Ok(Some(MqttMessage { topic, payload }))
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("MQTT connected");
                Ok(None)
            }
            Ok(Event::Incoming(Packet::SubAck(_))) => {
                debug!("Subscription acknowledged");
                Ok(None)
            }
            Ok(_) => Ok(None),
            Err(e) => {
                warn!("MQTT poll error: {}", e);
                Err(BridgeError::MqttError(e.to_string()))
            }
        }
    }

    /// Disconnect from broker
    pub async fn disconnect(&mut self) -> Result<(), BridgeError> {
        self.client
            .disconnect()
            .await
            .map_err(|e| BridgeError::MqttError(e.to_string()))?;
        info!("MQTT disconnected");
        Ok(())
    }
}

/// MQTT message
#[derive(Debug, Clone)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl MqttMessage {
    /// Parse payload as JSON
    pub fn parse_json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, BridgeError> {
        serde_json::from_slice(&self.payload).map_err(|e| BridgeError::MqttError(e.to_string()))
    }
}
