//! Device event worker
//!
//! Consumes device-originated events from the bus and feeds them to the
//! event translator. The bus delivers at least once: registrations merge
//! and duplicate interaction reports are tolerated, so redelivery is safe.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::events::translator::EventTranslator;
use crate::models::event::DeviceEvent;
use crate::mqtt::client::{MqttAddress, MqttClient, MqttCredentials, MqttMessage};
use crate::mqtt::topics::Topics;

/// Event worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// MQTT broker address
    pub broker_address: MqttAddress,

    /// Broker credentials, when the broker requires them
    pub credentials: Option<MqttCredentials>,

    /// Reconnect delay on failure
    pub reconnect_delay: Duration,

    /// Max reconnect attempts before giving up
    pub max_reconnect_attempts: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            broker_address: MqttAddress::default(),
            credentials: None,
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_attempts: 10,
        }
    }
}

/// Run the device event worker
pub async fn run<S, F>(
    options: &Options,
    translator: Arc<EventTranslator>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    if options.broker_address.host.is_empty() {
        info!("MQTT host not configured, event worker will not start.");
        return;
    }

    info!("Event worker starting...");

    let mut reconnect_attempts = 0;

    loop {
        // Connect to MQTT broker
        info!(
            "Connecting to MQTT broker: {}:{}",
            options.broker_address.host, options.broker_address.port
        );
        let mut client = match MqttClient::new(
            &options.broker_address,
            "domobridge-events",
            options.credentials.as_ref(),
        )
        .await
        {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to create MQTT client: {}", e);
                reconnect_attempts += 1;
                if reconnect_attempts >= options.max_reconnect_attempts {
                    error!("Max reconnect attempts reached, giving up");
                    return;
                }
                sleep_fn(options.reconnect_delay).await;
                continue;
            }
        };

        if let Err(e) = client.subscribe_device_events().await {
            error!("Failed to subscribe to device events: {}", e);
            sleep_fn(options.reconnect_delay).await;
            continue;
        }

        reconnect_attempts = 0;
        info!("Event worker connected and subscribed");

        // Main event loop
        loop {
            tokio::select! {
                _ = &mut shutdown_signal => {
                    info!("Event worker shutting down...");
                    let _ = client.disconnect().await;
                    return;
                }
                polled = client.poll() => {
                    match polled {
                        Ok(Some(message)) => {
                            if Topics::is_event_topic(&message.topic) {
                                handle_message(&message, translator.as_ref()).await;
                            } else {
                                debug!("Ignoring message on topic: {}", message.topic);
                            }
                        }
                        Ok(None) => {
                            // No message, continue
                        }
                        Err(e) => {
                            warn!("MQTT poll error: {}, reconnecting...", e);
                            break;
                        }
                    }
                }
            }
        }

        // Reconnect delay
        sleep_fn(options.reconnect_delay).await;
    }
}

async fn handle_message(message: &MqttMessage, translator: &EventTranslator) {
    let event: DeviceEvent = match message.parse_json() {
        Ok(event) => event,
        Err(e) => {
            warn!("Undecodable device event on {}: {}", message.topic, e);
            return;
        }
    };

    debug!("Device event from {}", event.device_id());

    // failures surface here so the broker can redeliver; never swallowed
    if let Err(e) = translator.handle_event(event).await {
        error!("Failed to translate device event on {}: {}", message.topic, e);
    }
}
