//! Device-originated bus events
//!
//! Wire shapes the firmware publishes on the message bus: a registration
//! announcement on boot and a physical-interaction notification when a
//! button is pressed. Delivery is at least once, so both are handled
//! idempotently downstream.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::alexa::capability::CapabilityName;
use crate::models::device::{DeviceMode, DeviceTemplate};

/// A device event as published on the bus, tagged by its `event` field
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event")]
pub enum DeviceEvent {
    #[serde(rename = "register_device")]
    Register(RegisterEvent),

    #[serde(rename = "physical_interaction")]
    PhysicalInteraction(PhysicalInteractionEvent),
}

impl DeviceEvent {
    pub fn device_id(&self) -> &str {
        match self {
            DeviceEvent::Register(event) => &event.device_id,
            DeviceEvent::PhysicalInteraction(event) => &event.device_id,
        }
    }
}

/// Registration announcement, sent on boot and on reconnect
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterEvent {
    #[serde(default)]
    pub event_id: Option<String>,

    pub device_id: String,

    #[serde(default)]
    pub device_name: Option<String>,

    pub user_id: String,

    /// Controllable/observable facets, keyed by capability name
    #[serde(default)]
    pub properties: HashMap<String, bool>,

    /// Physical buttons present on the device
    #[serde(default)]
    pub buttons: HashMap<String, bool>,

    #[serde(default)]
    pub modes: Vec<DeviceMode>,

    pub device_template: DeviceTemplate,

    /// Topic the device publishes events on
    #[serde(default)]
    pub topic_events: Option<String>,
}

impl RegisterEvent {
    /// Capabilities the device advertises: enabled properties plus one
    /// mode capability per declared mode.
    pub fn capabilities(&self) -> impl Iterator<Item = CapabilityName> + '_ {
        self.properties
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| CapabilityName::parse(name))
            .chain(
                self.modes
                    .iter()
                    .map(|mode| CapabilityName::Mode(mode.name.clone())),
            )
    }
}

/// A physical button press, carrying the device's state snapshot
#[derive(Debug, Clone, Deserialize)]
pub struct PhysicalInteractionEvent {
    #[serde(default)]
    pub event_id: Option<String>,

    pub device_id: String,

    /// The property the press changed; doorbells send none
    #[serde(default)]
    pub property: Option<String>,

    /// Device state at the time of the press, keyed by capability
    #[serde(default)]
    pub state: HashMap<CapabilityName, Value>,

    /// Present when the assistant is waiting on a direct response
    #[serde(default)]
    pub correlation: Option<String>,
}
