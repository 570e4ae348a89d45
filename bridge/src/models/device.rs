//! Device models

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alexa::capability::CapabilityName;

/// Hardware templates devices register as.
///
/// Deserialization also accepts the legacy firmware spellings
/// (`sensorContact`, `sensorTemperature`, `doorlBell`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceTemplate {
    Switch,
    Light,
    LightRgb,
    LightBrightness,
    Smartlock,
    #[serde(alias = "sensorContact")]
    ContactSensor,
    #[serde(alias = "sensorTemperature")]
    TemperatureSensor,
    #[serde(alias = "doorlBell")]
    Doorbell,
}

/// A mode a device supports, with its allowed values in display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMode {
    /// Mode instance name, e.g. "fan_speed"
    pub name: String,

    /// Allowed values in the order they should be offered
    pub values: Vec<String>,
}

/// A registered device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Unique device ID (also the assistant endpoint id)
    pub id: String,

    /// Owner user ID
    pub owner_user_id: String,

    /// Hardware template
    pub template: DeviceTemplate,

    /// Friendly name shown in the assistant app
    pub display_name: String,

    /// Capabilities the device advertises
    #[serde(default)]
    pub capabilities: BTreeSet<CapabilityName>,

    /// Supported modes with their allowed values
    #[serde(default)]
    pub modes: Vec<DeviceMode>,

    /// Last registration timestamp
    pub updated_at: DateTime<Utc>,
}

impl Device {
    /// Merge a re-registration into an existing record.
    ///
    /// The capability set only grows; template, name and modes follow the
    /// latest registration. Devices are never deleted here.
    pub fn merge_registration(&mut self, incoming: Device) {
        self.template = incoming.template;
        self.display_name = incoming.display_name;
        self.capabilities.extend(incoming.capabilities);
        self.modes = incoming.modes;
        self.updated_at = incoming.updated_at;
    }
}
