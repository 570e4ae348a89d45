//! Capability registry
//!
//! Bidirectional mapping between device capability names and the assistant's
//! interface namespaces/property names, plus device-template display
//! categories and discovery capability descriptors. Lookups never fail:
//! unknown capabilities degrade to the power mapping so discovery keeps
//! working for devices that advertise something this bridge has not seen.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::device::{DeviceMode, DeviceTemplate};

/// Protocol version stamped on every envelope and descriptor
pub const PAYLOAD_VERSION: &str = "3";

/// Locale used for mode friendly names
const MODE_LOCALE: &str = "pt_BR";

/// A named device capability as devices register it
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CapabilityName {
    Power,
    Brightness,
    Color,
    Lock,
    /// A mode instance, e.g. `mode:fan_speed`
    Mode(String),
    SensorContact,
    SensorTemperature,
    /// Preserved verbatim so discovery can degrade instead of failing
    Other(String),
}

impl CapabilityName {
    /// Parse a capability name; never fails, unknown strings become `Other`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "power" => CapabilityName::Power,
            "brightness" => CapabilityName::Brightness,
            "color" => CapabilityName::Color,
            "lock" => CapabilityName::Lock,
            "sensorContact" => CapabilityName::SensorContact,
            "sensorTemperature" => CapabilityName::SensorTemperature,
            _ => match raw.strip_prefix("mode:") {
                Some(instance) if !instance.is_empty() => {
                    CapabilityName::Mode(instance.to_string())
                }
                _ => CapabilityName::Other(raw.to_string()),
            },
        }
    }

    /// The mode instance name, when this capability is a mode
    pub fn mode_instance(&self) -> Option<&str> {
        match self {
            CapabilityName::Mode(instance) => Some(instance),
            _ => None,
        }
    }
}

impl fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityName::Power => write!(f, "power"),
            CapabilityName::Brightness => write!(f, "brightness"),
            CapabilityName::Color => write!(f, "color"),
            CapabilityName::Lock => write!(f, "lock"),
            CapabilityName::Mode(instance) => write!(f, "mode:{}", instance),
            CapabilityName::SensorContact => write!(f, "sensorContact"),
            CapabilityName::SensorTemperature => write!(f, "sensorTemperature"),
            CapabilityName::Other(raw) => write!(f, "{}", raw),
        }
    }
}

impl FromStr for CapabilityName {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CapabilityName::parse(s))
    }
}

impl Serialize for CapabilityName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CapabilityName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(CapabilityName::parse(&raw))
    }
}

/// Assistant interface namespaces the bridge reports under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyNamespace {
    #[serde(rename = "Alexa")]
    Alexa,
    #[serde(rename = "Alexa.PowerController")]
    PowerController,
    #[serde(rename = "Alexa.BrightnessController")]
    BrightnessController,
    #[serde(rename = "Alexa.ColorController")]
    ColorController,
    #[serde(rename = "Alexa.LockController")]
    LockController,
    #[serde(rename = "Alexa.ModeController")]
    ModeController,
    #[serde(rename = "Alexa.ContactSensor")]
    ContactSensor,
    #[serde(rename = "Alexa.TemperatureSensor")]
    TemperatureSensor,
    #[serde(rename = "Alexa.EndpointHealth")]
    EndpointHealth,
    #[serde(rename = "Alexa.DoorbellEventSource")]
    DoorbellEventSource,
}

/// Leaf property names reported under the namespaces above
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyName {
    #[serde(rename = "powerState")]
    PowerState,
    #[serde(rename = "brightness")]
    Brightness,
    #[serde(rename = "color")]
    Color,
    #[serde(rename = "lockState")]
    LockState,
    #[serde(rename = "mode")]
    Mode,
    #[serde(rename = "detectionState")]
    DetectionState,
    #[serde(rename = "temperature")]
    Temperature,
    #[serde(rename = "connectivity")]
    Connectivity,
}

/// Display categories shown in the assistant's device list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayCategory {
    Switch,
    Light,
    Smartlock,
    ContactSensor,
    TemperatureSensor,
    Doorbell,
}

/// Interface namespace for a capability; unknown capabilities map to power.
pub fn property_namespace_for(capability: &CapabilityName) -> PropertyNamespace {
    match capability {
        CapabilityName::Power => PropertyNamespace::PowerController,
        CapabilityName::Brightness => PropertyNamespace::BrightnessController,
        CapabilityName::Color => PropertyNamespace::ColorController,
        CapabilityName::Lock => PropertyNamespace::LockController,
        CapabilityName::Mode(_) => PropertyNamespace::ModeController,
        CapabilityName::SensorContact => PropertyNamespace::ContactSensor,
        CapabilityName::SensorTemperature => PropertyNamespace::TemperatureSensor,
        CapabilityName::Other(_) => PropertyNamespace::PowerController,
    }
}

/// Leaf property name for a capability; unknown capabilities map to power.
pub fn property_name_for(capability: &CapabilityName) -> PropertyName {
    match capability {
        CapabilityName::Power => PropertyName::PowerState,
        CapabilityName::Brightness => PropertyName::Brightness,
        CapabilityName::Color => PropertyName::Color,
        CapabilityName::Lock => PropertyName::LockState,
        CapabilityName::Mode(_) => PropertyName::Mode,
        CapabilityName::SensorContact => PropertyName::DetectionState,
        CapabilityName::SensorTemperature => PropertyName::Temperature,
        CapabilityName::Other(_) => PropertyName::PowerState,
    }
}

/// Display category for a device template
pub fn display_category_for(template: DeviceTemplate) -> DisplayCategory {
    match template {
        DeviceTemplate::Switch => DisplayCategory::Switch,
        DeviceTemplate::Light
        | DeviceTemplate::LightRgb
        | DeviceTemplate::LightBrightness => DisplayCategory::Light,
        DeviceTemplate::Smartlock => DisplayCategory::Smartlock,
        DeviceTemplate::ContactSensor => DisplayCategory::ContactSensor,
        DeviceTemplate::TemperatureSensor => DisplayCategory::TemperatureSensor,
        DeviceTemplate::Doorbell => DisplayCategory::Doorbell,
    }
}

/// A discovery capability descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDescriptor {
    #[serde(rename = "type")]
    pub descriptor_type: String,

    pub interface: PropertyNamespace,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    pub version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<DescriptorProperties>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability_resources: Option<FriendlyResources>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<ModeConfiguration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorProperties {
    pub supported: Vec<SupportedProperty>,

    pub proactively_reported: bool,

    pub retrievable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportedProperty {
    pub name: PropertyName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendlyResources {
    pub friendly_names: Vec<FriendlyName>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendlyName {
    #[serde(rename = "@type")]
    pub name_type: String,
    pub value: FriendlyNameValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendlyNameValue {
    pub text: String,
    pub locale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeConfiguration {
    pub ordered: bool,
    pub supported_modes: Vec<SupportedMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedMode {
    pub value: String,
    pub mode_resources: FriendlyResources,
}

fn friendly_resources(text: &str) -> FriendlyResources {
    FriendlyResources {
        friendly_names: vec![FriendlyName {
            name_type: "text".to_string(),
            value: FriendlyNameValue {
                text: text.to_string(),
                locale: MODE_LOCALE.to_string(),
            },
        }],
    }
}

/// Localized mode names; unknown names fall back to the raw string
fn mode_friendly_name(name: &str) -> &str {
    match name {
        "mode" => "Modo",
        "speed" | "fan_speed" => "Velocidade",
        "temperature" => "Temperatura",
        "intensity" => "Intensidade",
        _ => name,
    }
}

fn mode_friendly_value(value: &str) -> &str {
    match value {
        "low" => "Baixa",
        "medium" => "Média",
        "high" => "Alta",
        "auto" => "Automático",
        "on" => "Ligado",
        "off" => "Desligado",
        _ => value,
    }
}

/// Build the discovery descriptor for a capability.
///
/// Mode capabilities carry their instance, localized resources and the
/// ordered list of supported values; everything else advertises its single
/// supported property as proactively reported and retrievable.
pub fn descriptor_for(
    capability: &CapabilityName,
    modes: &[DeviceMode],
) -> CapabilityDescriptor {
    if let Some(instance) = capability.mode_instance() {
        let values = modes
            .iter()
            .find(|mode| mode.name == instance)
            .map(|mode| mode.values.as_slice())
            .unwrap_or_default();

        return CapabilityDescriptor {
            descriptor_type: "AlexaInterface".to_string(),
            interface: PropertyNamespace::ModeController,
            instance: Some(instance.to_string()),
            version: PAYLOAD_VERSION.to_string(),
            properties: Some(DescriptorProperties {
                supported: vec![SupportedProperty { name: PropertyName::Mode }],
                proactively_reported: true,
                retrievable: true,
            }),
            capability_resources: Some(friendly_resources(mode_friendly_name(instance))),
            configuration: Some(ModeConfiguration {
                ordered: true,
                supported_modes: values
                    .iter()
                    .map(|value| SupportedMode {
                        value: value.clone(),
                        mode_resources: friendly_resources(mode_friendly_value(value)),
                    })
                    .collect(),
            }),
        };
    }

    CapabilityDescriptor {
        descriptor_type: "AlexaInterface".to_string(),
        interface: property_namespace_for(capability),
        instance: None,
        version: PAYLOAD_VERSION.to_string(),
        properties: Some(DescriptorProperties {
            supported: vec![SupportedProperty {
                name: property_name_for(capability),
            }],
            proactively_reported: true,
            retrievable: true,
        }),
        capability_resources: None,
        configuration: None,
    }
}

/// Connectivity descriptor every endpoint gets, looked up nowhere
pub fn endpoint_health_descriptor() -> CapabilityDescriptor {
    CapabilityDescriptor {
        descriptor_type: "AlexaInterface".to_string(),
        interface: PropertyNamespace::EndpointHealth,
        instance: None,
        version: PAYLOAD_VERSION.to_string(),
        properties: Some(DescriptorProperties {
            supported: vec![SupportedProperty {
                name: PropertyName::Connectivity,
            }],
            proactively_reported: false,
            retrievable: true,
        }),
        capability_resources: None,
        configuration: None,
    }
}

/// The plain base interface descriptor added alongside real capabilities
pub fn base_interface_descriptor() -> CapabilityDescriptor {
    CapabilityDescriptor {
        descriptor_type: "AlexaInterface".to_string(),
        interface: PropertyNamespace::Alexa,
        instance: None,
        version: PAYLOAD_VERSION.to_string(),
        properties: None,
        capability_resources: None,
        configuration: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_parse_round_trip() {
        for raw in ["power", "brightness", "color", "lock", "sensorContact", "sensorTemperature", "mode:fan_speed"] {
            assert_eq!(CapabilityName::parse(raw).to_string(), raw);
        }
    }

    #[test]
    fn test_unknown_capability_falls_back_to_power() {
        let unknown = CapabilityName::parse("unknown_capability");
        assert_eq!(
            property_namespace_for(&unknown),
            PropertyNamespace::PowerController
        );
        assert_eq!(property_name_for(&unknown), PropertyName::PowerState);
    }

    #[test]
    fn test_bare_mode_prefix_is_other() {
        assert_eq!(
            CapabilityName::parse("mode:"),
            CapabilityName::Other("mode:".to_string())
        );
    }

    #[test]
    fn test_display_categories() {
        assert_eq!(
            display_category_for(DeviceTemplate::LightRgb),
            DisplayCategory::Light
        );
        assert_eq!(
            display_category_for(DeviceTemplate::Doorbell),
            DisplayCategory::Doorbell
        );
    }

    #[test]
    fn test_mode_descriptor_carries_ordered_values() {
        let modes = vec![DeviceMode {
            name: "speed".to_string(),
            values: vec!["low".to_string(), "high".to_string()],
        }];
        let descriptor = descriptor_for(&CapabilityName::Mode("speed".to_string()), &modes);

        assert_eq!(descriptor.instance.as_deref(), Some("speed"));
        let configuration = descriptor.configuration.unwrap();
        assert!(configuration.ordered);
        assert_eq!(configuration.supported_modes.len(), 2);
        assert_eq!(
            configuration.supported_modes[0].mode_resources.friendly_names[0].value.text,
            "Baixa"
        );
        let resources = descriptor.capability_resources.unwrap();
        assert_eq!(resources.friendly_names[0].value.text, "Velocidade");
    }

    #[test]
    fn test_default_descriptor_shape() {
        let descriptor = descriptor_for(&CapabilityName::Lock, &[]);
        assert_eq!(descriptor.interface, PropertyNamespace::LockController);
        let properties = descriptor.properties.unwrap();
        assert!(properties.proactively_reported);
        assert!(properties.retrievable);
        assert_eq!(properties.supported[0].name, PropertyName::LockState);
    }

    #[test]
    fn test_namespace_wire_names() {
        let json = serde_json::to_string(&PropertyNamespace::PowerController).unwrap();
        assert_eq!(json, "\"Alexa.PowerController\"");
        let json = serde_json::to_string(&PropertyName::LockState).unwrap();
        assert_eq!(json, "\"lockState\"");
        let json = serde_json::to_string(&DisplayCategory::ContactSensor).unwrap();
        assert_eq!(json, "\"CONTACT_SENSOR\"");
    }
}
