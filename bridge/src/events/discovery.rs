//! Discovery endpoint descriptors

use serde::{Deserialize, Serialize};

use crate::alexa::capability::{
    base_interface_descriptor, descriptor_for, display_category_for,
    endpoint_health_descriptor, CapabilityDescriptor, DisplayCategory,
};
use crate::models::device::Device;

/// Manufacturer string stamped on every discovered endpoint
pub const MANUFACTURER_NAME: &str = "Domo DIY";

/// Endpoint description shown in the assistant app
pub const ENDPOINT_DESCRIPTION: &str = "Domo DIY smart home device";

/// A discoverable endpoint as the assistant expects it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDescriptor {
    pub endpoint_id: String,

    pub manufacturer_name: String,

    pub friendly_name: String,

    pub description: String,

    pub display_categories: Vec<DisplayCategory>,

    pub capabilities: Vec<CapabilityDescriptor>,
}

/// Build the discovery descriptor for a device.
///
/// Every endpoint carries connectivity health and the base interface in
/// addition to its registered capabilities; neither is looked up in the
/// registry.
pub fn endpoint_descriptor(device: &Device) -> EndpointDescriptor {
    let mut capabilities = vec![endpoint_health_descriptor(), base_interface_descriptor()];
    capabilities.extend(
        device
            .capabilities
            .iter()
            .map(|capability| descriptor_for(capability, &device.modes)),
    );

    EndpointDescriptor {
        endpoint_id: device.id.clone(),
        manufacturer_name: MANUFACTURER_NAME.to_string(),
        friendly_name: device.display_name.clone(),
        description: ENDPOINT_DESCRIPTION.to_string(),
        display_categories: vec![display_category_for(device.template)],
        capabilities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alexa::capability::{CapabilityName, PropertyNamespace};
    use crate::models::device::DeviceTemplate;
    use chrono::Utc;

    #[test]
    fn test_descriptor_includes_implicit_capabilities() {
        let device = Device {
            id: "dev-1".to_string(),
            owner_user_id: "user-1".to_string(),
            template: DeviceTemplate::LightRgb,
            display_name: "Luz".to_string(),
            capabilities: [
                CapabilityName::Power,
                CapabilityName::Brightness,
                CapabilityName::Color,
            ]
            .into_iter()
            .collect(),
            modes: Vec::new(),
            updated_at: Utc::now(),
        };

        let descriptor = endpoint_descriptor(&device);

        assert_eq!(descriptor.manufacturer_name, MANUFACTURER_NAME);
        assert_eq!(descriptor.display_categories, vec![DisplayCategory::Light]);
        // health + base interface + three registered capabilities
        assert_eq!(descriptor.capabilities.len(), 5);
        assert_eq!(
            descriptor.capabilities[0].interface,
            PropertyNamespace::EndpointHealth
        );
        assert_eq!(descriptor.capabilities[1].interface, PropertyNamespace::Alexa);
    }
}
