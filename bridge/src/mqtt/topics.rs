//! MQTT topic definitions

/// MQTT topic patterns
pub struct Topics;

impl Topics {
    /// Topic a device publishes its events on
    pub fn device_event(device_id: &str) -> String {
        format!("domo/device/{}/event", device_id)
    }

    /// Wildcard filter matching every device's event topic
    pub fn device_event_filter() -> String {
        "domo/device/+/event".to_string()
    }

    /// Topic the bridge publishes desired-state deltas on
    pub fn device_delta(device_id: &str) -> String {
        format!("domo/device/{}/delta", device_id)
    }

    /// Parse a topic to extract the device ID
    pub fn parse_device_id(topic: &str) -> Option<String> {
        let parts: Vec<&str> = topic.split('/').collect();
        if parts.len() >= 3 && parts[0] == "domo" && parts[1] == "device" {
            Some(parts[2].to_string())
        } else {
            None
        }
    }

    /// Check if topic is a device event topic
    pub fn is_event_topic(topic: &str) -> bool {
        topic.ends_with("/event")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_generation() {
        assert_eq!(
            Topics::device_event("device-123"),
            "domo/device/device-123/event"
        );
        assert_eq!(
            Topics::device_delta("device-123"),
            "domo/device/device-123/delta"
        );
    }

    #[test]
    fn test_topic_parsing() {
        assert_eq!(
            Topics::parse_device_id("domo/device/device-123/event"),
            Some("device-123".to_string())
        );
        assert_eq!(Topics::parse_device_id("other/device-123/event"), None);
        assert!(Topics::is_event_topic("domo/device/device-123/event"));
        assert!(!Topics::is_event_topic("domo/device/device-123/delta"));
    }
}
