//! State synchronizer
//!
//! Read/write access to device shadows plus the transforms between stored
//! device state and the values the assistant reports: color decoding,
//! absent-value defaults, temperature scale normalization, and the
//! staleness windows that decide what makes it into a report.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use crate::alexa::capability::CapabilityName;
use crate::color::{rgb_to_hsb, Rgb};
use crate::errors::BridgeError;
use crate::shadow::store::{ShadowState, ShadowStore};
use crate::utils::Clock;

/// Reporting windows.
///
/// `stale_window`: a reported property older than this is excluded from
/// state reports. `reachability_window`: a shadow untouched for longer
/// than this marks the endpoint `UNREACHABLE`. Both are deployment
/// configuration, not protocol constants.
#[derive(Debug, Clone)]
pub struct ReportWindows {
    pub stale_window: Duration,

    pub reachability_window: Duration,
}

impl Default for ReportWindows {
    fn default() -> Self {
        Self {
            stale_window: Duration::from_secs(600),
            reachability_window: Duration::from_secs(3600),
        }
    }
}

/// Connectivity values reported under EndpointHealth
pub const CONNECTIVITY_OK: &str = "OK";
pub const CONNECTIVITY_UNREACHABLE: &str = "UNREACHABLE";

/// Shadow access and state transforms
pub struct StateSynchronizer {
    shadow: Arc<dyn ShadowStore>,
    clock: Arc<dyn Clock>,
    windows: ReportWindows,
}

impl StateSynchronizer {
    pub fn new(
        shadow: Arc<dyn ShadowStore>,
        clock: Arc<dyn Clock>,
        windows: ReportWindows,
    ) -> Self {
        Self {
            shadow,
            clock,
            windows,
        }
    }

    /// Fetch a device's shadow state
    pub async fn read_state(&self, device_id: &str) -> Result<ShadowState, BridgeError> {
        self.shadow.get(device_id).await
    }

    /// Patch desired state; returns what the shadow acknowledged
    pub async fn write_desired(
        &self,
        device_id: &str,
        patch: &HashMap<CapabilityName, Value>,
    ) -> Result<HashMap<CapabilityName, Value>, BridgeError> {
        debug!("Writing desired state for {}: {:?}", device_id, patch);
        self.shadow.update_desired(device_id, patch).await
    }

    /// Decode a stored device value into what the assistant expects.
    ///
    /// Color converts stored RGB to HSB; absent power/lock/contact values
    /// fall back to their resting states; temperatures are normalized to
    /// `{value, scale}` with Celsius as the default scale. Everything else
    /// passes through unchanged.
    pub fn to_assistant_value(capability: &CapabilityName, raw: Option<&Value>) -> Value {
        match capability {
            CapabilityName::Color => {
                let rgb = raw
                    .cloned()
                    .and_then(|value| serde_json::from_value::<Rgb>(value).ok())
                    .unwrap_or(Rgb { r: 0.0, g: 0.0, b: 0.0 });
                json!(rgb_to_hsb(&rgb))
            }
            CapabilityName::Power => raw.cloned().unwrap_or_else(|| json!("OFF")),
            CapabilityName::Lock => raw.cloned().unwrap_or_else(|| json!("UNLOCKED")),
            CapabilityName::SensorContact => {
                raw.cloned().unwrap_or_else(|| json!("NOT_DETECTED"))
            }
            CapabilityName::SensorTemperature => match raw {
                Some(Value::Object(fields)) => json!({
                    "value": fields.get("value").cloned().unwrap_or(Value::Null),
                    "scale": fields
                        .get("scale")
                        .cloned()
                        .unwrap_or_else(|| json!("CELSIUS")),
                }),
                Some(Value::Number(value)) => json!({
                    "value": value,
                    "scale": "CELSIUS",
                }),
                _ => json!({ "value": Value::Null, "scale": "CELSIUS" }),
            },
            _ => raw.cloned().unwrap_or(Value::Null),
        }
    }

    /// Whether a reported property is fresh enough to include in a report.
    ///
    /// A property with no report timestamp counts as stale.
    pub fn is_fresh(&self, state: &ShadowState, capability: &CapabilityName) -> bool {
        let now = self.clock.now();
        match state.reported_at.get(capability) {
            Some(reported_at) => {
                let age = now.signed_duration_since(*reported_at);
                age < chrono::Duration::from_std(self.windows.stale_window)
                    .unwrap_or(chrono::Duration::zero())
            }
            None => false,
        }
    }

    /// Endpoint connectivity derived from the shadow's last observation age
    pub fn connectivity(&self, state: &ShadowState) -> &'static str {
        let now = self.clock.now();
        let reachable = state.observed_at.is_some_and(|observed_at| {
            let age = now.signed_duration_since(observed_at);
            age <= chrono::Duration::from_std(self.windows.reachability_window)
                .unwrap_or(chrono::Duration::zero())
        });
        if reachable {
            CONNECTIVITY_OK
        } else {
            CONNECTIVITY_UNREACHABLE
        }
    }
}
