//! Event translator
//!
//! Turns device-originated bus events into outbound assistant reports: a
//! registration becomes a discovery `AddOrUpdateReport`, a physical button
//! press becomes a `ChangeReport` (or a doorbell press event). A valid
//! credential is obtained immediately before every gateway call. Errors
//! propagate to the bus consumer so failed reports are retried or
//! dead-lettered there, never dropped here.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::alexa::capability::{
    property_name_for, property_namespace_for, CapabilityName, PropertyName,
    PropertyNamespace,
};
use crate::alexa::envelope::{
    names, Context, ContextProperty, EndpointRef, Event, Header, ResponseEnvelope,
};
use crate::authn::token_mngr::TokenManagerExt;
use crate::errors::BridgeError;
use crate::events::discovery::endpoint_descriptor;
use crate::http::gateway::EventGatewayExt;
use crate::models::device::{Device, DeviceTemplate};
use crate::models::event::{DeviceEvent, PhysicalInteractionEvent, RegisterEvent};
use crate::shadow::synchronizer::StateSynchronizer;
use crate::storage::store::DeviceStore;
use crate::utils::{iso8601, Clock};

/// The triggering property was sampled at the press itself
const TRIGGER_UNCERTAINTY_MS: u64 = 0;

/// Context properties come from the snapshot, not a fresh sample
const CONTEXT_UNCERTAINTY_MS: u64 = 6000;

/// Translates device events into assistant reports
pub struct EventTranslator {
    devices: Arc<dyn DeviceStore>,
    synchronizer: Arc<StateSynchronizer>,
    token_mngr: Arc<dyn TokenManagerExt>,
    gateway: Arc<dyn EventGatewayExt>,
    clock: Arc<dyn Clock>,
}

impl EventTranslator {
    pub fn new(
        devices: Arc<dyn DeviceStore>,
        synchronizer: Arc<StateSynchronizer>,
        token_mngr: Arc<dyn TokenManagerExt>,
        gateway: Arc<dyn EventGatewayExt>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            devices,
            synchronizer,
            token_mngr,
            gateway,
            clock,
        }
    }

    /// Handle one bus event, sending the matching report
    pub async fn handle_event(&self, event: DeviceEvent) -> Result<(), BridgeError> {
        match event {
            DeviceEvent::Register(register) => self.handle_register(register).await,
            DeviceEvent::PhysicalInteraction(interaction) => {
                self.handle_interaction(interaction).await
            }
        }
    }

    /// Registration: persist the device and announce it to the assistant.
    ///
    /// Re-registrations merge into the stored record, so duplicate bus
    /// deliveries are harmless.
    async fn handle_register(&self, event: RegisterEvent) -> Result<(), BridgeError> {
        let incoming = self.device_from_registration(&event);

        let device = match self.devices.get(&event.device_id).await? {
            Some(mut existing) => {
                existing.merge_registration(incoming);
                existing
            }
            None => incoming,
        };
        self.devices.put(&device).await?;
        info!(
            "Registered device {} ({} capabilities)",
            device.id,
            device.capabilities.len()
        );

        let descriptor = endpoint_descriptor(&device);
        let token = self.token_mngr.get_valid_token(&device.owner_user_id).await?;

        let mut header = Header::outbound(names::DISCOVERY, names::ADD_OR_UPDATE_REPORT);
        header.correlation_token = None;
        let report = ResponseEnvelope {
            event: Event {
                header,
                endpoint: None,
                payload: json!({
                    "endpoints": [descriptor],
                    "scope": { "type": "BearerToken", "token": token.access_token.clone() },
                }),
            },
            context: None,
        };

        self.gateway.post_report(&token.access_token, &report).await
    }

    fn device_from_registration(&self, event: &RegisterEvent) -> Device {
        Device {
            id: event.device_id.clone(),
            owner_user_id: event.user_id.clone(),
            template: event.device_template,
            display_name: event
                .device_name
                .clone()
                .unwrap_or_else(|| format!("device_{}", event.device_id)),
            capabilities: event.capabilities().collect(),
            modes: event.modes.clone(),
            updated_at: self.clock.now(),
        }
    }

    /// Physical interaction: a doorbell press event for doorbells, a change
    /// report for everything else.
    async fn handle_interaction(
        &self,
        event: PhysicalInteractionEvent,
    ) -> Result<(), BridgeError> {
        let device = self
            .devices
            .get(&event.device_id)
            .await?
            .ok_or_else(|| BridgeError::NoSuchEndpoint(event.device_id.clone()))?;

        let token = self.token_mngr.get_valid_token(&device.owner_user_id).await?;

        let report = if device.template == DeviceTemplate::Doorbell {
            self.doorbell_press(&device, &token.access_token)
        } else {
            self.change_report(&device, &event, &token.access_token)?
        };

        self.gateway.post_report(&token.access_token, &report).await
    }

    fn doorbell_press(&self, device: &Device, access_token: &str) -> ResponseEnvelope {
        debug!("Doorbell press on {}", device.id);
        ResponseEnvelope {
            event: Event {
                header: Header::outbound(
                    names::DOORBELL_EVENT_SOURCE,
                    names::DOORBELL_PRESS,
                ),
                endpoint: Some(EndpointRef::with_bearer(&device.id, access_token)),
                payload: json!({ "timestamp": iso8601(self.clock.now()) }),
            },
            context: None,
        }
    }

    fn change_report(
        &self,
        device: &Device,
        event: &PhysicalInteractionEvent,
        access_token: &str,
    ) -> Result<ResponseEnvelope, BridgeError> {
        let property = event.property.as_deref().ok_or_else(|| {
            BridgeError::InvalidValue(format!(
                "physical interaction on {} carries no property",
                device.id
            ))
        })?;
        let trigger = CapabilityName::parse(property);

        let trigger_property = self.snapshot_property(
            &trigger,
            event.state.get(&trigger),
            TRIGGER_UNCERTAINTY_MS,
        );

        let context_properties: Vec<ContextProperty> = event
            .state
            .iter()
            .filter(|(capability, _)| **capability != trigger)
            .map(|(capability, value)| {
                self.snapshot_property(capability, Some(value), CONTEXT_UNCERTAINTY_MS)
            })
            .collect();

        // a pending correlation turns the report into a direct response
        if let Some(correlation) = &event.correlation {
            let mut header = Header::outbound(names::ALEXA, names::STATE_REPORT);
            header.correlation_token = Some(correlation.clone());
            let mut properties = vec![trigger_property];
            properties.extend(context_properties);
            return Ok(ResponseEnvelope {
                event: Event {
                    header,
                    endpoint: Some(EndpointRef::with_bearer(&device.id, access_token)),
                    payload: json!({}),
                },
                context: Some(Context { properties }),
            });
        }

        Ok(ResponseEnvelope {
            event: Event {
                header: Header::outbound(names::ALEXA, names::CHANGE_REPORT),
                endpoint: Some(EndpointRef::with_bearer(&device.id, access_token)),
                payload: json!({
                    "change": {
                        "cause": { "type": "PHYSICAL_INTERACTION" },
                        "properties": [trigger_property],
                    }
                }),
            },
            context: Some(Context {
                properties: context_properties,
            }),
        })
    }

    fn snapshot_property(
        &self,
        capability: &CapabilityName,
        raw: Option<&Value>,
        uncertainty_ms: u64,
    ) -> ContextProperty {
        ContextProperty {
            namespace: property_namespace_for(capability),
            instance: capability.mode_instance().map(str::to_string),
            name: property_name_for(capability),
            value: StateSynchronizer::to_assistant_value(capability, raw),
            time_of_sample: iso8601(self.clock.now()),
            uncertainty_in_milliseconds: uncertainty_ms,
        }
    }

    /// Properties for a full state report: every declared capability that is
    /// still fresh, plus derived endpoint connectivity.
    pub async fn state_report_properties(
        &self,
        device: &Device,
    ) -> Result<Vec<ContextProperty>, BridgeError> {
        let state = self.synchronizer.read_state(&device.id).await?;

        let mut properties: Vec<ContextProperty> = device
            .capabilities
            .iter()
            .filter(|capability| self.synchronizer.is_fresh(&state, capability))
            .map(|capability| {
                self.snapshot_property(
                    capability,
                    state.reported.get(capability),
                    CONTEXT_UNCERTAINTY_MS,
                )
            })
            .collect();

        properties.push(ContextProperty {
            namespace: PropertyNamespace::EndpointHealth,
            instance: None,
            name: PropertyName::Connectivity,
            value: json!(self.synchronizer.connectivity(&state)),
            time_of_sample: iso8601(self.clock.now()),
            uncertainty_in_milliseconds: 0,
        });

        Ok(properties)
    }
}
