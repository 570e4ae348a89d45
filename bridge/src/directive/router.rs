//! Directive router
//!
//! One inbound directive per invocation: resolve the endpoint, run the
//! matching capability handler against the shadow, answer with a response
//! envelope. Handler failures never escape as transport errors; they are
//! converted to `ErrorResponse` envelopes because the assistant requires a
//! structured error.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::alexa::capability::{
    property_name_for, property_namespace_for, CapabilityName,
};
use crate::alexa::envelope::{
    names, Context, ContextProperty, Directive, DirectiveEnvelope, Event, Header,
    ResponseEnvelope, Scope,
};
use crate::authn::token::OAuthToken;
use crate::color::{hsb_to_rgb, Hsb};
use crate::directive::error_type_for;
use crate::errors::BridgeError;
use crate::events::discovery::endpoint_descriptor;
use crate::events::translator::EventTranslator;
use crate::http::auth::AuthApi;
use crate::models::device::Device;
use crate::shadow::synchronizer::StateSynchronizer;
use crate::storage::store::{DeviceStore, TokenStore};
use crate::utils::{iso8601, Clock};

/// Directive responses echo shadow acknowledgements, not fresh samples
const RESPONSE_UNCERTAINTY_MS: u64 = 6000;

/// Routes inbound directives to capability handlers
pub struct DirectiveRouter {
    devices: Arc<dyn DeviceStore>,
    tokens: Arc<dyn TokenStore>,
    synchronizer: Arc<StateSynchronizer>,
    translator: Arc<EventTranslator>,
    auth_client: Arc<dyn AuthApi>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, Deserialize)]
struct ScopedPayload {
    scope: Scope,
}

#[derive(Debug, Deserialize)]
struct AcceptGrantPayload {
    grant: Grant,
    grantee: Grantee,
}

#[derive(Debug, Deserialize)]
struct Grant {
    code: String,
}

#[derive(Debug, Deserialize)]
struct Grantee {
    token: String,
}

impl DirectiveRouter {
    pub fn new(
        devices: Arc<dyn DeviceStore>,
        tokens: Arc<dyn TokenStore>,
        synchronizer: Arc<StateSynchronizer>,
        translator: Arc<EventTranslator>,
        auth_client: Arc<dyn AuthApi>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            devices,
            tokens,
            synchronizer,
            translator,
            auth_client,
            clock,
        }
    }

    /// Handle one directive, always producing a response envelope
    pub async fn handle(&self, envelope: DirectiveEnvelope) -> ResponseEnvelope {
        let correlation = envelope.directive.header.correlation_token.clone();
        let endpoint = envelope.directive.endpoint.clone();
        let label = format!(
            "{}#{}",
            envelope.directive.header.namespace, envelope.directive.header.name
        );

        match self.dispatch(envelope.directive).await {
            Ok(response) => response,
            Err(err) => {
                error!("Directive {} failed: {}", label, err);
                ResponseEnvelope::error(
                    error_type_for(&err),
                    &err.to_string(),
                    correlation,
                    endpoint,
                )
            }
        }
    }

    async fn dispatch(&self, directive: Directive) -> Result<ResponseEnvelope, BridgeError> {
        let namespace = directive.header.namespace.clone();
        let name = directive.header.name.clone();

        match (namespace.as_str(), name.as_str()) {
            (names::DISCOVERY, names::DISCOVER) => self.discover(&directive).await,
            (names::AUTHORIZATION, names::ACCEPT_GRANT) => {
                self.accept_grant(&directive).await
            }
            _ => self.endpoint_directive(directive).await,
        }
    }

    /// Directives addressed at a single endpoint
    async fn endpoint_directive(
        &self,
        directive: Directive,
    ) -> Result<ResponseEnvelope, BridgeError> {
        let endpoint = directive.endpoint.clone().ok_or_else(|| {
            BridgeError::InvalidValue("directive carries no endpoint".to_string())
        })?;
        let device = self
            .devices
            .get(&endpoint.endpoint_id)
            .await?
            .ok_or_else(|| BridgeError::NoSuchEndpoint(endpoint.endpoint_id.clone()))?;

        let namespace = directive.header.namespace.as_str();
        let name = directive.header.name.as_str();
        let mut response_name = names::RESPONSE;

        let properties = match (namespace, name) {
            (names::POWER_CONTROLLER, names::TURN_ON) => {
                vec![self.apply_desired(&device.id, CapabilityName::Power, json!("ON")).await?]
            }
            (names::POWER_CONTROLLER, names::TURN_OFF) => {
                vec![self.apply_desired(&device.id, CapabilityName::Power, json!("OFF")).await?]
            }
            (names::BRIGHTNESS_CONTROLLER, names::SET_BRIGHTNESS) => {
                // 0..100 range is the caller's contract; only the type is checked
                let brightness = directive
                    .payload
                    .get("brightness")
                    .filter(|value| value.is_number())
                    .cloned()
                    .ok_or_else(|| {
                        BridgeError::InvalidValue("brightness must be a number".to_string())
                    })?;
                vec![
                    self.apply_desired(&device.id, CapabilityName::Brightness, brightness)
                        .await?,
                ]
            }
            (names::COLOR_CONTROLLER, names::SET_COLOR) => {
                vec![self.set_color(&device, &directive.payload).await?]
            }
            (names::LOCK_CONTROLLER, names::LOCK) => {
                vec![self.apply_desired(&device.id, CapabilityName::Lock, json!("LOCKED")).await?]
            }
            (names::LOCK_CONTROLLER, names::UNLOCK) => {
                vec![
                    self.apply_desired(&device.id, CapabilityName::Lock, json!("UNLOCKED"))
                        .await?,
                ]
            }
            (names::MODE_CONTROLLER, names::SET_MODE) => {
                vec![self.set_mode(&device, &directive).await?]
            }
            (names::ALEXA, names::REPORT_STATE) => {
                response_name = names::STATE_REPORT;
                self.translator.state_report_properties(&device).await?
            }
            _ => {
                // tolerated no-op, kept distinct from real no-op directives
                warn!(
                    "Unrecognized directive {}#{} for {}, answering with empty properties",
                    namespace, name, device.id
                );
                Vec::new()
            }
        };

        let mut header = Header::outbound(names::ALEXA, response_name);
        header.correlation_token = directive.header.correlation_token.clone();

        Ok(ResponseEnvelope {
            event: Event {
                header,
                endpoint: Some(endpoint),
                payload: json!({}),
            },
            context: Some(Context { properties }),
        })
    }

    /// Write one desired value and report what the shadow acknowledged,
    /// falling back to the requested value when the shadow did not echo it.
    async fn apply_desired(
        &self,
        device_id: &str,
        capability: CapabilityName,
        requested: Value,
    ) -> Result<ContextProperty, BridgeError> {
        let mut patch = HashMap::new();
        patch.insert(capability.clone(), requested.clone());

        let mut accepted = self.synchronizer.write_desired(device_id, &patch).await?;
        let value = accepted.remove(&capability).unwrap_or(requested);

        Ok(self.response_property(&capability, value))
    }

    /// Color writes the RGB conversion but echoes the commanded HSB triple;
    /// the device may not confirm exact channel values.
    async fn set_color(
        &self,
        device: &Device,
        payload: &Value,
    ) -> Result<ContextProperty, BridgeError> {
        let hsb: Hsb = payload
            .get("color")
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .ok_or_else(|| {
                BridgeError::InvalidValue("color must carry hue/saturation/brightness".to_string())
            })?;

        let mut patch = HashMap::new();
        patch.insert(CapabilityName::Color, json!(hsb_to_rgb(&hsb)));
        self.synchronizer.write_desired(&device.id, &patch).await?;

        Ok(self.response_property(&CapabilityName::Color, json!(hsb)))
    }

    async fn set_mode(
        &self,
        device: &Device,
        directive: &Directive,
    ) -> Result<ContextProperty, BridgeError> {
        let instance = directive.header.instance.clone().ok_or_else(|| {
            BridgeError::InvalidValue("mode directive carries no instance".to_string())
        })?;
        let mode = directive
            .payload
            .get("mode")
            .filter(|value| value.is_string())
            .cloned()
            .ok_or_else(|| BridgeError::InvalidValue("mode must be a string".to_string()))?;

        self.apply_desired(&device.id, CapabilityName::Mode(instance), mode)
            .await
    }

    fn response_property(&self, capability: &CapabilityName, value: Value) -> ContextProperty {
        ContextProperty {
            namespace: property_namespace_for(capability),
            instance: capability.mode_instance().map(str::to_string),
            name: property_name_for(capability),
            value,
            time_of_sample: iso8601(self.clock.now()),
            uncertainty_in_milliseconds: RESPONSE_UNCERTAINTY_MS,
        }
    }

    /// Discovery: list the calling user's devices as endpoint descriptors
    async fn discover(&self, directive: &Directive) -> Result<ResponseEnvelope, BridgeError> {
        let token = self.scope_token(directive)?;
        let profile = self.auth_client.fetch_profile(&token).await?;

        let devices = self.devices.list_by_owner(&profile.user_id).await?;
        debug!(
            "Discovery for user {}: {} devices",
            profile.user_id,
            devices.len()
        );
        let endpoints: Vec<_> = devices.iter().map(endpoint_descriptor).collect();

        Ok(ResponseEnvelope {
            event: Event {
                header: Header::outbound(names::DISCOVERY, names::DISCOVER_RESPONSE),
                endpoint: None,
                payload: json!({ "endpoints": endpoints }),
            },
            context: None,
        })
    }

    /// Account linking: exchange the grant code and persist the credential
    async fn accept_grant(
        &self,
        directive: &Directive,
    ) -> Result<ResponseEnvelope, BridgeError> {
        let payload: AcceptGrantPayload = serde_json::from_value(directive.payload.clone())
            .map_err(|_| {
                BridgeError::InvalidValue("accept grant payload is malformed".to_string())
            })?;

        let profile = self.auth_client.fetch_profile(&payload.grantee.token).await?;
        let grant = self.auth_client.exchange_code(&payload.grant.code).await?;

        let token = OAuthToken {
            user_id: profile.user_id.clone(),
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            token_type: grant.token_type,
            expires_in: grant.expires_in,
            created_at: self.clock.now(),
            code: Some(payload.grant.code),
        };
        self.tokens.put(&token).await?;
        debug!("Linked account for user {}", profile.user_id);

        Ok(ResponseEnvelope {
            event: Event {
                header: Header::outbound(names::AUTHORIZATION, names::ACCEPT_GRANT_RESPONSE),
                endpoint: None,
                payload: json!({}),
            },
            context: None,
        })
    }

    /// Bearer token from the endpoint scope, falling back to the payload scope
    fn scope_token(&self, directive: &Directive) -> Result<String, BridgeError> {
        if let Some(scope) = directive.endpoint.as_ref().and_then(|e| e.scope.as_ref()) {
            return Ok(scope.token.clone());
        }
        let scoped: ScopedPayload = serde_json::from_value(directive.payload.clone())
            .map_err(|_| {
                BridgeError::InvalidValue("directive carries no bearer scope".to_string())
            })?;
        Ok(scoped.scope.token)
    }
}
