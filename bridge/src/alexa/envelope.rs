//! Directive and report envelopes
//!
//! Wire shapes for the assistant's smart-home v3 protocol: inbound
//! directives, synchronous responses, and the outbound report envelopes
//! posted to the event gateway. Header namespace/name stay plain strings so
//! an unrecognized directive deserializes fine and can be answered as a
//! tolerated no-op instead of a transport failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::alexa::capability::{PropertyName, PropertyNamespace, PAYLOAD_VERSION};
use crate::utils::generate_uuid;

/// Directive namespace/name strings the router dispatches on
pub mod names {
    pub const ALEXA: &str = "Alexa";
    pub const POWER_CONTROLLER: &str = "Alexa.PowerController";
    pub const BRIGHTNESS_CONTROLLER: &str = "Alexa.BrightnessController";
    pub const COLOR_CONTROLLER: &str = "Alexa.ColorController";
    pub const LOCK_CONTROLLER: &str = "Alexa.LockController";
    pub const MODE_CONTROLLER: &str = "Alexa.ModeController";
    pub const DISCOVERY: &str = "Alexa.Discovery";
    pub const AUTHORIZATION: &str = "Alexa.Authorization";
    pub const DOORBELL_EVENT_SOURCE: &str = "Alexa.DoorbellEventSource";

    pub const TURN_ON: &str = "TurnOn";
    pub const TURN_OFF: &str = "TurnOff";
    pub const SET_BRIGHTNESS: &str = "SetBrightness";
    pub const SET_COLOR: &str = "SetColor";
    pub const LOCK: &str = "Lock";
    pub const UNLOCK: &str = "Unlock";
    pub const SET_MODE: &str = "SetMode";
    pub const REPORT_STATE: &str = "ReportState";
    pub const DISCOVER: &str = "Discover";
    pub const ACCEPT_GRANT: &str = "AcceptGrant";

    pub const RESPONSE: &str = "Response";
    pub const STATE_REPORT: &str = "StateReport";
    pub const ERROR_RESPONSE: &str = "ErrorResponse";
    pub const CHANGE_REPORT: &str = "ChangeReport";
    pub const ADD_OR_UPDATE_REPORT: &str = "AddOrUpdateReport";
    pub const DISCOVER_RESPONSE: &str = "Discover.Response";
    pub const ACCEPT_GRANT_RESPONSE: &str = "AcceptGrant.Response";
    pub const DOORBELL_PRESS: &str = "DoorbellPress";
}

/// Inbound directive envelope, one per invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectiveEnvelope {
    pub directive: Directive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Directive {
    pub header: Header,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<EndpointRef>,

    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub namespace: String,

    pub name: String,

    pub message_id: String,

    pub payload_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,

    /// Mode directives address a specific capability instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl Header {
    /// Build a response/report header with a freshly generated message id
    pub fn outbound(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            message_id: generate_uuid(),
            payload_version: PAYLOAD_VERSION.to_string(),
            correlation_token: None,
            instance: None,
        }
    }
}

/// Endpoint reference carried by directives and echoed in responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,

    pub endpoint_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<Value>,
}

impl EndpointRef {
    pub fn new(endpoint_id: &str) -> Self {
        Self {
            scope: None,
            endpoint_id: endpoint_id.to_string(),
            cookie: None,
        }
    }

    pub fn with_bearer(endpoint_id: &str, token: &str) -> Self {
        Self {
            scope: Some(Scope::bearer(token)),
            endpoint_id: endpoint_id.to_string(),
            cookie: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    #[serde(rename = "type")]
    pub scope_type: String,

    pub token: String,
}

impl Scope {
    pub fn bearer(token: &str) -> Self {
        Self {
            scope_type: "BearerToken".to_string(),
            token: token.to_string(),
        }
    }
}

/// Outbound envelope: synchronous directive responses and gateway reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub event: Event,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub header: Header,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<EndpointRef>,

    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Context {
    pub properties: Vec<ContextProperty>,
}

/// A single reported property
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextProperty {
    pub namespace: PropertyNamespace,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    pub name: PropertyName,

    pub value: Value,

    pub time_of_sample: String,

    pub uncertainty_in_milliseconds: u64,
}

/// Error response payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(rename = "type")]
    pub error_type: ErrorType,

    pub message: String,
}

/// Error types the assistant understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    BridgeUnreachable,
    EndpointUnreachable,
    ExpiredAuthorizationCredential,
    InternalError,
    InvalidAuthorizationCredential,
    InvalidDirective,
    InvalidValue,
    NoSuchEndpoint,
    NotSupportedInCurrentMode,
    RateLimitExceeded,
    ValueOutOfRange,
}

impl ResponseEnvelope {
    /// Build an error response for a failed directive
    pub fn error(
        error_type: ErrorType,
        message: &str,
        correlation_token: Option<String>,
        endpoint: Option<EndpointRef>,
    ) -> Self {
        let mut header = Header::outbound(names::ALEXA, names::ERROR_RESPONSE);
        header.correlation_token = correlation_token;
        Self {
            event: Event {
                header,
                endpoint,
                payload: serde_json::to_value(ErrorPayload {
                    error_type,
                    message: message.to_string(),
                })
                .unwrap_or(Value::Null),
            },
            context: None,
        }
    }
}
