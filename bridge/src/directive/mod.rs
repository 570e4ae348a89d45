//! Directive routing

pub mod router;

use crate::alexa::envelope::ErrorType;
use crate::errors::BridgeError;

/// Map an internal error to the structured error type the assistant expects
pub fn error_type_for(err: &BridgeError) -> ErrorType {
    match err {
        BridgeError::NoSuchEndpoint(_) => ErrorType::NoSuchEndpoint,
        BridgeError::AuthExpired(_) => ErrorType::ExpiredAuthorizationCredential,
        BridgeError::InvalidValue(_) => ErrorType::InvalidValue,
        BridgeError::UpstreamUnavailable(_) => ErrorType::BridgeUnreachable,
        BridgeError::UnsupportedDirective(_) => ErrorType::InvalidDirective,
        _ => ErrorType::InternalError,
    }
}
