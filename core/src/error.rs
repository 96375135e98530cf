//! Error types for the getAddress.io client.
//!
//! # Design
//! `AuthenticationError` gets a dedicated variant because callers nearly
//! always want to tell "the key is wrong or missing" apart from "the service
//! could not answer." Everything else that goes wrong on the wire lands in
//! `LookupError` with the status (when there was one) and the service's
//! message. Local precondition failures never reach the network and surface
//! as `ValidationError`.

use thiserror::Error;

/// Errors returned by `Client` operations and entity constructors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller-supplied input failed a local precondition.
    #[error("invalid argument: {0}")]
    ValidationError(String),

    /// The service returned 401, or an admin call was made without an admin key.
    #[error("authentication failed: {0}")]
    AuthenticationError(String),

    /// Any other transport or remote-side failure. `status` is `None` when
    /// the request never produced a response.
    #[error("lookup failed: {message}")]
    LookupError { status: Option<u16>, message: String },

    /// The response body was not valid JSON.
    #[error("could not decode response: {0}")]
    DecodeError(String),

    /// A named field was requested from a response that does not carry it.
    #[error("property {0} does not exist in response")]
    MissingFieldError(String),

    /// A distance was requested in a unit that is not supported.
    #[error("unsupported distance unit: {0}")]
    UnitError(String),

    /// A request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        ApiError::ValidationError(message.into())
    }

    pub(crate) fn lookup(status: Option<u16>, message: impl Into<String>) -> Self {
        ApiError::LookupError {
            status,
            message: message.into(),
        }
    }
}
