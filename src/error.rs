//! Error types for registration, dispatch and response delivery.
//!
//! Three kinds of failure exist and they never mix:
//!
//! - [`RegistrationError`] is returned synchronously from the registration API
//!   (`Router::get`, `Router::mount`, ...). It never enters the dispatch pipeline.
//! - [`HandlerError`] is the value that travels through the error-handler chain. Handler
//!   failures, rejected deferred outcomes, caught panics and the synthesized 404 all take
//!   this shape.
//! - [`ResponseDispatchError`] is raised by a [`Response`](crate::server::Response)
//!   implementation when it cannot deliver a body. The router logs it and gives up.

use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::fmt;

/// Invalid arguments to a registration call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// A handler list (or one of its nested lists) was empty
    EmptyHandlers {
        /// Method tag the chain was being built for
        method: String,
    },
    /// A path pattern could not be compiled
    InvalidPattern {
        /// The cleaned pattern as registered
        pattern: String,
        /// Why compilation failed
        reason: String,
    },
    /// `Use::Mount` was given base paths but no routers to mount
    MissingRouters {
        /// The base paths that had nothing to mount
        base_paths: Vec<String>,
    },
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::EmptyHandlers { method } => {
                write!(
                    f,
                    "registration error: at least one handler must be supplied for '{method}'"
                )
            }
            RegistrationError::InvalidPattern { pattern, reason } => {
                write!(
                    f,
                    "registration error: invalid route pattern '{pattern}': {reason}"
                )
            }
            RegistrationError::MissingRouters { base_paths } => {
                write!(
                    f,
                    "registration error: at least one router must be supplied for base path(s) {base_paths:?}"
                )
            }
        }
    }
}

impl std::error::Error for RegistrationError {}

/// Failure value carried through the error-handler chain.
///
/// `status` is consumed when the router sends the error as a response: the
/// code becomes the response status and the field is cleared, so it does not
/// show up in the serialized body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerError {
    /// HTTP-style status code to respond with (500 when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Human-readable message
    pub message: String,
    /// Optional structured payload sent alongside the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl HandlerError {
    /// Message used for the synthesized not-found failure.
    pub const NOT_FOUND: &'static str = "Not Found";

    /// Create an error without a status
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            details: None,
        }
    }

    /// Create an error carrying a status code
    #[must_use]
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            details: None,
        }
    }

    /// The failure synthesized when no route matches a request
    #[must_use]
    pub fn not_found() -> Self {
        Self::with_status(404, Self::NOT_FOUND)
    }

    /// Attach a structured payload
    #[must_use]
    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Remove and return the status code, leaving `None` behind.
    ///
    /// A status of `0` counts as absent.
    pub fn take_status(&mut self) -> Option<u16> {
        self.status.take().filter(|s| *s != 0)
    }

    /// Convert a caught panic payload into a 500 error
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::with_status(500, format!("Handler panicked: {message}"))
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({status})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for HandlerError {}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_status(400, err.to_string())
    }
}

impl From<ResponseDispatchError> for HandlerError {
    fn from(err: ResponseDispatchError) -> Self {
        Self::with_status(500, err.to_string())
    }
}

/// A response could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDispatchError {
    message: String,
}

impl ResponseDispatchError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ResponseDispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to send response: {}", self.message)
    }
}

impl std::error::Error for ResponseDispatchError {}
