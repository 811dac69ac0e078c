// crates/resilience/src/signature.rs
//! Normalized error signatures
//!
//! Errors reach the retry executor in many shapes: bare strings, I/O errors,
//! API failures carrying an HTTP status, boxed trait objects. [`ErrorSignature`]
//! reduces each shape to the three facts classification cares about: a code,
//! a message and an optional response status.

use crate::error::ResilienceError;
use std::borrow::Cow;
use std::io::ErrorKind;
use thiserror::Error;

/// Extracts a classification signature from an error value
pub trait ErrorSignature {
    /// Machine-readable error code (e.g. `ECONNRESET`)
    fn code(&self) -> Option<&str> {
        None
    }

    /// Human-readable message text
    fn message(&self) -> Cow<'_, str>;

    /// HTTP-like response status, if the error came from a response
    fn status(&self) -> Option<u16> {
        None
    }
}

/// Failure reported by an external service call
///
/// HTTP-calling code builds one of these when an API responds with an error,
/// so the status survives to classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServiceError {
    /// Error code, if the service or transport supplied one
    pub code: Option<String>,
    /// Error message
    pub message: String,
    /// Response status, if a response was received
    pub status: Option<u16>,
}

impl ServiceError {
    /// Creates an error from a message alone
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            status: None,
        }
    }

    /// Creates an error for a failed HTTP response
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(message).with_status(status)
    }

    /// Sets the error code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the response status
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl ErrorSignature for ServiceError {
    fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.message)
    }

    fn status(&self) -> Option<u16> {
        self.status
    }
}

impl ErrorSignature for str {
    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl ErrorSignature for String {
    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

/// Resolver failure text across platforms, matched case-insensitively
const LOOKUP_FAILURES: [&str; 4] = [
    "failed to lookup address",
    "name or service not known",
    "nodename nor servname",
    "no such host is known",
];

impl ErrorSignature for std::io::Error {
    fn code(&self) -> Option<&str> {
        match self.kind() {
            ErrorKind::ConnectionReset => Some("ECONNRESET"),
            ErrorKind::TimedOut => Some("ETIMEDOUT"),
            ErrorKind::ConnectionRefused => Some("ECONNREFUSED"),
            ErrorKind::HostUnreachable | ErrorKind::NetworkUnreachable => Some("ENOTFOUND"),
            // DNS lookups surface as uncategorized errors
            _ if is_lookup_failure(&self.to_string()) => Some("ENOTFOUND"),
            _ => None,
        }
    }

    fn message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }
}

fn is_lookup_failure(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    LOOKUP_FAILURES.iter().any(|text| message.contains(text))
}

/// Iterates an error and its `source()` chain, outermost first
fn chain<'a>(
    error: &'a (dyn std::error::Error + 'static),
) -> impl Iterator<Item = &'a (dyn std::error::Error + 'static)> {
    std::iter::successors(Some(error), |e| e.source())
}

impl ErrorSignature for dyn std::error::Error {
    fn code(&self) -> Option<&str> {
        chain(self).find_map(|e| {
            if let Some(service) = e.downcast_ref::<ServiceError>() {
                service.code()
            } else {
                e.downcast_ref::<std::io::Error>().and_then(|io| io.code())
            }
        })
    }

    fn message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn status(&self) -> Option<u16> {
        chain(self).find_map(|e| e.downcast_ref::<ServiceError>().and_then(|s| s.status))
    }
}

impl ErrorSignature for dyn std::error::Error + Send + Sync {
    fn code(&self) -> Option<&str> {
        <dyn std::error::Error as ErrorSignature>::code(self)
    }

    fn message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn status(&self) -> Option<u16> {
        <dyn std::error::Error as ErrorSignature>::status(self)
    }
}

impl<T: ErrorSignature + ?Sized> ErrorSignature for &T {
    fn code(&self) -> Option<&str> {
        (**self).code()
    }

    fn message(&self) -> Cow<'_, str> {
        (**self).message()
    }

    fn status(&self) -> Option<u16> {
        (**self).status()
    }
}

impl<T: ErrorSignature + ?Sized> ErrorSignature for Box<T> {
    fn code(&self) -> Option<&str> {
        (**self).code()
    }

    fn message(&self) -> Cow<'_, str> {
        (**self).message()
    }

    fn status(&self) -> Option<u16> {
        (**self).status()
    }
}

impl<E: ErrorSignature> ErrorSignature for ResilienceError<E> {
    fn code(&self) -> Option<&str> {
        match self {
            ResilienceError::Operation(e) => e.code(),
            ResilienceError::Timeout(_) => Some("ETIMEDOUT"),
            _ => None,
        }
    }

    fn message(&self) -> Cow<'_, str> {
        match self {
            ResilienceError::Operation(e) => e.message(),
            ResilienceError::CircuitOpen(e) => Cow::Owned(e.to_string()),
            ResilienceError::InvalidOptions(e) => Cow::Owned(e.to_string()),
            ResilienceError::Timeout(d) => Cow::Owned(format!("Operation timed out after {d:?}")),
            ResilienceError::Cancelled => Cow::Borrowed("Operation was cancelled"),
        }
    }

    fn status(&self) -> Option<u16> {
        match self {
            ResilienceError::Operation(e) => e.status(),
            _ => None,
        }
    }
}

#[cfg(feature = "reqwest")]
impl ErrorSignature for reqwest::Error {
    fn code(&self) -> Option<&str> {
        if self.is_timeout() {
            Some("ETIMEDOUT")
        } else if self.is_connect() {
            Some("ECONNREFUSED")
        } else {
            None
        }
    }

    fn message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn status(&self) -> Option<u16> {
        self.status().map(|s| s.as_u16())
    }
}
