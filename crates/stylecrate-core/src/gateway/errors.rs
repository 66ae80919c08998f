//! Structured gateway errors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generic message shown when a request could not complete.
pub const RETRY_MESSAGE: &str = "Please try again";

/// Generic message shown when the style lookup could not complete.
pub const STYLE_RETRY_MESSAGE: &str = "Some error occurred. Please try again.";

/// Categories of gateway errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorKind {
    /// The API responded but reported a domain-level error
    Application,
    /// The request could not complete (connection, timeout, HTTP status, undecodable body)
    Transport,
}

impl fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayErrorKind::Application => write!(f, "application"),
            GatewayErrorKind::Transport => write!(f, "transport"),
        }
    }
}

/// Error from a gateway operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    /// Error category
    pub kind: GatewayErrorKind,
    /// Message suitable for display
    pub message: String,
    /// Underlying cause, for logs only
    pub details: Option<String>,
}

impl GatewayError {
    /// First server-reported message, surfaced verbatim.
    pub fn application(message: impl Into<String>) -> Self {
        Self {
            kind: GatewayErrorKind::Application,
            message: message.into(),
            details: None,
        }
    }

    /// Transport failure with a fixed display message and the cause kept aside.
    pub fn transport(message: impl Into<String>, details: impl fmt::Display) -> Self {
        Self {
            kind: GatewayErrorKind::Transport,
            message: message.into(),
            details: Some(details.to_string()),
        }
    }

    pub fn is_transport(&self) -> bool {
        self.kind == GatewayErrorKind::Transport
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for GatewayError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_shows_message_only() {
        let err = GatewayError::transport(RETRY_MESSAGE, "connection refused");
        assert_eq!(err.to_string(), "Please try again");
        assert_eq!(err.details.as_deref(), Some("connection refused"));
        assert!(err.is_transport());
    }

    #[test]
    fn test_application_error_is_verbatim() {
        let err = GatewayError::application("Invalid credentials");
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(err.kind, GatewayErrorKind::Application);
        assert!(err.details.is_none());
    }
}
