//! Unified error handling for appservice-admin.
//!
//! Errors are split by layer: registration loading, prefix resolution, the
//! client/server API client, the join poll, and the workflows that tie them
//! together. Binaries only need [`WorkflowError::is_configuration`] to pick an
//! exit code.

use thiserror::Error;

pub use crate::registration::{RegistrationError, ValidationError};

// ============================================================================
// Prefix Errors
// ============================================================================

/// Failure to determine which user ids belong to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefixError {
    #[error("Cannot determine prefix for users: Missing configuration in registration")]
    MissingNamespace,

    #[error("Cannot determine prefix for users: Unrecognized regex '{0}'")]
    UnrecognizedRegex(String),
}

// ============================================================================
// Client Errors (client/server API)
// ============================================================================

/// Errors returned by a protocol client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid homeserver url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("homeserver returned {status}: {errcode} - {message}")]
    Api {
        status: u16,
        errcode: String,
        message: String,
    },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Get a static error code string for log labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidBaseUrl { .. } => "invalid_base_url",
            Self::Transport(_) => "transport",
            Self::Api { .. } => "api",
            Self::Decode(_) => "decode",
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

// ============================================================================
// Poll Errors
// ============================================================================

/// Reasons a join poll stops without observing the target.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("membership query failed: {0}")]
    Query(#[from] ClientError),

    #[error("{user_id} did not join {room_id} after {attempts} attempts")]
    AttemptsExhausted {
        user_id: String,
        room_id: String,
        attempts: u32,
    },

    #[error("{user_id} did not join {room_id} within {waited_ms}ms ({attempts} attempts)")]
    TimedOut {
        user_id: String,
        room_id: String,
        attempts: u32,
        waited_ms: u128,
    },

    #[error("wait for {user_id} to join {room_id} cancelled after {attempts} attempts")]
    Cancelled {
        user_id: String,
        room_id: String,
        attempts: u32,
    },
}

impl PollError {
    /// Get a static error code string for log labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Query(e) => e.error_code(),
            Self::AttemptsExhausted { .. } => "attempts_exhausted",
            Self::TimedOut { .. } => "timed_out",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

// ============================================================================
// Workflow Errors
// ============================================================================

/// Errors surfaced by the vacate and send-message workflows.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Prefix(#[from] PrefixError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Poll(#[from] PollError),
}

impl WorkflowError {
    /// Whether this error was detected before any remote request was issued.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Registration(_) | Self::Prefix(_) => true,
            Self::Client(ClientError::InvalidBaseUrl { .. }) => true,
            Self::Client(_) | Self::Poll(_) => false,
        }
    }

    /// Get a static error code string for log labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Registration(_) => "registration",
            Self::Prefix(_) => "prefix",
            Self::Client(e) => e.error_code(),
            Self::Poll(e) => e.error_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_errors_are_configuration() {
        let err = WorkflowError::from(PrefixError::MissingNamespace);
        assert!(err.is_configuration());
    }

    #[test]
    fn api_errors_are_not_configuration() {
        let err = WorkflowError::from(ClientError::Api {
            status: 403,
            errcode: "M_FORBIDDEN".to_string(),
            message: "nope".to_string(),
        });
        assert!(!err.is_configuration());
        assert_eq!(
            err.to_string(),
            "homeserver returned 403: M_FORBIDDEN - nope"
        );
    }

    #[test]
    fn invalid_base_url_is_configuration() {
        let err = WorkflowError::from(ClientError::InvalidBaseUrl {
            url: "nope".to_string(),
            reason: "relative URL without a base".to_string(),
        });
        assert!(err.is_configuration());
    }

    #[test]
    fn error_codes_label_the_failing_layer() {
        let err = ClientError::Decode("eof".to_string());
        assert_eq!(err.error_code(), "decode");

        let err = WorkflowError::from(PollError::Query(ClientError::Api {
            status: 500,
            errcode: "M_UNKNOWN".to_string(),
            message: String::new(),
        }));
        assert_eq!(err.error_code(), "api");

        let err = WorkflowError::from(PollError::TimedOut {
            user_id: "@t:x".to_string(),
            room_id: "!r:x".to_string(),
            attempts: 3,
            waited_ms: 1500,
        });
        assert_eq!(err.error_code(), "timed_out");
        assert_eq!(
            WorkflowError::from(PrefixError::MissingNamespace).error_code(),
            "prefix"
        );
    }
}
