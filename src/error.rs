//! Error types for realmsync.
//!
//! All errors are strongly typed using thiserror so callers can match on the
//! layer that failed: schema lookups, payload decoding, the GraphQL transport,
//! the real on-chain action, or the component store itself.

use thiserror::Error;

use crate::storage::StorageError;

/// Validation errors raised by configuration and input checks.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },

    #[error("Invalid entity key '{value}': {reason}")]
    InvalidKey {
        value: String,
        reason: String,
    },

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },
}

/// Errors from the component schema registry.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Unknown component type: {name}")]
    UnknownComponent {
        name: String,
    },

    #[error("Component type '{name}' is already registered")]
    DuplicateComponent {
        name: String,
    },

    #[error("Component type '{name}' declares no fields")]
    EmptyFieldList {
        name: String,
    },
}

/// Errors raised while decoding query and notification payloads.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Payload is missing '{path}'")]
    MissingField {
        path: String,
    },

    #[error("Unexpected payload shape at '{path}': {message}")]
    UnexpectedShape {
        path: String,
        message: String,
    },

    #[error("Component '{typename}' is not part of the schema")]
    UnknownComponent {
        typename: String,
    },

    #[error("Invalid entity key: {0}")]
    InvalidKey(#[from] ValidationError),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Transport errors for queries and push subscriptions.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        message: String,
    },

    #[error("Request failed: {message}")]
    RequestFailed {
        message: String,
    },

    #[error("GraphQL errors: {messages:?}")]
    GraphQl {
        messages: Vec<String>,
    },

    #[error("Subscription closed by server")]
    SubscriptionClosed,
}

/// Failure reported by the real state-changing action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("Transaction rejected: {message}")]
    Rejected {
        message: String,
    },

    #[error("Transaction reverted: {reason}")]
    Reverted {
        reason: String,
    },

    #[error("Transaction could not be submitted: {message}")]
    Submission {
        message: String,
    },
}

/// Top-level error type for realmsync.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl MirrorError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a decode error.
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    /// Returns true if this is a transport error.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if this is a failure of the real action.
    #[must_use]
    pub const fn is_action(&self) -> bool {
        matches!(self, Self::Action(_))
    }

    /// Returns true if retrying the same request could succeed.
    ///
    /// Nothing in this crate retries; the classification is for callers.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => matches!(
                e,
                TransportError::ConnectionFailed { .. }
                    | TransportError::RequestFailed { .. }
                    | TransportError::SubscriptionClosed
            ),
            Self::Action(e) => matches!(e, ActionError::Submission { .. }),
            _ => false,
        }
    }
}

/// Result type alias for realmsync operations.
pub type MirrorResult<T> = Result<T, MirrorError>;
