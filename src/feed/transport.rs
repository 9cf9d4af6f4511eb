//! Boundary to the indexer's GraphQL endpoint.

use std::pin::Pin;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_stream::Stream;

use crate::error::TransportError;

/// A GraphQL operation as sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlRequest {
    /// Query or subscription document.
    pub query: String,
    /// Operation variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
    /// Name of the operation to run when the document holds several.
    #[serde(
        default,
        rename = "operationName",
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_name: Option<String>,
}

impl GraphQlRequest {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: None,
            operation_name: None,
        }
    }

    #[must_use]
    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }

    #[must_use]
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// Push messages of a subscription. Each item is the `data` object of one
/// message; the stream ends when the server completes the subscription.
pub type NotificationStream = Pin<Box<dyn Stream<Item = Result<Value, TransportError>> + Send>>;

/// Query and subscription client.
///
/// Implementations strip the GraphQL response envelope: `request` resolves to
/// the `data` object, and responses carrying `errors` become
/// [`TransportError::GraphQl`].
#[async_trait]
pub trait GraphQlTransport: Send + Sync {
    /// Runs a query and returns its `data` object.
    async fn request(&self, request: GraphQlRequest) -> Result<Value, TransportError>;

    /// Opens a push subscription.
    async fn subscribe(&self, request: GraphQlRequest) -> Result<NotificationStream, TransportError>;
}
