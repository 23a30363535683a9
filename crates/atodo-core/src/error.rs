//! Error types for running the routing graph

use atodo_ai::AiError;
use thiserror::Error;

use crate::graph::NodeId;
use crate::models::MemoryType;

#[derive(Error, Debug)]
pub enum GraphError {
    /// The controller asked for something other than a known memory update.
    #[error("Unrecognized routing decision: {0}")]
    UnrecognizedDecision(String),

    #[error("{node} was entered without a pending tool call")]
    MissingToolCall { node: NodeId },

    #[error("Reconciliation failed: {0}")]
    Reconciliation(#[source] AiError),

    #[error("Model call failed: {0}")]
    Llm(#[source] AiError),

    #[error("Invalid {partition} record: {source}")]
    InvalidRecord {
        partition: MemoryType,
        #[source]
        source: serde_json::Error,
    },

    #[error("Memory store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("Turn exceeded the limit of {limit} steps")]
    StepLimitExceeded { limit: usize },
}

impl GraphError {
    /// Whether the failure came from the model rather than from the graph itself.
    pub fn is_model_failure(&self) -> bool {
        matches!(self, GraphError::Llm(_) | GraphError::Reconciliation(_))
    }
}

/// Result type alias for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;
