//! Error types for query evaluation.

use thiserror::Error;

/// A specialized Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced while validating or evaluating a filter tree.
///
/// Neither kind ever reaches the caller of [`QueryEngine::evaluate`]: the
/// facade logs the error with its node id and property and returns an empty
/// result instead.
///
/// [`QueryEngine::evaluate`]: crate::QueryEngine::evaluate
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// A tree node is structurally invalid: unknown property/operator
    /// combination, or a required value is missing.
    #[error("invalid condition '{node_id}' on {property}: {reason}")]
    Validation {
        /// Id of the offending node.
        node_id: String,
        /// Property selector of the offending node.
        property: String,
        /// What is wrong with the node.
        reason: String,
    },

    /// A runtime failure while computing a value, e.g. an unparsable date in
    /// the query.
    #[error("evaluation failed at condition '{node_id}' on {property}: {reason}")]
    Evaluation {
        /// Id of the offending node.
        node_id: String,
        /// Property selector of the offending node.
        property: String,
        /// What failed.
        reason: String,
    },
}

impl EngineError {
    /// Creates a validation error.
    pub fn validation(
        node_id: impl Into<String>,
        property: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        EngineError::Validation {
            node_id: node_id.into(),
            property: property.into(),
            reason: reason.into(),
        }
    }

    /// Creates an evaluation error.
    pub fn evaluation(
        node_id: impl Into<String>,
        property: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        EngineError::Evaluation {
            node_id: node_id.into(),
            property: property.into(),
            reason: reason.into(),
        }
    }

    /// Error kind label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation { .. } => "validation",
            EngineError::Evaluation { .. } => "evaluation",
        }
    }

    /// Id of the offending node.
    pub fn node_id(&self) -> &str {
        match self {
            EngineError::Validation { node_id, .. } | EngineError::Evaluation { node_id, .. } => {
                node_id
            }
        }
    }

    /// Property selector of the offending node.
    pub fn property(&self) -> &str {
        match self {
            EngineError::Validation { property, .. } | EngineError::Evaluation { property, .. } => {
                property
            }
        }
    }
}
