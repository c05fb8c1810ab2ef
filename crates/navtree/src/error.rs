use crate::node::NodeId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors from tree mutation, resolution and dispatch.
#[derive(Debug, Error)]
pub enum TreeError {
    /// A node breaks the root/slug rule or would leave the tree malformed.
    #[error("invalid node state: {0}")]
    InvalidState(String),

    #[error("invalid slug {0:?}: only letters, numbers, underscores or hyphens are allowed")]
    InvalidSlug(String),

    #[error("uniqueness violation: {0}")]
    Uniqueness(Constraint),

    /// Nothing matched a request path (or a handler's sub-path).
    #[error("no node matches {0:?}")]
    NotFound(String),

    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The unique constraint a write would have broken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    ParentSlug { parent: NodeId, slug: String },
    Url(String),
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::ParentSlug { parent, slug } => {
                write!(f, "node {} already has a child with slug {:?}", parent, slug)
            }
            Constraint::Url(url) => write!(f, "url {:?} is already taken", url),
        }
    }
}

/// Errors from resolving a dotted handler path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("An import path with two or more components is required.")]
    Malformed(String),

    #[error("Error importing {0:?}")]
    Import(String),

    #[error("Expected {0:?} to be a handler")]
    NotAHandler(String),
}

impl TreeError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        TreeError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TreeError::NotFound(_))
    }
}
