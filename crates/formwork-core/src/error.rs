//! Form tree error types.

use thiserror::Error;

/// Form tree operation error.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The tree has no control at the requested path.
    #[error("no control at path '{path}'")]
    PathNotFound { path: String },
}

/// Result type alias for tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;
