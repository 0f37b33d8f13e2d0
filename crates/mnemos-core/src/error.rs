//! Error taxonomy for the engine.

use crate::storage::StorageError;

/// Errors the engine façade can return.
///
/// Input-validation variants carry a precise message and never leave any
/// state changed. Storage errors are wrapped, not swallowed, so the caller
/// can distinguish "your request was invalid" from "the store failed".
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// `kind` did not match any [`crate::memory::MemoryKind`] variant.
    #[error("unknown memory kind: {0}")]
    InvalidKind(String),

    /// An operation referenced an id that does not exist.
    #[error("memory not found: {0}")]
    MissingEntry(String),

    /// `forget` requires exactly one of `id` / `threshold`.
    #[error("forget requires exactly one of `id` or `threshold`, got {0}")]
    AmbiguousForget(&'static str),

    /// Empty content is not a valid memory.
    #[error("content must not be empty")]
    EmptyContent,

    /// A configuration value was out of range or internally inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result alias used throughout the engine façade.
pub type Result<T> = std::result::Result<T, EngineError>;
