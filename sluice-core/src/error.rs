use crate::{Error, Result};

/// Stage that produced a pipeline failure.
///
/// Every error leaving the executor carries one of these, either as the error itself or as
/// `anyhow` context, so it can be recovered with [`error_kind`] regardless of how many context
/// layers were added on the way out.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed metadata, missing setter, unknown statement or result map.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Placeholder count mismatch or a value that cannot be encoded.
    #[error("Binding error: {0}")]
    Binding(String),
    /// Failure reported by the driver while running the command.
    #[error("Execution error: {0}")]
    Execution(String),
    /// Coercion failure, no usable constructor, unknown column under a strict policy.
    #[error("Mapping error: {0}")]
    Mapping(String),
    /// Explicitly rejected operation (non prepared statements, nested queries).
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl ErrorKind {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(..))
    }
    pub fn is_binding(&self) -> bool {
        matches!(self, Self::Binding(..))
    }
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(..))
    }
    pub fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping(..))
    }
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(..))
    }
}

/// Returns the stage classification attached to the error, if any.
pub fn error_kind(error: &Error) -> Option<&ErrorKind> {
    error.downcast_ref::<ErrorKind>()
}

/// Attaches an [`ErrorKind`] to errors that do not have one yet.
///
/// The innermost classification wins: an error already classified as a mapping error stays a
/// mapping error even when it travels through the execution path.
pub trait Classify<T> {
    fn classify<F>(self, kind: F) -> Result<T>
    where
        F: FnOnce() -> ErrorKind;
}

impl<T> Classify<T> for Result<T> {
    fn classify<F>(self, kind: F) -> Result<T>
    where
        F: FnOnce() -> ErrorKind,
    {
        self.map_err(|error| {
            if error_kind(&error).is_some() {
                error
            } else {
                error.context(kind())
            }
        })
    }
}
