//! Error types for bootprint-core.

use thiserror::Error;

/// Error produced by a [`crate::PendingValue`] that failed to resolve.
///
/// Kept boxed so the producer's own error type survives the trip through the
/// configuration tree and can be recovered with `downcast`.
pub type SlotError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All errors that can arise while building or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer's root was something other than a mapping.
    #[error("configuration layer must be a mapping, found {found}")]
    NotAMapping { found: &'static str },

    /// YAML parse error while reading a layer from text.
    #[error("failed to parse configuration layer: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A pending value completed with an error.
    #[error("pending value at `{path}` failed: {source}")]
    Pending {
        path: String,
        #[source]
        source: SlotError,
    },

    /// The task driving a pending value panicked or was cancelled.
    #[error("pending value at `{path}` did not complete: {message}")]
    Aborted { path: String, message: String },
}

impl ConfigError {
    /// The error a failed pending value produced, if that is what this is.
    pub fn into_slot_error(self) -> Result<SlotError, Self> {
        match self {
            ConfigError::Pending { source, .. } => Ok(source),
            other => Err(other),
        }
    }
}
