//! Error types for bootprint-renderer.

use std::path::PathBuf;

use bootprint_core::ConfigError;
use thiserror::Error;

/// All errors that can arise from configuring or running the render pipeline.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Tera template engine error (parsing, context building).
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// A single template failed to render.
    #[error("failed to render template `{name}`: {source}")]
    Template {
        name: String,
        #[source]
        source: tera::Error,
    },

    /// SCSS compilation failed.
    #[error("stylesheet compilation failed: {message}")]
    Style { message: String },

    /// Engine options did not deserialize.
    #[error("engine options error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while expanding template directories or reading styles.
    #[error("render io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Building or resolving the configuration tree failed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A layer referenced a namespace with no registered engine.
    #[error("no engine registered for namespace `{name}`")]
    UnknownEngine { name: String },

    /// A namespace's options had the wrong shape.
    #[error("invalid `{namespace}` configuration: {message}")]
    InvalidConfig { namespace: String, message: String },

    /// Two engines wrote the same output path.
    #[error("output `{path}` produced by both `{first}` and `{second}`")]
    DuplicateOutput {
        path: String,
        first: String,
        second: String,
    },

    /// A module's builder reported a failure of its own.
    #[error("module `{name}` failed: {message}")]
    Module { name: String, message: String },

    /// The blocking render task panicked or was cancelled.
    #[error("render task did not complete: {0}")]
    Aborted(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}

pub(crate) fn invalid(namespace: &str, message: impl Into<String>) -> RenderError {
    RenderError::InvalidConfig {
        namespace: namespace.to_owned(),
        message: message.into(),
    }
}
