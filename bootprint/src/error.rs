//! Error types for bootprint.
//!
//! Input failures are the only ones classified: every [`InputError`] that
//! reaches the caller is wrapped in a [`LoadDataError`] carrying an optional
//! [`ErrorCause`] tag, so a CLI can tell "your input was bad or unreachable"
//! apart from everything else without reading messages.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use bootprint_core::ConfigError;
use bootprint_renderer::RenderError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Failure while resolving an input reference into a document.
#[derive(Debug, Error)]
pub enum InputError {
    /// The input file does not exist. Message only, no source chain.
    #[error("{message}")]
    CouldNotLoadInput { message: String },

    /// Any other failure reading the input file.
    #[error("failed to read input {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP request could not be completed.
    #[error("failed to fetch {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with status 400 or above.
    #[error("failed to fetch {url}: HTTP status {status}")]
    Status { url: String, status: u16 },

    /// The text was not valid YAML (or JSON).
    #[error("failed to parse input data: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Stable tag attached to classified errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCause {
    /// Loading the input data failed.
    LoadData,
}

impl ErrorCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCause::LoadData => "bootprint-load-data",
        }
    }
}

impl fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An [`InputError`] plus its classification.
///
/// Displays exactly like the wrapped error and shares its source chain.
#[derive(Debug)]
pub struct LoadDataError {
    pub cause: Option<ErrorCause>,
    pub error: InputError,
}

impl fmt::Display for LoadDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for LoadDataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.error)
    }
}

impl LoadDataError {
    /// Whether this is the missing-input condition.
    pub fn is_missing_input(&self) -> bool {
        matches!(self.error, InputError::CouldNotLoadInput { .. })
    }
}

/// Tag an input failure with [`ErrorCause::LoadData`].
///
/// `CouldNotLoadInput` already has a distinct, user-facing shape and is
/// passed through untagged.
pub fn classify_input_error(error: InputError) -> LoadDataError {
    let cause = match error {
        InputError::CouldNotLoadInput { .. } => None,
        _ => Some(ErrorCause::LoadData),
    };
    LoadDataError { cause, error }
}

// ---------------------------------------------------------------------------
// Module
// ---------------------------------------------------------------------------

/// Failure while resolving a module reference.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Neither a registered module nor an existing directory.
    #[error("module `{name}` not found: no registered module `{package}` and no directory at {path}")]
    NotFound {
        name: String,
        package: String,
        path: PathBuf,
    },

    /// The module manifest is not valid YAML or has the wrong shape.
    #[error("invalid module manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The manifest's `config` section is not a configuration layer.
    #[error("invalid configuration in module manifest {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// Any other filesystem failure while opening a module directory.
    #[error("module io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `extends` chains loop back on themselves.
    #[error("module {path} extends itself (chain: {chain})")]
    Cycle { path: PathBuf, chain: String },
}

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

/// Failure while writing rendered output.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A rendered path is absolute or climbs out of the target directory.
    #[error("refusing to write {path}: outside the target directory")]
    OutsideTarget { path: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> WriteError {
    WriteError::Io {
        path: path.into(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

/// Everything [`crate::Bootprint::run`] can fail with.
#[derive(Debug, Error)]
pub enum BootprintError {
    #[error(transparent)]
    Input(#[from] LoadDataError),

    #[error("module error: {0}")]
    Module(#[from] ModuleError),

    #[error("render error: {0}")]
    Render(RenderError),

    #[error("write error: {0}")]
    Write(#[from] WriteError),
}

impl BootprintError {
    /// The classification tag, if any.
    pub fn cause(&self) -> Option<ErrorCause> {
        match self {
            BootprintError::Input(err) => err.cause,
            _ => None,
        }
    }

    /// Whether the input file did not exist.
    pub fn is_missing_input(&self) -> bool {
        matches!(self, BootprintError::Input(err) if err.is_missing_input())
    }
}

impl From<RenderError> for BootprintError {
    /// A render failure whose root is the input document's pending value is
    /// an input failure, not a render failure.
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Config(ConfigError::Pending { path, source }) => {
                match source.downcast::<LoadDataError>() {
                    Ok(load) => BootprintError::Input(*load),
                    Err(source) => {
                        BootprintError::Render(RenderError::Config(ConfigError::Pending {
                            path,
                            source,
                        }))
                    }
                }
            }
            other => BootprintError::Render(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_is_not_tagged() {
        let err = classify_input_error(InputError::CouldNotLoadInput {
            message: "Input could not be loaded: nope".into(),
        });
        assert_eq!(err.cause, None);
        assert!(err.is_missing_input());
        assert_eq!(err.to_string(), "Input could not be loaded: nope");
    }

    #[test]
    fn other_input_errors_are_tagged() {
        let err = classify_input_error(InputError::Status {
            url: "http://localhost/x".into(),
            status: 404,
        });
        assert_eq!(err.cause, Some(ErrorCause::LoadData));
        assert_eq!(err.cause.map(|c| c.as_str()), Some("bootprint-load-data"));
        assert!(!err.is_missing_input());
    }

    #[test]
    fn pending_input_failure_unwraps_to_input_error() {
        let load = classify_input_error(InputError::Status {
            url: "http://localhost/x".into(),
            status: 500,
        });
        let render = RenderError::Config(ConfigError::Pending {
            path: "tera.data".into(),
            source: Box::new(load),
        });
        let err = BootprintError::from(render);
        assert_eq!(err.cause(), Some(ErrorCause::LoadData));
    }

    #[test]
    fn other_render_errors_stay_untagged() {
        let err = BootprintError::from(RenderError::UnknownEngine { name: "less".into() });
        assert!(matches!(err, BootprintError::Render(_)));
        assert_eq!(err.cause(), None);
    }
}
