//! Configuration layers and the values that may still be loading when a
//! layer is assembled.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use crate::error::{ConfigError, SlotError};
use crate::merge::value_kind;

// ---------------------------------------------------------------------------
// KeyPath
// ---------------------------------------------------------------------------

/// A dotted path into a configuration tree, e.g. `tera.data`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath(pub Vec<String>);

impl KeyPath {
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether `self` equals `other` or lies underneath it.
    pub fn starts_with(&self, other: &KeyPath) -> bool {
        self.0.starts_with(&other.0)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.join(".").fmt(f)
    }
}

impl From<&str> for KeyPath {
    fn from(s: &str) -> Self {
        Self(s.split('.').filter(|k| !k.is_empty()).map(str::to_owned).collect())
    }
}

impl From<&[&str]> for KeyPath {
    fn from(keys: &[&str]) -> Self {
        Self(keys.iter().map(|k| (*k).to_owned()).collect())
    }
}

// ---------------------------------------------------------------------------
// PendingValue
// ---------------------------------------------------------------------------

type BoxedFuture = Pin<Box<dyn Future<Output = Result<Value, SlotError>> + Send + 'static>>;

enum PendingInner {
    Future(BoxedFuture),
    Task(AbortOnDrop),
}

/// A spawned task that is cancelled if its value is never awaited.
struct AbortOnDrop(JoinHandle<Result<Value, SlotError>>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// A configuration value that is still being produced.
///
/// The tree stores it as-is; [`crate::ConfigTree::resolve`] awaits it before
/// anything is rendered.
pub struct PendingValue {
    inner: PendingInner,
}

impl PendingValue {
    /// Wrap a future that is polled only when the tree is resolved.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, SlotError>> + Send + 'static,
    {
        Self { inner: PendingInner::Future(Box::pin(future)) }
    }

    /// Start `future` on the current tokio runtime right away, so it runs
    /// concurrently with whatever happens before resolution.
    ///
    /// Dropping the value unresolved aborts the task.
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, SlotError>> + Send + 'static,
    {
        Self { inner: PendingInner::Task(AbortOnDrop(tokio::spawn(future))) }
    }

    /// An already-available value.
    pub fn ready(value: Value) -> Self {
        Self::new(async move { Ok(value) })
    }

    pub(crate) async fn wait(self, path: &KeyPath) -> Result<Value, ConfigError> {
        let result = match self.inner {
            PendingInner::Future(future) => future.await,
            PendingInner::Task(mut task) => (&mut task.0).await.map_err(|e| ConfigError::Aborted {
                path: path.to_string(),
                message: e.to_string(),
            })?,
        };
        result.map_err(|source| ConfigError::Pending { path: path.to_string(), source })
    }
}

impl fmt::Debug for PendingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.inner {
            PendingInner::Future(_) => "future",
            PendingInner::Task(_) => "task",
        };
        f.debug_struct("PendingValue").field("kind", &kind).finish()
    }
}

// ---------------------------------------------------------------------------
// ConfigLayer
// ---------------------------------------------------------------------------

/// One overlay of configuration: namespace → options.
///
/// `base_dir` is where relative paths inside this layer are anchored; engines
/// consult it when they expand directory references.
#[derive(Debug, Default)]
pub struct ConfigLayer {
    values: Map<String, Value>,
    pending: Vec<(KeyPath, PendingValue)>,
    base_dir: Option<PathBuf>,
}

impl ConfigLayer {
    /// An empty layer.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a layer from a value tree. `null` is accepted as an empty layer.
    pub fn new(values: Value) -> Result<Self, ConfigError> {
        match values {
            Value::Object(values) => Ok(Self { values, ..Self::default() }),
            Value::Null => Ok(Self::default()),
            other => Err(ConfigError::NotAMapping { found: value_kind(&other) }),
        }
    }

    /// Parse a layer from YAML (or JSON) text.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_yaml::from_str(text)?;
        Self::new(value)
    }

    /// Anchor relative paths in this layer at `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Add a value that will be filled in at `path` once it is available.
    pub fn with_pending(mut self, path: impl Into<KeyPath>, value: PendingValue) -> Self {
        self.pending.push((path.into(), value));
        self
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.values
    }

    /// Top-level namespaces this layer touches, ready or pending.
    pub fn namespaces(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        for (path, _) in &self.pending {
            if let Some(first) = path.segments().first() {
                if !names.contains(&first.as_str()) {
                    names.push(first.as_str());
                }
            }
        }
        names
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.pending.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Map<String, Value>, Vec<(KeyPath, PendingValue)>) {
        (self.values, self.pending)
    }
}
