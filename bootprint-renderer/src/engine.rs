//! Engine registry and the [`RenderPipeline`] builder.
//!
//! # Flow
//!
//! ```text
//! RenderPipeline::new()
//!     .register_engine("tera", TeraEngine)   // defaults become the first layer
//!     .load(&module)?                        // module merges its own layers
//!     .merge(overrides)?                     // caller layer
//!     .merge(data_layer)?                    // pending input document
//!     .run().await?                          // resolve pending → render every engine
//! ```
//!
//! Each layer is passed namespace by namespace through the owning engine's
//! [`Engine::preprocess`] before it is merged, so directory references are
//! expanded relative to the layer that introduced them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use bootprint_core::{ConfigLayer, ConfigTree, ResolvedConfig, STYLE_NAMESPACE, TEMPLATE_NAMESPACE};

use crate::error::RenderError;
use crate::module::Module;
use crate::scss::ScssEngine;
use crate::templates::TeraEngine;

/// Rendered output: relative output path → file content.
pub type RenderResult = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// A renderer responsible for one configuration namespace.
pub trait Engine: Send + Sync {
    /// Options merged before any module or caller layer.
    fn defaults(&self) -> Value {
        Value::Object(Map::new())
    }

    /// Normalise one layer's options for this namespace before merging.
    ///
    /// `base_dir` anchors relative paths found in the layer.
    fn preprocess(&self, options: Value, base_dir: &Path) -> Result<Value, RenderError>;

    /// Render the fully merged and resolved options.
    fn render(&self, options: &Value) -> Result<RenderResult, RenderError>;
}

// ---------------------------------------------------------------------------
// RenderPipeline
// ---------------------------------------------------------------------------

/// Configurable render pipeline: engines, module layers, caller layers.
///
/// Owned by a single invocation; every builder step consumes and returns it.
pub struct RenderPipeline {
    engines: BTreeMap<String, Arc<dyn Engine>>,
    config: ConfigTree,
    modules: Vec<String>,
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPipeline {
    /// An empty pipeline with no engines registered.
    pub fn new() -> Self {
        RenderPipeline {
            engines: BTreeMap::new(),
            config: ConfigTree::new(),
            modules: Vec::new(),
        }
    }

    /// A pipeline with the template (`tera`) and stylesheet (`scss`) engines.
    pub fn with_default_engines() -> Self {
        Self::new()
            .register_engine(TEMPLATE_NAMESPACE, TeraEngine)
            .register_engine(STYLE_NAMESPACE, ScssEngine)
    }

    /// Register `engine` under `name` and merge its defaults.
    ///
    /// Registering a name twice replaces the engine; defaults already merged
    /// stay in place.
    pub fn register_engine(mut self, name: impl Into<String>, engine: impl Engine + 'static) -> Self {
        let name = name.into();
        let mut defaults = Map::new();
        defaults.insert(name.clone(), engine.defaults());
        if self.engines.insert(name.clone(), Arc::new(engine)).is_some() {
            tracing::warn!("engine `{name}` registered twice; keeping the latest");
        }
        // Defaults are a mapping keyed by a registered name: cannot fail.
        if let Ok(layer) = ConfigLayer::new(Value::Object(defaults)) {
            self.config.merge(layer);
        }
        self
    }

    /// Let `module` configure the pipeline.
    pub fn load(mut self, module: &dyn Module) -> Result<Self, RenderError> {
        let name = module.name().to_owned();
        tracing::debug!("loading module `{name}`");
        self.modules.push(name);
        module.build(self)
    }

    /// Preprocess and merge a configuration layer.
    pub fn merge(mut self, mut layer: ConfigLayer) -> Result<Self, RenderError> {
        for namespace in layer.namespaces() {
            if !self.engines.contains_key(namespace) {
                return Err(RenderError::UnknownEngine { name: namespace.to_owned() });
            }
        }

        let base_dir: PathBuf = layer
            .base_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        for (namespace, options) in layer.values_mut().iter_mut() {
            let engine = &self.engines[namespace.as_str()];
            *options = engine.preprocess(std::mem::take(options), &base_dir)?;
        }

        self.config.merge(layer);
        Ok(self)
    }

    /// Names of the engines registered so far.
    pub fn engine_names(&self) -> impl Iterator<Item = &str> {
        self.engines.keys().map(String::as_str)
    }

    /// Names of the modules loaded so far, in load order.
    pub fn module_names(&self) -> &[String] {
        &self.modules
    }

    /// The configuration assembled so far (pending values not yet resolved).
    pub fn config(&self) -> &ConfigTree {
        &self.config
    }

    /// Await pending values and return the final configuration without
    /// rendering anything.
    pub async fn resolve(self) -> Result<ResolvedConfig, RenderError> {
        Ok(self.config.resolve().await?)
    }

    /// Await pending values, then render every registered engine.
    ///
    /// Engines run on a blocking worker; their outputs are merged into one
    /// map. Two engines claiming the same output path is an error.
    pub async fn run(self) -> Result<RenderResult, RenderError> {
        let RenderPipeline { engines, config, .. } = self;
        let resolved = config.resolve().await?;

        tokio::task::spawn_blocking(move || render_all(&engines, &resolved))
            .await
            .map_err(|e| RenderError::Aborted(e.to_string()))?
    }
}

fn render_all(
    engines: &BTreeMap<String, Arc<dyn Engine>>,
    resolved: &ResolvedConfig,
) -> Result<RenderResult, RenderError> {
    let mut result = RenderResult::new();
    let mut owners: BTreeMap<String, String> = BTreeMap::new();

    for (name, engine) in engines {
        let options = resolved.namespace(name).cloned().unwrap_or(Value::Null);
        let outputs = engine.render(&options)?;
        tracing::debug!("engine `{name}` produced {} file(s)", outputs.len());
        for (path, content) in outputs {
            if let Some(first) = owners.get(&path) {
                return Err(RenderError::DuplicateOutput {
                    path,
                    first: first.clone(),
                    second: name.clone(),
                });
            }
            owners.insert(path.clone(), name.clone());
            result.insert(path, content);
        }
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use bootprint_core::PendingValue;
    use serde_json::json;

    /// Echoes `options.files` back as its output.
    struct EchoEngine;

    impl Engine for EchoEngine {
        fn preprocess(&self, options: Value, _base_dir: &Path) -> Result<Value, RenderError> {
            Ok(options)
        }

        fn render(&self, options: &Value) -> Result<RenderResult, RenderError> {
            let mut out = RenderResult::new();
            if let Some(files) = options.get("files").and_then(Value::as_object) {
                for (path, content) in files {
                    out.insert(path.clone(), content.as_str().unwrap_or_default().to_owned());
                }
            }
            Ok(out)
        }
    }

    fn layer(value: Value) -> ConfigLayer {
        ConfigLayer::new(value).unwrap()
    }

    #[tokio::test]
    async fn unknown_namespace_is_rejected() {
        let err = RenderPipeline::new()
            .register_engine("echo", EchoEngine)
            .merge(layer(json!({"nope": {}})))
            .err()
            .expect("unknown namespace must fail");
        assert!(matches!(err, RenderError::UnknownEngine { ref name } if name == "nope"));
    }

    #[tokio::test]
    async fn later_layers_win() {
        let out = RenderPipeline::new()
            .register_engine("echo", EchoEngine)
            .merge(layer(json!({"echo": {"files": {"a.txt": "first"}}})))
            .unwrap()
            .merge(layer(json!({"echo": {"files": {"a.txt": "second"}}})))
            .unwrap()
            .run()
            .await
            .unwrap();
        assert_eq!(out.get("a.txt").map(String::as_str), Some("second"));
    }

    #[tokio::test]
    async fn pending_values_are_awaited_before_render() {
        let pending = PendingValue::spawn(async { Ok(json!({"b.txt": "late"})) });
        let out = RenderPipeline::new()
            .register_engine("echo", EchoEngine)
            .merge(ConfigLayer::empty().with_pending("echo.files", pending))
            .unwrap()
            .run()
            .await
            .unwrap();
        assert_eq!(out.get("b.txt").map(String::as_str), Some("late"));
    }

    #[tokio::test]
    async fn duplicate_outputs_are_rejected() {
        let err = RenderPipeline::new()
            .register_engine("one", EchoEngine)
            .register_engine("two", EchoEngine)
            .merge(layer(json!({
                "one": {"files": {"x": "1"}},
                "two": {"files": {"x": "2"}},
            })))
            .unwrap()
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::DuplicateOutput { ref path, .. } if path == "x"));
    }

    #[test]
    fn closures_are_modules() {
        let module = |pipeline: RenderPipeline| {
            pipeline.merge(ConfigLayer::new(json!({"echo": {"files": {}}})).unwrap())
        };
        let pipeline = RenderPipeline::new()
            .register_engine("echo", EchoEngine)
            .load(&module)
            .unwrap();
        assert_eq!(pipeline.module_names().len(), 1);
        assert_eq!(pipeline.engine_names().collect::<Vec<_>>(), vec!["echo"]);
    }
}
