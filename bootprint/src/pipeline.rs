//! Orchestration entrypoint shared by the CLI and library callers.
//!
//! One [`Bootprint::run`] call is one linear pipeline:
//!
//! 1. start loading the input document in the background,
//! 2. resolve the module and let it configure a fresh [`RenderPipeline`],
//! 3. merge the caller override layer,
//! 4. merge the input document as a pending `tera.data` slot,
//! 5. render (awaiting the input) and write the result to the target directory.
//!
//! The data slot is merged last so neither module nor caller configuration
//! can replace the document being rendered.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use bootprint_core::{ConfigLayer, KeyPath, PendingValue, ResolvedConfig, SlotError, DATA_KEY, TEMPLATE_NAMESPACE};
use bootprint_renderer::{RenderPipeline, RenderResult};

use crate::diff::{diff_files, FileDiff};
use crate::error::{classify_input_error, BootprintError};
use crate::input::{load_input, InputRef};
use crate::module::{ModuleRef, ModuleResolver};
use crate::writer::{write_files, WriteResult};

/// Options for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Directory the rendered files are written to.
    pub target_dir: PathBuf,
    /// Report what would be written without touching the filesystem.
    pub dry_run: bool,
}

impl RunOptions {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        RunOptions { target_dir: target_dir.into(), dry_run: false }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub target_dir: PathBuf,
    pub writes: Vec<WriteResult>,
}

impl RunReport {
    pub fn written(&self) -> usize {
        self.writes.iter().filter(|w| matches!(w, WriteResult::Written { .. })).count()
    }

    pub fn unchanged(&self) -> usize {
        self.writes.iter().filter(|w| matches!(w, WriteResult::Unchanged { .. })).count()
    }
}

/// A module plus caller configuration, ready to render input documents.
#[derive(Debug)]
pub struct Bootprint {
    module: ModuleRef,
    config: Value,
    config_dir: Option<PathBuf>,
    resolver: Arc<ModuleResolver>,
}

impl Bootprint {
    /// `config` is the caller override layer (`Value::Null` for none).
    pub fn new(module: impl Into<ModuleRef>, config: Value) -> Self {
        Bootprint {
            module: module.into(),
            config,
            config_dir: None,
            resolver: Arc::new(ModuleResolver::default()),
        }
    }

    /// Resolve modules through `resolver` instead of the default one.
    pub fn with_resolver(mut self, resolver: Arc<ModuleResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Anchor relative paths in the override layer at `dir`.
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Render `input` and write the result below `options.target_dir`.
    pub async fn run(&self, input: impl Into<InputRef>, options: &RunOptions) -> Result<RunReport, BootprintError> {
        let files = self.render(input).await?;
        let writes = write_files(&options.target_dir, &files, options.dry_run)?;
        Ok(RunReport { target_dir: options.target_dir.clone(), writes })
    }

    /// Render `input` without writing anything.
    pub async fn render(&self, input: impl Into<InputRef>) -> Result<RenderResult, BootprintError> {
        let pipeline = self.pipeline(input.into())?;
        Ok(pipeline.run().await?)
    }

    /// Render `input` and diff the result against `target_dir`.
    pub async fn diff(&self, input: impl Into<InputRef>, target_dir: &Path) -> Result<Vec<FileDiff>, BootprintError> {
        let files = self.render(input).await?;
        Ok(diff_files(target_dir, &files)?)
    }

    /// The fully merged configuration `input` would be rendered with.
    pub async fn merged_config(&self, input: impl Into<InputRef>) -> Result<ResolvedConfig, BootprintError> {
        let pipeline = self.pipeline(input.into())?;
        Ok(pipeline.resolve().await?)
    }

    fn pipeline(&self, input: InputRef) -> Result<RenderPipeline, BootprintError> {
        // Started before module resolution so the two overlap.
        let data = PendingValue::spawn(async move {
            load_input(input)
                .await
                .map_err(|err| Box::new(classify_input_error(err)) as SlotError)
        });

        let module = self.resolver.resolve(&self.module)?;
        tracing::debug!("rendering with module `{}`", module.name());

        let mut pipeline = RenderPipeline::with_default_engines().load(module.as_ref())?;
        if let Some(layer) = self.override_layer()? {
            pipeline = pipeline.merge(layer)?;
        }

        let data_path = KeyPath::from(&[TEMPLATE_NAMESPACE, DATA_KEY][..]);
        Ok(pipeline.merge(ConfigLayer::empty().with_pending(data_path, data))?)
    }

    fn override_layer(&self) -> Result<Option<ConfigLayer>, BootprintError> {
        if self.config.is_null() {
            return Ok(None);
        }
        let layer = ConfigLayer::new(self.config.clone()).map_err(bootprint_renderer::RenderError::from)?;
        if let Some(data) = layer.values().get(TEMPLATE_NAMESPACE).and_then(|t| t.get(DATA_KEY)) {
            if !data.is_null() {
                tracing::warn!("ignoring `{TEMPLATE_NAMESPACE}.{DATA_KEY}` in configuration; the input document takes its place");
            }
        }
        Ok(Some(match &self.config_dir {
            Some(dir) => layer.with_base_dir(dir),
            None => layer,
        }))
    }
}
