//! Module resolution: a [`ModuleRef`] → a [`Module`] ready to configure a
//! render pipeline.
//!
//! # Resolution order
//!
//! 1. [`ModuleRef::Builder`] — returned as-is (same `Arc`).
//! 2. [`ModuleRef::Name`] — `bootprint-<name>` looked up in the
//!    [`ModuleRegistry`] of compiled-in modules.
//! 3. Not registered — `<name>` opened as a module directory relative to the
//!    resolver's working directory.
//!
//! Only a registry miss falls through to step 3. A directory that exists but
//! cannot be opened (bad manifest, permissions, `extends` cycle) is an error
//! of its own and is never masked as "not found".
//!
//! # Directory modules
//!
//! ```text
//! my-module/
//!   bootprint.yaml        (optional: name, extends, config)
//!   templates/*.tera      → tera.templates
//!   partials/*.tera       → tera.partials
//!   styles/main.scss      → scss.main
//! ```
//!
//! `extends` names another module and is resolved the same way, with
//! directories taken relative to the extending module.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use serde_json::{json, Map, Value};

use bootprint_core::{ConfigLayer, STYLE_NAMESPACE, TEMPLATE_NAMESPACE};
use bootprint_renderer::{builtin::BaseModule, Module, RenderError, RenderPipeline};

use crate::error::ModuleError;

/// Prefix turning a short module name into a registry key.
pub const PACKAGE_PREFIX: &str = "bootprint-";

/// Optional manifest at the root of a module directory.
pub const MANIFEST_FILE: &str = "bootprint.yaml";

// ---------------------------------------------------------------------------
// ModuleRef
// ---------------------------------------------------------------------------

/// A reference to a module.
#[derive(Clone)]
pub enum ModuleRef {
    /// A module value supplied directly.
    Builder(Arc<dyn Module>),
    /// A short name (`base`) or a directory path (`./my-module`).
    Name(String),
}

impl ModuleRef {
    pub fn builder(module: impl Module + 'static) -> Self {
        ModuleRef::Builder(Arc::new(module))
    }
}

impl fmt::Debug for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleRef::Builder(module) => f.debug_tuple("Builder").field(&module.name()).finish(),
            ModuleRef::Name(name) => f.debug_tuple("Name").field(name).finish(),
        }
    }
}

impl From<&str> for ModuleRef {
    fn from(s: &str) -> Self {
        ModuleRef::Name(s.to_owned())
    }
}

impl From<String> for ModuleRef {
    fn from(s: String) -> Self {
        ModuleRef::Name(s)
    }
}

impl From<Arc<dyn Module>> for ModuleRef {
    fn from(module: Arc<dyn Module>) -> Self {
        ModuleRef::Builder(module)
    }
}

// ---------------------------------------------------------------------------
// ModuleRegistry
// ---------------------------------------------------------------------------

/// Compiled-in modules keyed by package name (`bootprint-<name>`).
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the modules shipped with bootprint.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("bootprint-base", BaseModule);
        registry
    }

    pub fn register(&mut self, package: impl Into<String>, module: impl Module + 'static) {
        self.modules.insert(package.into(), Arc::new(module));
    }

    pub fn get(&self, package: &str) -> Option<Arc<dyn Module>> {
        self.modules.get(package).cloned()
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.packages()).finish()
    }
}

// ---------------------------------------------------------------------------
// ModuleResolver
// ---------------------------------------------------------------------------

/// Turns [`ModuleRef`]s into modules. Directory modules are cached by
/// canonical path, so resolving the same directory twice yields the same `Arc`.
pub struct ModuleResolver {
    registry: ModuleRegistry,
    cwd: PathBuf,
    cache: Mutex<HashMap<PathBuf, Arc<DirectoryModule>>>,
}

impl Default for ModuleResolver {
    fn default() -> Self {
        Self::new(ModuleRegistry::with_builtins())
    }
}

impl fmt::Debug for ModuleResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleResolver")
            .field("registry", &self.registry)
            .field("cwd", &self.cwd)
            .finish()
    }
}

impl ModuleResolver {
    /// Resolve directory modules relative to the process working directory.
    pub fn new(registry: ModuleRegistry) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_cwd(registry, cwd)
    }

    /// Resolve directory modules relative to `cwd`.
    pub fn with_cwd(registry: ModuleRegistry, cwd: impl Into<PathBuf>) -> Self {
        ModuleResolver {
            registry,
            cwd: cwd.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn resolve(&self, module: &ModuleRef) -> Result<Arc<dyn Module>, ModuleError> {
        let mut chain = Vec::new();
        self.resolve_in(module, &self.cwd, &mut chain)
    }

    fn resolve_in(
        &self,
        module: &ModuleRef,
        base_dir: &Path,
        chain: &mut Vec<PathBuf>,
    ) -> Result<Arc<dyn Module>, ModuleError> {
        let name = match module {
            ModuleRef::Builder(module) => return Ok(Arc::clone(module)),
            ModuleRef::Name(name) => name,
        };

        let package = format!("{PACKAGE_PREFIX}{name}");
        if let Some(module) = self.registry.get(&package) {
            tracing::debug!("loading module `{package}` from registry");
            return Ok(module);
        }

        let path = base_dir.join(name);
        let module: Arc<dyn Module> = self.open_directory(name, &package, &path, chain)?;
        Ok(module)
    }

    fn open_directory(
        &self,
        name: &str,
        package: &str,
        path: &Path,
        chain: &mut Vec<PathBuf>,
    ) -> Result<Arc<DirectoryModule>, ModuleError> {
        let root = match path.canonicalize() {
            Ok(root) => root,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ModuleError::NotFound {
                    name: name.to_owned(),
                    package: package.to_owned(),
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(ModuleError::Io { path: path.to_path_buf(), source: e }),
        };

        if chain.contains(&root) {
            let chain = chain
                .iter()
                .chain(std::iter::once(&root))
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ModuleError::Cycle { path: root, chain });
        }

        if let Some(cached) = self.lock_cache().get(&root) {
            return Ok(Arc::clone(cached));
        }

        tracing::debug!("loading module from {}", root.display());
        chain.push(root.clone());
        let opened = DirectoryModule::open(&root, |parent| {
            self.resolve_in(&ModuleRef::from(parent), &root, chain)
        });
        chain.pop();

        let module = Arc::new(opened?);
        let mut cache = self.lock_cache();
        Ok(Arc::clone(cache.entry(root).or_insert(module)))
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<DirectoryModule>>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ---------------------------------------------------------------------------
// DirectoryModule
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    name: Option<String>,
    extends: Option<String>,
    #[serde(default)]
    config: Value,
}

/// A module read from a directory on disk.
pub struct DirectoryModule {
    name: String,
    root: PathBuf,
    parent: Option<Arc<dyn Module>>,
    conventions: Value,
    config: Value,
}

impl fmt::Debug for DirectoryModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryModule")
            .field("name", &self.name)
            .field("root", &self.root)
            .field("parent", &self.parent.as_ref().map(|p| p.name().to_owned()))
            .finish()
    }
}

impl DirectoryModule {
    /// Open the module at `root`, resolving `extends` through `resolve_parent`.
    fn open<F>(root: &Path, resolve_parent: F) -> Result<Self, ModuleError>
    where
        F: FnOnce(&str) -> Result<Arc<dyn Module>, ModuleError>,
    {
        if !root.is_dir() {
            return Err(ModuleError::Io {
                path: root.to_path_buf(),
                source: std::io::Error::other("module path is not a directory"),
            });
        }

        let manifest = read_manifest(root)?;
        let manifest_path = root.join(MANIFEST_FILE);
        ConfigLayer::new(manifest.config.clone())
            .map_err(|source| ModuleError::Config { path: manifest_path, source })?;

        let parent = manifest.extends.as_deref().map(resolve_parent).transpose()?;
        let name = manifest.name.unwrap_or_else(|| {
            root.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| root.display().to_string())
        });

        Ok(DirectoryModule {
            name,
            root: root.to_path_buf(),
            parent,
            conventions: conventions_layer(root),
            config: manifest.config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn parent(&self) -> Option<&Arc<dyn Module>> {
        self.parent.as_ref()
    }
}

impl Module for DirectoryModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(&self, pipeline: RenderPipeline) -> Result<RenderPipeline, RenderError> {
        let mut pipeline = match &self.parent {
            Some(parent) => pipeline.load(parent.as_ref())?,
            None => pipeline,
        };
        pipeline = pipeline.merge(ConfigLayer::new(self.conventions.clone())?.with_base_dir(&self.root))?;
        if !self.config.is_null() {
            pipeline = pipeline.merge(ConfigLayer::new(self.config.clone())?.with_base_dir(&self.root))?;
        }
        Ok(pipeline)
    }
}

fn read_manifest(root: &Path) -> Result<Manifest, ModuleError> {
    let path = root.join(MANIFEST_FILE);
    match std::fs::read_to_string(&path) {
        Ok(text) => serde_yaml::from_str(&text).map_err(|source| ModuleError::Manifest { path, source }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Manifest::default()),
        Err(e) => Err(ModuleError::Io { path, source: e }),
    }
}

/// Layer contributed by the conventional directory layout.
fn conventions_layer(root: &Path) -> Value {
    let mut tera = Map::new();
    for key in ["templates", "partials"] {
        if root.join(key).is_dir() {
            tera.insert(key.to_owned(), Value::String(key.to_owned()));
        }
    }

    let mut layer = Map::new();
    if !tera.is_empty() {
        layer.insert(TEMPLATE_NAMESPACE.to_owned(), Value::Object(tera));
    }
    if root.join("styles").join("main.scss").is_file() {
        layer.insert(STYLE_NAMESPACE.to_owned(), json!({ "main": ["styles/main.scss"] }));
    }
    Value::Object(layer)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
