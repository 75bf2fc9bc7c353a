//! SCSS stylesheet engine — the `scss` namespace, compiled with grass.
//!
//! # Options
//!
//! | Key          | Shape                                                   | Default    |
//! |--------------|---------------------------------------------------------|------------|
//! | `main`       | sequence of file paths or `{ source: "<scss>" }` entries | `[]`       |
//! | `load_paths` | sequence of directories searched by `@import` / `@use`   | `[]`       |
//! | `output`     | output path of the compiled stylesheet                   | `main.css` |
//! | `style`      | `expanded` or `compressed`                               | `expanded` |
//!
//! All `main` entries are concatenated in order and compiled as one
//! stylesheet, so entries from later layers can override earlier rules. The
//! directory of every file entry is added to the load paths.

use std::path::{Path, PathBuf};

use grass::{Options, OutputStyle};
use serde::Deserialize;
use serde_json::Value;

use bootprint_core::STYLE_NAMESPACE;

use crate::engine::{Engine, RenderResult};
use crate::error::{invalid, io_err, RenderError};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StyleEntry {
    File(PathBuf),
    Inline { source: String },
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StyleOption {
    #[default]
    Expanded,
    Compressed,
}

fn default_output() -> String {
    "main.css".to_string()
}

#[derive(Debug, Deserialize)]
struct ScssOptions {
    #[serde(default)]
    main: Vec<StyleEntry>,
    #[serde(default)]
    load_paths: Vec<PathBuf>,
    #[serde(default = "default_output")]
    output: String,
    #[serde(default)]
    style: StyleOption,
}

/// Anchor every path-like string in `value` (a sequence) at `base_dir`.
fn anchor_paths(key: &str, value: Value, base_dir: &Path) -> Result<Value, RenderError> {
    let Value::Array(items) = value else {
        return Err(invalid(STYLE_NAMESPACE, format!("`{key}` must be a sequence")));
    };
    let anchored = items
        .into_iter()
        .map(|item| match item {
            Value::String(path) => {
                Value::String(base_dir.join(path).to_string_lossy().into_owned())
            }
            other => other,
        })
        .collect();
    Ok(Value::Array(anchored))
}

/// Compiles `scss.main` into a single CSS file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScssEngine;

impl ScssEngine {
    fn assemble(options: &ScssOptions) -> Result<(String, Vec<PathBuf>), RenderError> {
        let mut source = String::new();
        let mut load_paths = options.load_paths.clone();
        for entry in &options.main {
            match entry {
                StyleEntry::File(path) => {
                    let text = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
                    source.push_str(&text);
                    if let Some(parent) = path.parent() {
                        if !load_paths.iter().any(|p| p == parent) {
                            load_paths.push(parent.to_path_buf());
                        }
                    }
                }
                StyleEntry::Inline { source: text } => source.push_str(text),
            }
            source.push('\n');
        }
        Ok((source, load_paths))
    }
}

impl Engine for ScssEngine {
    fn defaults(&self) -> Value {
        serde_json::json!({ "main": [], "load_paths": [] })
    }

    fn preprocess(&self, options: Value, base_dir: &Path) -> Result<Value, RenderError> {
        let mut options = match options {
            Value::Object(map) => map,
            Value::Null => return Ok(Value::Object(Default::default())),
            _ => return Err(invalid(STYLE_NAMESPACE, "options must be a mapping")),
        };
        for key in ["main", "load_paths"] {
            if let Some(value) = options.remove(key) {
                options.insert(key.to_owned(), anchor_paths(key, value, base_dir)?);
            }
        }
        Ok(Value::Object(options))
    }

    fn render(&self, options: &Value) -> Result<RenderResult, RenderError> {
        let options: ScssOptions = match options {
            Value::Null => return Ok(RenderResult::new()),
            other => serde_json::from_value(other.clone())?,
        };
        if options.main.is_empty() {
            return Ok(RenderResult::new());
        }

        let (source, load_paths) = Self::assemble(&options)?;
        let style = match options.style {
            StyleOption::Expanded => OutputStyle::Expanded,
            StyleOption::Compressed => OutputStyle::Compressed,
        };
        let grass_options = Options::default()
            .load_paths(load_paths.as_slice())
            .style(style);
        let css = grass::from_string(source, &grass_options)
            .map_err(|e| RenderError::Style { message: e.to_string() })?;

        let mut results = RenderResult::new();
        results.insert(options.output, css);
        Ok(results)
    }
}
