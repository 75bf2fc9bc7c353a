//! Tera template engine — the `tera` namespace.
//!
//! # Options
//!
//! | Key         | Shape                                           |
//! |-------------|-------------------------------------------------|
//! | `templates` | directory path, or mapping output name → source |
//! | `partials`  | directory path, or mapping partial name → source|
//! | `data`      | the input document                              |
//!
//! Directory paths are expanded at merge time into name → source mappings:
//! every `*.tera` file below the directory, named by its path relative to the
//! directory with `/` separators and the `.tera` suffix removed. A template
//! named `index.html` renders to the output path `index.html`; a partial named
//! `header` is available as `{% include "header" %}`.
//!
//! The render context exposes the document as `data`; when the document is a
//! mapping its top-level keys are also available directly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use tera::Tera;

use bootprint_core::TEMPLATE_NAMESPACE;

use crate::engine::{Engine, RenderResult};
use crate::error::{invalid, io_err, RenderError};

const TEMPLATE_SUFFIX: &str = ".tera";

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn normalize_template_name(path: &Path) -> String {
    let name = path.to_string_lossy().replace('\\', "/");
    name.strip_suffix(TEMPLATE_SUFFIX).map(str::to_owned).unwrap_or(name)
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

/// Read every `*.tera` file under `dir` into a name → source mapping.
fn load_template_dir(dir: &Path) -> Result<Map<String, Value>, RenderError> {
    if !dir.exists() {
        tracing::warn!("template directory {} does not exist", dir.display());
        return Ok(Map::new());
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    files.sort();

    let mut templates = Map::new();
    for path in files {
        if path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = normalize_template_name(rel);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.insert(name, Value::String(contents));
    }
    Ok(templates)
}

fn expand_sources(key: &str, value: Value, base_dir: &Path) -> Result<Value, RenderError> {
    match value {
        Value::String(dir) => Ok(Value::Object(load_template_dir(&base_dir.join(dir))?)),
        Value::Object(map) => {
            if let Some((name, _)) = map.iter().find(|(_, source)| !source.is_string()) {
                return Err(invalid(
                    TEMPLATE_NAMESPACE,
                    format!("`{key}.{name}` must be a template source string"),
                ));
            }
            Ok(Value::Object(map))
        }
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(invalid(
            TEMPLATE_NAMESPACE,
            format!("`{key}` must be a directory path or a mapping of sources"),
        )),
    }
}

// ---------------------------------------------------------------------------
// TeraEngine
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct TeraOptions {
    #[serde(default)]
    templates: BTreeMap<String, String>,
    #[serde(default)]
    partials: BTreeMap<String, String>,
    #[serde(default)]
    data: Value,
}

/// Renders `tera.templates` against `tera.data`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeraEngine;

impl TeraEngine {
    fn build_tera(options: &TeraOptions) -> Result<Tera, RenderError> {
        let mut tera = Tera::default();
        let items = options.partials.iter().chain(options.templates.iter());
        tera.add_raw_templates(items)?;
        Ok(tera)
    }

    fn build_context(data: &Value) -> Result<tera::Context, RenderError> {
        let mut ctx = match data {
            Value::Object(_) => tera::Context::from_serialize(data)?,
            _ => tera::Context::new(),
        };
        ctx.insert("data", data);
        Ok(ctx)
    }
}

impl Engine for TeraEngine {
    fn defaults(&self) -> Value {
        serde_json::json!({ "templates": {}, "partials": {} })
    }

    fn preprocess(&self, options: Value, base_dir: &Path) -> Result<Value, RenderError> {
        let mut options = match options {
            Value::Object(map) => map,
            Value::Null => return Ok(Value::Object(Map::new())),
            _ => return Err(invalid(TEMPLATE_NAMESPACE, "options must be a mapping")),
        };
        for key in ["templates", "partials"] {
            if let Some(value) = options.remove(key) {
                options.insert(key.to_owned(), expand_sources(key, value, base_dir)?);
            }
        }
        Ok(Value::Object(options))
    }

    fn render(&self, options: &Value) -> Result<RenderResult, RenderError> {
        let options: TeraOptions = match options {
            Value::Null => TeraOptions::default(),
            other => serde_json::from_value(other.clone())?,
        };
        let tera = Self::build_tera(&options)?;
        let ctx = Self::build_context(&options.data)?;

        let mut results = RenderResult::new();
        for name in options.templates.keys() {
            let content = tera
                .render(name, &ctx)
                .map_err(|source| RenderError::Template { name: name.clone(), source })?;
            results.insert(name.clone(), content.replace("\r\n", "\n"));
        }
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn template_names_drop_suffix_and_use_forward_slashes() {
        assert_eq!(normalize_template_name(Path::new("index.html.tera")), "index.html");
        assert_eq!(normalize_template_name(Path::new("api/op.md.tera")), "api/op.md");
    }

    #[test]
    fn directory_is_expanded_into_sources() {
        let dir = TempDir::new().unwrap();
        let tpl = dir.path().join("tpl");
        std::fs::create_dir_all(tpl.join("api")).unwrap();
        std::fs::write(tpl.join("index.html.tera"), "root").unwrap();
        std::fs::write(tpl.join("api/op.md.tera"), "op").unwrap();
        std::fs::write(tpl.join("README.txt"), "ignored").unwrap();

        let options = TeraEngine
            .preprocess(json!({"templates": "tpl"}), dir.path())
            .unwrap();
        assert_eq!(
            options,
            json!({"templates": {"index.html": "root", "api/op.md": "op"}})
        );
    }

    #[test]
    fn missing_directory_expands_to_nothing() {
        let dir = TempDir::new().unwrap();
        let options = TeraEngine
            .preprocess(json!({"partials": "absent"}), dir.path())
            .unwrap();
        assert_eq!(options, json!({"partials": {}}));
    }

    #[test]
    fn non_string_sources_are_rejected() {
        let err = TeraEngine
            .preprocess(json!({"templates": {"a.html": 3}}), Path::new("."))
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidConfig { .. }));
    }

    #[test]
    fn renders_templates_with_partials_and_data() {
        let options = json!({
            "templates": {"index.html": "{% include \"header\" %}|{{ data.title }}|{{ title }}"},
            "partials": {"header": "<h1>{{ title }}</h1>"},
            "data": {"title": "Hello"},
        });
        let out = TeraEngine.render(&options).unwrap();
        assert_eq!(out["index.html"], "<h1>Hello</h1>|Hello|Hello");
        assert!(!out.contains_key("header"), "partials must not be emitted");
    }

    #[test]
    fn non_mapping_data_is_available_as_data() {
        let options = json!({
            "templates": {"list.txt": "{% for x in data %}{{ x }};{% endfor %}"},
            "data": [1, 2, 3],
        });
        let out = TeraEngine.render(&options).unwrap();
        assert_eq!(out["list.txt"], "1;2;3;");
    }

    #[test]
    fn html_output_is_escaped() {
        let options = json!({
            "templates": {"page.html": "{{ title }}"},
            "data": {"title": "<b>"},
        });
        let out = TeraEngine.render(&options).unwrap();
        assert_eq!(out["page.html"], "&lt;b&gt;");
    }

    #[test]
    fn crlf_is_normalised() {
        let options = json!({"templates": {"a.txt": "one\r\ntwo"}});
        let out = TeraEngine.render(&options).unwrap();
        assert_eq!(out["a.txt"], "one\ntwo");
    }

    #[test]
    fn render_error_names_template() {
        let options = json!({"templates": {"bad.txt": "{{ missing.value }}"}});
        let err = TeraEngine.render(&options).unwrap_err();
        assert!(matches!(err, RenderError::Template { ref name, .. } if name == "bad.txt"));
    }
}
