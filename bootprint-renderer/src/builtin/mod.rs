//! Modules compiled into the binary.
//!
//! Sources are baked in at compile time via `include_str!`.

use serde_json::json;

use bootprint_core::{ConfigLayer, STYLE_NAMESPACE, TEMPLATE_NAMESPACE};

use crate::engine::RenderPipeline;
use crate::error::RenderError;
use crate::module::Module;

const BASE_INDEX: &str = include_str!("base/index.html.tera");
const BASE_HEADER: &str = include_str!("base/partials/header.tera");
const BASE_STYLE: &str = include_str!("base/main.scss");

/// Generic module: an `index.html` with the document title and a
/// pretty-printed dump of the document, plus `main.css`.
///
/// Directory modules usually extend it and override `index.html` or the
/// `header` partial.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseModule;

impl Module for BaseModule {
    fn name(&self) -> &str {
        "base"
    }

    fn build(&self, pipeline: RenderPipeline) -> Result<RenderPipeline, RenderError> {
        let layer = ConfigLayer::new(json!({
            TEMPLATE_NAMESPACE: {
                "templates": { "index.html": BASE_INDEX },
                "partials": { "header": BASE_HEADER },
            },
            STYLE_NAMESPACE: {
                "main": [{ "source": BASE_STYLE }],
            },
        }))?;
        pipeline.merge(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootprint_core::PendingValue;

    #[tokio::test]
    async fn base_module_renders_page_and_stylesheet() {
        let out = RenderPipeline::with_default_engines()
            .load(&BaseModule)
            .unwrap()
            .merge(ConfigLayer::empty().with_pending(
                "tera.data",
                PendingValue::ready(json!({"title": "Hello", "description": "A & B"})),
            ))
            .unwrap()
            .run()
            .await
            .unwrap();

        let index = &out["index.html"];
        assert!(index.contains("<title>Hello</title>"));
        assert!(index.contains("<h1>Hello</h1>"));
        assert!(index.contains("A &amp; B"));
        assert!(out["main.css"].contains(".page-header .description"));
    }

    #[tokio::test]
    async fn base_module_handles_non_mapping_documents() {
        let out = RenderPipeline::with_default_engines()
            .load(&BaseModule)
            .unwrap()
            .merge(
                ConfigLayer::empty()
                    .with_pending("tera.data", PendingValue::ready(json!(["a", "b"]))),
            )
            .unwrap()
            .run()
            .await
            .unwrap();
        assert!(out["index.html"].contains("<title>Bootprint</title>"));
    }
}
