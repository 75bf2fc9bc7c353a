//! # bootprint-renderer
//!
//! The render engine behind bootprint: named engines (`tera` templates and
//! `scss` stylesheets), the [`Module`] capability, and the [`RenderPipeline`]
//! that layers module defaults, caller overrides and the input document
//! before rendering.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bootprint_core::{ConfigLayer, PendingValue};
//! use bootprint_renderer::{builtin::BaseModule, RenderPipeline};
//!
//! async fn render() -> Result<(), bootprint_renderer::RenderError> {
//!     let files = RenderPipeline::with_default_engines()
//!         .load(&BaseModule)?
//!         .merge(ConfigLayer::empty().with_pending(
//!             "tera.data",
//!             PendingValue::ready(serde_json::json!({ "title": "Hello" })),
//!         ))?
//!         .run()
//!         .await?;
//!     for (path, content) in files {
//!         println!("{path}: {} bytes", content.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod builtin;
pub mod engine;
pub mod error;
pub mod module;
pub mod scss;
pub mod templates;

pub use engine::{Engine, RenderPipeline, RenderResult};
pub use error::RenderError;
pub use module::Module;
pub use scss::ScssEngine;
pub use templates::TeraEngine;
