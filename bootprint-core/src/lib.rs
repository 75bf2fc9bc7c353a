//! Bootprint core library — configuration trees, layers and the deep-merge model.
//!
//! - [`merge`] — deep merge of `serde_json::Value` trees and key-path helpers
//! - [`layer`] — [`ConfigLayer`], [`KeyPath`] and [`PendingValue`]
//! - [`tree`] — [`ConfigTree`], the accumulated configuration handed to the renderer
//! - [`error`] — [`ConfigError`]

pub mod error;
pub mod layer;
pub mod merge;
pub mod tree;

pub use error::{ConfigError, SlotError};
pub use layer::{ConfigLayer, KeyPath, PendingValue};
pub use tree::{ConfigTree, ResolvedConfig};

/// Namespace of the primary (template) renderer.
pub const TEMPLATE_NAMESPACE: &str = "tera";

/// Namespace of the stylesheet renderer.
pub const STYLE_NAMESPACE: &str = "scss";

/// Key under [`TEMPLATE_NAMESPACE`] that carries the input document.
pub const DATA_KEY: &str = "data";
