//! The accumulated configuration tree.
//!
//! Layers are merged in order with [`ConfigTree::merge`]; later layers win
//! (see [`crate::merge`] for the value rules). Pending values follow the same
//! precedence:
//!
//! - a pending value supersedes anything merged before it at the same path;
//! - a later ready value at the path (or a non-mapping on an ancestor of it)
//!   discards the pending value.
//!
//! [`ConfigTree::resolve`] awaits every remaining pending value and writes it
//! into place, producing a [`ResolvedConfig`].

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::layer::{ConfigLayer, KeyPath, PendingValue};
use crate::merge::{assigns_path, get_path, merge_maps, set_path};

/// Configuration under construction. Owned by a single render invocation.
#[derive(Debug, Default)]
pub struct ConfigTree {
    values: Map<String, Value>,
    pending: Vec<(KeyPath, PendingValue)>,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay `layer` onto the tree.
    pub fn merge(&mut self, layer: ConfigLayer) {
        let (values, pending) = layer.into_parts();

        self.pending.retain(|(path, _)| {
            let superseded = assigns_path(&values, path.segments());
            if superseded {
                tracing::debug!("pending value at `{path}` replaced by a later layer");
            }
            !superseded
        });
        merge_maps(&mut self.values, values);

        for (path, value) in pending {
            self.pending.retain(|(existing, _)| !existing.starts_with(&path));
            self.pending.push((path, value));
        }
    }

    /// The ready value at `path`. Pending values are not visible here.
    pub fn get(&self, path: &KeyPath) -> Option<&Value> {
        get_path(&self.values, path.segments())
    }

    /// The ready options of one namespace.
    pub fn namespace(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Whether a pending value is registered at exactly `path`.
    pub fn is_pending(&self, path: &KeyPath) -> bool {
        self.pending.iter().any(|(p, _)| p == path)
    }

    pub fn pending_paths(&self) -> impl Iterator<Item = &KeyPath> {
        self.pending.iter().map(|(p, _)| p)
    }

    /// Await all pending values, in the order they were merged, and write
    /// them into the tree.
    ///
    /// The first failure aborts resolution; its error is returned as
    /// [`ConfigError::Pending`] carrying the producer's original error.
    pub async fn resolve(self) -> Result<ResolvedConfig, ConfigError> {
        let ConfigTree { mut values, pending } = self;
        for (path, value) in pending {
            let value = value.wait(&path).await?;
            set_path(&mut values, path.segments(), value);
        }
        Ok(ResolvedConfig { values })
    }
}

/// A fully materialised configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResolvedConfig {
    values: Map<String, Value>,
}

impl ResolvedConfig {
    pub fn namespace(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get(&self, path: &KeyPath) -> Option<&Value> {
        get_path(&self.values, path.segments())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SlotError;
    use serde_json::json;
    use std::io;

    fn layer(value: Value) -> ConfigLayer {
        ConfigLayer::new(value).expect("layer")
    }

    #[tokio::test]
    async fn layers_merge_in_order() {
        let mut tree = ConfigTree::new();
        tree.merge(layer(json!({"tera": {"partials": {"a": "module"}}})));
        tree.merge(layer(json!({"tera": {"partials": {"a": "caller", "b": "caller"}}})));
        let resolved = tree.resolve().await.expect("resolve");
        assert_eq!(
            resolved.namespace("tera"),
            Some(&json!({"partials": {"a": "caller", "b": "caller"}}))
        );
    }

    #[tokio::test]
    async fn pending_value_overrides_earlier_ready_value() {
        let mut tree = ConfigTree::new();
        tree.merge(layer(json!({"tera": {"data": "stale", "partials": {}}})));
        tree.merge(
            ConfigLayer::empty()
                .with_pending("tera.data", PendingValue::ready(json!({"title": "Hello"}))),
        );
        assert!(tree.is_pending(&KeyPath::from("tera.data")));
        assert_eq!(tree.get(&KeyPath::from("tera.data")), Some(&json!("stale")));

        let resolved = tree.resolve().await.expect("resolve");
        assert_eq!(
            resolved.namespace("tera"),
            Some(&json!({"data": {"title": "Hello"}, "partials": {}}))
        );
    }

    #[tokio::test]
    async fn later_ready_value_discards_pending_value() {
        let mut tree = ConfigTree::new();
        tree.merge(ConfigLayer::empty().with_pending("tera.data", PendingValue::ready(json!(1))));
        tree.merge(layer(json!({"tera": {"data": 2}})));
        assert!(!tree.is_pending(&KeyPath::from("tera.data")));
        let resolved = tree.resolve().await.expect("resolve");
        assert_eq!(resolved.get(&KeyPath::from("tera.data")), Some(&json!(2)));
    }

    #[tokio::test]
    async fn sibling_keys_leave_pending_value_alone() {
        let mut tree = ConfigTree::new();
        tree.merge(ConfigLayer::empty().with_pending("tera.data", PendingValue::ready(json!(1))));
        tree.merge(layer(json!({"tera": {"partials": {}}})));
        assert!(tree.is_pending(&KeyPath::from("tera.data")));
    }

    #[tokio::test]
    async fn later_pending_value_replaces_earlier_one() {
        let mut tree = ConfigTree::new();
        tree.merge(ConfigLayer::empty().with_pending("tera.data", PendingValue::ready(json!(1))));
        tree.merge(ConfigLayer::empty().with_pending("tera.data", PendingValue::ready(json!(2))));
        assert_eq!(tree.pending_paths().count(), 1);
        let resolved = tree.resolve().await.expect("resolve");
        assert_eq!(resolved.get(&KeyPath::from("tera.data")), Some(&json!(2)));
    }

    #[tokio::test]
    async fn spawned_pending_value_resolves() {
        let mut tree = ConfigTree::new();
        tree.merge(ConfigLayer::empty().with_pending(
            "tera.data",
            PendingValue::spawn(async { Ok(json!({"spawned": true})) }),
        ));
        let resolved = tree.resolve().await.expect("resolve");
        assert_eq!(
            resolved.get(&KeyPath::from("tera.data.spawned")),
            Some(&json!(true))
        );
    }

    #[tokio::test]
    async fn failed_pending_value_keeps_original_error() {
        let mut tree = ConfigTree::new();
        tree.merge(ConfigLayer::empty().with_pending(
            "tera.data",
            PendingValue::new(async {
                let err: SlotError = Box::new(io::Error::other("boom"));
                Err(err)
            }),
        ));
        let err = tree.resolve().await.unwrap_err();
        assert!(err.to_string().contains("tera.data"));
        let source = err.into_slot_error().expect("slot error");
        let io_err = source.downcast::<io::Error>().expect("io error");
        assert_eq!(io_err.to_string(), "boom");
    }

    #[tokio::test]
    async fn resolved_config_serializes_as_plain_mapping() {
        let mut tree = ConfigTree::new();
        tree.merge(layer(json!({"scss": {"main": []}})));
        let resolved = tree.resolve().await.expect("resolve");
        assert_eq!(
            serde_json::to_value(&resolved).expect("json"),
            json!({"scss": {"main": []}})
        );
    }
}
