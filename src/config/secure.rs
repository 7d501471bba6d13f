//! Secure value handling: hydrate from the vault after load, redact before
//! write.
//!
//! Keys are `<absolute layer path>_<dotted property path>`; values travel as
//! JSON text.

use crate::config::layers::Layer;
use crate::config::mutate::existing_leaf_mut;
use crate::config::tree::ConfigTree;
use crate::error::ApiError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Credential backend for secure values.
#[async_trait]
pub trait Vault: Send + Sync {
    /// Backend name, shown in the on-disk placeholder.
    fn name(&self) -> &str;

    /// Fetch a stored value; `Ok(None)` when the key is unknown.
    async fn load(&self, key: &str) -> Result<Option<String>, ApiError>;

    async fn save(&self, key: &str, value: &str) -> Result<(), ApiError>;
}

pub fn secure_key(layer_path: &Path, property: &str) -> String {
    format!("{}_{}", layer_path.display(), property)
}

/// Text written to disk in place of a secure value.
pub fn placeholder(vault: &dyn Vault) -> String {
    format!("managed by {}", vault.name())
}

/// Replace secure placeholders in every layer with vault values.
///
/// Only paths named in `merged_secure` are considered, and only in layers
/// that list the path themselves. A path that does not already resolve to a
/// non-null leaf is left alone.
pub async fn hydrate(layers: &mut [Layer], merged_secure: &[String], vault: &dyn Vault) -> Result<(), ApiError> {
    for property in merged_secure {
        for layer in layers.iter_mut() {
            if !layer.properties.secure().iter().any(|p| p == property) {
                continue;
            }
            let key = secure_key(&layer.path, property);
            let Some(raw) = vault.load(&key).await? else {
                tracing::debug!(key = %key, "no vault entry for secure property");
                continue;
            };
            let value: Value = serde_json::from_str(&raw).map_err(|e| {
                ApiError::Vault(format!("stored value for {} is not JSON: {}", key, e))
            })?;
            if let Some(slot) = existing_leaf_mut(layer.properties.as_map_mut(), property) {
                *slot = value;
            }
        }
    }
    Ok(())
}

/// Produce the on-disk copy of `layer`, pushing each secure value to the
/// vault and leaving a placeholder in its place.
///
/// The live layer is never touched. A value still equal to the placeholder
/// (nothing was hydrated for it) is left as is and not saved. A failed save
/// aborts; values already saved earlier in the same call stay in the vault.
pub async fn redact(layer: &Layer, vault: &dyn Vault) -> Result<ConfigTree, ApiError> {
    let mut copy = layer.properties.clone();
    let marker = placeholder(vault);

    for property in layer.properties.secure() {
        let Some(slot) = existing_leaf_mut(copy.as_map_mut(), &property) else {
            continue;
        };
        if slot.as_str() == Some(marker.as_str()) {
            tracing::debug!(property = %property, "secure property was never hydrated");
            continue;
        }
        let captured = std::mem::replace(slot, Value::String(marker.clone()));
        let encoded = serde_json::to_string(&captured).map_err(|e| ApiError::SecureSave {
            path: layer.path.clone(),
            property: property.clone(),
            source: Box::new(ApiError::Vault(e.to_string())),
        })?;
        vault
            .save(&secure_key(&layer.path, &property), &encoded)
            .await
            .map_err(|source| ApiError::SecureSave {
                path: layer.path.clone(),
                property: property.clone(),
                source: Box::new(source),
            })?;
    }
    Ok(copy)
}

/// Process-local vault backed by a map.
#[derive(Debug, Default)]
pub struct MemoryVault {
    name: String,
    entries: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
    saves: Mutex<Vec<(String, String)>>,
}

impl MemoryVault {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.lock().insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    /// Make every future save of `key` fail.
    pub fn fail_on(&self, key: impl Into<String>) {
        self.failing.lock().insert(key.into());
    }

    /// Successful saves in call order.
    pub fn saves(&self) -> Vec<(String, String)> {
        self.saves.lock().clone()
    }
}

#[async_trait]
impl Vault for MemoryVault {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self, key: &str) -> Result<Option<String>, ApiError> {
        Ok(self.get(key))
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), ApiError> {
        if self.failing.lock().contains(key) {
            return Err(ApiError::Vault(format!("refused to store {}", key)));
        }
        self.entries.lock().insert(key.to_string(), value.to_string());
        self.saves.lock().push((key.to_string(), value.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::layers::LayerKind;
    use serde_json::json;
    use std::path::PathBuf;

    fn layer_with(tree: Value) -> Layer {
        let mut layer = Layer::new(LayerKind::ProjectShared, PathBuf::from("/repo/app.config.json"));
        layer.properties = ConfigTree::from_value(tree);
        layer
    }

    #[test]
    fn key_joins_path_and_property() {
        assert_eq!(
            secure_key(Path::new("/repo/app.config.json"), "profiles.db.x.properties.pw"),
            "/repo/app.config.json_profiles.db.x.properties.pw"
        );
    }

    #[tokio::test]
    async fn redact_replaces_value_and_saves_json() {
        let vault = MemoryVault::new("test-vault");
        let layer = layer_with(json!({
            "profiles": {"db": {"x": {"properties": {"pw": "secret123", "port": 1}}}},
            "secure": ["profiles.db.x.properties.pw"]
        }));

        let copy = redact(&layer, &vault).await.unwrap();

        assert_eq!(
            copy.profiles()["db"]["x"]["properties"]["pw"],
            "managed by test-vault"
        );
        assert_eq!(copy.profiles()["db"]["x"]["properties"]["port"], 1);
        assert_eq!(
            layer.properties.profiles()["db"]["x"]["properties"]["pw"],
            "secret123"
        );
        assert_eq!(
            vault.saves(),
            vec![(
                "/repo/app.config.json_profiles.db.x.properties.pw".to_string(),
                "\"secret123\"".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn redact_skips_missing_paths() {
        let vault = MemoryVault::new("v");
        let layer = layer_with(json!({"secure": ["a.b"]}));
        let copy = redact(&layer, &vault).await.unwrap();
        assert!(copy.get("a").is_none());
        assert!(vault.saves().is_empty());
    }

    #[tokio::test]
    async fn redact_does_not_store_placeholder_as_secret() {
        let vault = MemoryVault::new("v");
        let layer = layer_with(json!({"a": "managed by v", "b": "real", "secure": ["a", "b"]}));

        let copy = redact(&layer, &vault).await.unwrap();

        assert_eq!(copy.as_map()["a"], "managed by v");
        assert_eq!(copy.as_map()["b"], "managed by v");
        assert_eq!(vault.get("/repo/app.config.json_a"), None);
        assert_eq!(
            vault.saves(),
            vec![("/repo/app.config.json_b".to_string(), "\"real\"".to_string())]
        );
    }

    #[tokio::test]
    async fn redact_failure_names_layer_and_keeps_earlier_saves() {
        let vault = MemoryVault::new("v");
        vault.fail_on("/repo/app.config.json_b");
        let layer = layer_with(json!({"a": 1, "b": 2, "secure": ["a", "b"]}));

        let err = redact(&layer, &vault).await.unwrap_err();

        assert!(err.to_string().contains("/repo/app.config.json"));
        assert_eq!(vault.saves().len(), 1);
        assert_eq!(vault.get("/repo/app.config.json_a").as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn hydrate_only_fills_existing_leaves() {
        let vault = MemoryVault::new("v");
        vault.insert("/repo/app.config.json_a.b", "\"plain\"");
        vault.insert("/repo/app.config.json_c.d", "{\"k\": true}");
        let mut layers = vec![layer_with(json!({
            "a": {"b": "managed by v"},
            "secure": ["a.b", "c.d"]
        }))];
        let merged_secure = layers[0].properties.secure();

        hydrate(&mut layers, &merged_secure, &vault).await.unwrap();

        assert_eq!(layers[0].properties.as_map()["a"]["b"], "plain");
        assert!(layers[0].properties.get("c").is_none());
    }

    #[tokio::test]
    async fn hydrate_ignores_paths_the_layer_does_not_list() {
        let vault = MemoryVault::new("v");
        vault.insert("/repo/app.config.json_a", "\"from vault\"");
        let mut layers = vec![layer_with(json!({"a": "on disk"}))];

        hydrate(&mut layers, &["a".to_string()], &vault).await.unwrap();

        assert_eq!(layers[0].properties.as_map()["a"], "on disk");
    }
}
