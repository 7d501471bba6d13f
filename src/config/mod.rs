//! Layered configuration
//!
//! Four JSON files form one configuration: project-user, project-shared,
//! global-user and global-shared, searched and loaded in that order. Reads go
//! through a merged view that is rebuilt after every mutation; writes target
//! the single active layer.

pub mod layers;
pub mod merge;
pub mod mutate;
pub mod paths;
pub mod plugins;
pub mod profiles;
pub mod remote;
pub mod secure;
pub mod tree;

pub use layers::{ActiveLayer, Layer, LayerKind, LayerStore};
pub use mutate::SetOptions;
pub use profiles::{Profile, Profiles, ProfilesMut};
pub use secure::{secure_key, MemoryVault, Vault};
pub use tree::ConfigTree;

use crate::error::ApiError;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// JSON indentation used for layer files.
const INDENT: &[u8] = b"    ";

/// Parameters for [`Configuration::load`].
#[derive(Clone, Default)]
pub struct ConfigOptions {
    /// Directory holding the global layers; defaults to `~/.<app>`.
    pub home_dir: Option<PathBuf>,
    /// Where the project search starts; defaults to the working directory.
    pub project_dir: Option<PathBuf>,
    /// Upward search boundary; defaults to the user's home directory.
    pub search_stop: Option<PathBuf>,
    /// Credential backend for secure values.
    pub vault: Option<Arc<dyn Vault>>,
}

impl ConfigOptions {
    pub fn with_vault(mut self, vault: Arc<dyn Vault>) -> Self {
        self.vault = Some(vault);
        self
    }
}

/// A loaded, layered configuration.
///
/// Accessors hand out owned snapshots; the only way to change state is
/// through the mutation methods.
pub struct Configuration {
    app: String,
    store: LayerStore,
    merged: ConfigTree,
    base: ConfigTree,
    vault: Option<Arc<dyn Vault>>,
}

impl Configuration {
    /// Locate, read and merge the four layers for `app`.
    pub fn load(app: &str, opts: ConfigOptions) -> Result<Self, ApiError> {
        // Vault keys embed layer paths; both directories must be absolute.
        let project_dir = match opts.project_dir {
            Some(dir) => paths::search::absolute(&dir),
            None => std::env::current_dir().map_err(|e| {
                ApiError::ConfigError(format!("Failed to determine working directory: {}", e))
            })?,
        };
        let search_stop = match opts.search_stop {
            Some(stop) => Some(stop),
            None => paths::user_home().ok(),
        };
        let home_dir = match opts.home_dir {
            Some(dir) => paths::search::absolute(&dir),
            None => paths::search::absolute(&paths::global_dir(app)?),
        };

        let user_name = paths::user_file_name(app);
        let shared_name = paths::shared_file_name(app);

        let project_user = paths::search(&user_name, &project_dir, search_stop.as_deref())?
            .unwrap_or_else(|| project_dir.join(&user_name));
        let project_shared = paths::search(&shared_name, &project_dir, search_stop.as_deref())?
            .unwrap_or_else(|| project_dir.join(&shared_name));

        let mut store = LayerStore::new([
            project_user,
            project_shared,
            home_dir.join(&user_name),
            home_dir.join(&shared_name),
        ]);
        store.read_all()?;

        let merged = merge::merge_layers(store.layers());
        let base = merged.clone();
        tracing::debug!(
            app,
            active = store.active().kind().label(),
            "configuration loaded"
        );

        Ok(Self {
            app: app.to_string(),
            store,
            merged,
            base,
            vault: opts.vault,
        })
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    /// Whether any layer file was found on disk.
    pub fn exists(&self) -> bool {
        self.store.any_exists()
    }

    /// Layer paths in layer order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.store.paths()
    }

    /// Snapshot of the merged view.
    pub fn properties(&self) -> ConfigTree {
        self.merged.clone()
    }

    /// Snapshot of all four layers.
    pub fn layers(&self) -> Vec<Layer> {
        self.store.layers().to_vec()
    }

    /// Merged view as it was right after load.
    pub fn base(&self) -> ConfigTree {
        self.base.clone()
    }

    pub fn active(&self) -> ActiveLayer {
        self.store.active()
    }

    pub fn has_vault(&self) -> bool {
        self.vault.is_some()
    }

    pub fn layer_activate(&mut self, user: bool, global: bool) {
        self.store.activate(user, global);
    }

    /// Snapshot of the active layer.
    pub fn layer_get(&self) -> Result<Layer, ApiError> {
        self.store.active_layer().cloned()
    }

    /// Replace the active layer's tree.
    pub fn layer_set(&mut self, tree: ConfigTree) -> Result<(), ApiError> {
        let layer = self.store.active_layer_mut()?;
        layer.properties = tree;
        layer.properties.normalize();
        self.remerge();
        Ok(())
    }

    /// Look up a dotted path in the merged view, falling back to the first
    /// layer (in layer order) that defines it.
    pub fn get(&self, path: &str) -> Option<Value> {
        if let Some(value) = mutate::get_path(self.merged.as_map(), path) {
            return Some(value.clone());
        }
        self.store
            .layers()
            .iter()
            .find_map(|layer| mutate::get_path(layer.properties.as_map(), path))
            .cloned()
    }

    /// Write `value` at a dotted path in the active layer.
    pub fn set(&mut self, path: &str, value: Value, opts: SetOptions) -> Result<(), ApiError> {
        let layer = self.store.active_layer_mut()?;
        let result = mutate::set_path(&mut layer.properties, path, value, opts);
        // Intermediate objects created before a failure stay in place.
        self.remerge();
        result
    }

    /// Mark a dotted path as secure in the active layer without writing a value.
    pub fn add_secure(&mut self, path: &str) -> Result<(), ApiError> {
        mutate::split_path(path)?;
        if self.store.active_layer_mut()?.properties.add_secure(path) {
            self.remerge();
        }
        Ok(())
    }

    /// Set the `$schema` reference of the active layer.
    pub fn set_schema(&mut self, reference: &str) -> Result<(), ApiError> {
        self.store
            .active_layer_mut()?
            .properties
            .insert(tree::SCHEMA, Value::String(reference.to_string()));
        Ok(())
    }

    /// Replace secure placeholders in every layer with their vault values.
    ///
    /// Does nothing beyond a re-merge when no vault is configured.
    pub async fn load_secure(&mut self) -> Result<(), ApiError> {
        if let Some(vault) = self.vault.clone() {
            let merged_secure = self.merged.secure();
            if !merged_secure.is_empty() {
                secure::hydrate(self.store.layers_mut(), &merged_secure, vault.as_ref()).await?;
            }
        }
        self.remerge();
        Ok(())
    }

    /// Persist the active layer.
    ///
    /// With a vault configured, secure values are pushed to the vault and
    /// replaced by a placeholder in the written copy; the in-memory layer
    /// keeps the real values.
    pub async fn write(&mut self) -> Result<(), ApiError> {
        let layer = self.store.active_layer()?;
        let on_disk = match &self.vault {
            Some(vault) => secure::redact(layer, vault.as_ref()).await?,
            None => layer.properties.clone(),
        };
        let path = layer.path.clone();
        write_json(&path, &on_disk)?;

        self.store.active_layer_mut()?.exists = true;
        tracing::debug!(path = %path.display(), "wrote config layer");
        Ok(())
    }

    pub(crate) fn remerge(&mut self) {
        self.merged = merge::merge_layers(self.store.layers());
    }
}

/// Serialize `value` with 4-space indentation and write it to `path`,
/// creating parent directories as needed.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ApiError> {
    let io_err = |source: std::io::Error| ApiError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| io_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    std::fs::write(path, buf).map_err(io_err)
}
