//! Plugin list tracking relative to the configuration as loaded.

use crate::config::{secure, write_json, Configuration};
use crate::error::ApiError;

impl Configuration {
    /// Plugins present in the merged view but not in the load-time base.
    pub fn new_plugins(&self) -> Vec<String> {
        let base = self.base.plugins();
        self.merged
            .plugins()
            .into_iter()
            .filter(|plugin| !base.contains(plugin))
            .collect()
    }

    /// Append newly added plugins to the active layer file.
    ///
    /// Nothing is written when the active layer does not exist on disk yet.
    /// With a vault configured, secure values are redacted from the written
    /// copy the same way [`Configuration::write`] does.
    pub async fn write_plugins(&self) -> Result<(), ApiError> {
        let layer = self.store.active_layer()?;
        if !layer.exists {
            tracing::debug!(path = %layer.path.display(), "skipping plugin write for missing layer");
            return Ok(());
        }

        let mut copy = match &self.vault {
            Some(vault) => secure::redact(layer, vault.as_ref()).await?,
            None => layer.properties.clone(),
        };
        let mut plugins = copy.plugins();
        for plugin in self.new_plugins() {
            if !plugins.contains(&plugin) {
                plugins.push(plugin);
            }
        }
        copy.set_plugins(plugins);
        write_json(&layer.path, &copy)
    }
}
