//! Typed profile access over the merged view.
//!
//! Profiles live at `profiles.<type>.<name>` in a layer tree.

use crate::config::layers::LayerKind;
use crate::config::merge::deep_merge_maps;
use crate::config::Configuration;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A named, typed bundle of properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub properties: Map<String, Value>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub profile_type: Option<String>,

    /// Nested sub-profiles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles: Option<BTreeMap<String, Profile>>,
}

impl Profile {
    pub fn new(properties: Map<String, Value>) -> Self {
        Self {
            properties,
            ..Self::default()
        }
    }
}

/// Dotted path of a profile property inside a layer tree.
pub fn property_path(profile_type: &str, name: &str, property: &str) -> String {
    format!("profiles.{}.{}.properties.{}", profile_type, name, property)
}

/// Read-only profile view.
pub struct Profiles<'a> {
    config: &'a Configuration,
}

impl<'a> Profiles<'a> {
    /// Profile types defined in the merged view.
    pub fn names(&self) -> Vec<String> {
        self.config.merged.profiles().keys().cloned().collect()
    }

    pub fn exists(&self, profile_type: &str, name: &str) -> bool {
        self.merged_profile(profile_type, name).is_some()
    }

    /// Properties of a profile layered over the applicable `all` maps.
    ///
    /// The `all` map comes from the first layer (in layer order) that defines
    /// the profile, deep-merged over the `all` map of that layer's partner in
    /// the same scope. Profile properties win over `all` entries.
    pub fn get(&self, profile_type: &str, name: &str) -> Option<Map<String, Value>> {
        let merged = self.merged_profile(profile_type, name)?;

        let store = &self.config.store;
        let defining = LayerKind::ORDER.into_iter().find(|kind| {
            store
                .layer(*kind)
                .properties
                .profiles()
                .get(profile_type)
                .and_then(|profiles| profiles.get(name))
                .is_some_and(|profile| !profile.is_null())
        })?;

        let own_all = store.layer(defining).properties.all().clone();
        let partner_all = store.layer(defining.partner()).properties.all().clone();
        let mut resolved = deep_merge_maps(partner_all, own_all);

        if let Some(Value::Object(properties)) = merged.get("properties") {
            for (key, value) in properties {
                resolved.insert(key.clone(), value.clone());
            }
        }
        Some(resolved)
    }

    /// The merged profile node as stored, without `all` applied.
    pub fn get_raw(&self, profile_type: &str, name: &str) -> Option<Profile> {
        self.merged_profile(profile_type, name)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Default profile name for a type.
    pub fn default_get(&self, profile_type: &str) -> Option<String> {
        self.config
            .merged
            .defaults()
            .get(profile_type)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn merged_profile(&self, profile_type: &str, name: &str) -> Option<&'a Value> {
        self.config
            .merged
            .profiles()
            .get(profile_type)
            .and_then(|profiles| profiles.get(name))
            .filter(|profile| !profile.is_null())
    }
}

/// Mutating profile view; every change targets the active layer.
pub struct ProfilesMut<'a> {
    config: &'a mut Configuration,
}

impl<'a> ProfilesMut<'a> {
    /// Store `profile` and optionally mark some of its properties secure.
    pub fn set(
        &mut self,
        profile_type: &str,
        name: &str,
        profile: Profile,
        secure: &[&str],
    ) -> Result<(), ApiError> {
        let value = serde_json::to_value(&profile)
            .map_err(|e| ApiError::Validation(format!("invalid profile {}: {}", name, e)))?;

        let layer = self.config.store.active_layer_mut()?;
        let by_type = layer
            .properties
            .profiles_mut()
            .entry(profile_type.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !by_type.is_object() {
            *by_type = Value::Object(Map::new());
        }
        if let Value::Object(profiles) = by_type {
            profiles.insert(name.to_string(), value);
        }
        for property in secure {
            layer
                .properties
                .add_secure(&property_path(profile_type, name, property));
        }

        self.config.remerge();
        Ok(())
    }

    /// Make `name` the default profile for `profile_type` in the active layer.
    pub fn default_set(&mut self, profile_type: &str, name: &str) -> Result<(), ApiError> {
        self.config
            .store
            .active_layer_mut()?
            .properties
            .defaults_mut()
            .insert(profile_type.to_string(), Value::String(name.to_string()));
        self.config.remerge();
        Ok(())
    }
}

impl Configuration {
    pub fn profiles(&self) -> Profiles<'_> {
        Profiles { config: self }
    }

    pub fn profiles_mut(&mut self) -> ProfilesMut<'_> {
        ProfilesMut { config: self }
    }
}
