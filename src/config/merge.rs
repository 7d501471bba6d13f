//! Layer merge
//!
//! Scalar maps (`defaults`, `all`) are first-writer-wins in layer order.
//! `secure` and `plugins` are deduplicated unions. Profiles merge in two
//! steps: user over shared within each scope, then project over global.

use crate::config::layers::{Layer, LayerKind};
use crate::config::tree::ConfigTree;
use serde_json::{Map, Value};

/// Deep merge two JSON values.
///
/// Merge semantics:
/// - Objects: deep-merge by key (recursive)
/// - Arrays: REPLACE (overlay wins entirely)
/// - Scalars: override (overlay wins)
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            Value::Object(deep_merge_maps(base_map, overlay_map))
        }
        (_, overlay) => overlay,
    }
}

/// [`deep_merge`] specialised to JSON objects.
pub fn deep_merge_maps(mut base: Map<String, Value>, overlay: Map<String, Value>) -> Map<String, Value> {
    for (key, overlay_value) in overlay {
        let merged = match base.remove(&key) {
            Some(base_value) => deep_merge(base_value, overlay_value),
            None => overlay_value,
        };
        base.insert(key, merged);
    }
    base
}

/// Combine project and global profile trees.
///
/// A profile type missing on the project side is taken whole from the global
/// side. When both sides define the type, the project side keeps every name
/// it defines and only the global-only names are added.
pub fn combine_scopes(project: Map<String, Value>, global: Map<String, Value>) -> Map<String, Value> {
    let mut combined = project;
    for (profile_type, global_profiles) in global {
        match combined.get_mut(&profile_type) {
            None => {
                combined.insert(profile_type, global_profiles);
            }
            Some(Value::Object(project_profiles)) => {
                if let Value::Object(global_profiles) = global_profiles {
                    for (name, profile) in global_profiles {
                        project_profiles.entry(name).or_insert(profile);
                    }
                }
            }
            // A non-object on the project side shadows the global entry.
            Some(_) => {}
        }
    }
    combined
}

/// Recompute the merged view from the four layers.
pub fn merge_layers(layers: &[Layer]) -> ConfigTree {
    let mut merged = ConfigTree::default();
    let mut secure: Vec<String> = Vec::new();
    let mut plugins: Vec<String> = Vec::new();

    for layer in layers {
        union_into(&mut secure, layer.properties.secure());
        union_into(&mut plugins, layer.properties.plugins());

        for (name, value) in layer.properties.defaults() {
            merged
                .defaults_mut()
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
        for (name, value) in layer.properties.all() {
            merged
                .all_mut()
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }

    merged.set_secure(secure);
    merged.set_plugins(plugins);
    *merged.profiles_mut() = merge_profiles(layers);
    merged
}

fn merge_profiles(layers: &[Layer]) -> Map<String, Value> {
    let profiles_of = |kind: LayerKind| -> Map<String, Value> {
        layers
            .iter()
            .find(|layer| layer.kind() == kind)
            .map(|layer| layer.properties.profiles().clone())
            .unwrap_or_default()
    };

    let project = deep_merge_maps(
        profiles_of(LayerKind::ProjectShared),
        profiles_of(LayerKind::ProjectUser),
    );
    let global = deep_merge_maps(
        profiles_of(LayerKind::GlobalShared),
        profiles_of(LayerKind::GlobalUser),
    );
    combine_scopes(project, global)
}

fn union_into(target: &mut Vec<String>, entries: Vec<String>) {
    for entry in entries {
        if !target.contains(&entry) {
            target.push(entry);
        }
    }
}
