//! The four configuration layers and the active-layer selector.

use crate::config::tree::ConfigTree;
use crate::error::ApiError;
use serde::Serialize;
use std::path::PathBuf;

/// Position of a layer in the fixed layer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    ProjectUser,
    ProjectShared,
    GlobalUser,
    GlobalShared,
}

impl LayerKind {
    /// Layer order used for loading, activation and scalar merging.
    pub const ORDER: [LayerKind; 4] = [
        LayerKind::ProjectUser,
        LayerKind::ProjectShared,
        LayerKind::GlobalUser,
        LayerKind::GlobalShared,
    ];

    pub fn from_flags(user: bool, global: bool) -> Self {
        match (user, global) {
            (true, false) => LayerKind::ProjectUser,
            (false, false) => LayerKind::ProjectShared,
            (true, true) => LayerKind::GlobalUser,
            (false, true) => LayerKind::GlobalShared,
        }
    }

    pub fn index(self) -> usize {
        match self {
            LayerKind::ProjectUser => 0,
            LayerKind::ProjectShared => 1,
            LayerKind::GlobalUser => 2,
            LayerKind::GlobalShared => 3,
        }
    }

    pub fn is_user(self) -> bool {
        matches!(self, LayerKind::ProjectUser | LayerKind::GlobalUser)
    }

    pub fn is_global(self) -> bool {
        matches!(self, LayerKind::GlobalUser | LayerKind::GlobalShared)
    }

    /// The other ownership variant within the same scope
    /// (project-user <-> project-shared, global-user <-> global-shared).
    pub fn partner(self) -> Self {
        LayerKind::from_flags(!self.is_user(), self.is_global())
    }

    pub fn label(self) -> &'static str {
        match self {
            LayerKind::ProjectUser => "project user",
            LayerKind::ProjectShared => "project",
            LayerKind::GlobalUser => "global user",
            LayerKind::GlobalShared => "global",
        }
    }
}

/// One physical configuration file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    pub path: PathBuf,
    pub exists: bool,
    pub user: bool,
    pub global: bool,
    pub properties: ConfigTree,
}

impl Layer {
    pub fn new(kind: LayerKind, path: PathBuf) -> Self {
        Self {
            path,
            exists: false,
            user: kind.is_user(),
            global: kind.is_global(),
            properties: ConfigTree::default(),
        }
    }

    pub fn kind(&self) -> LayerKind {
        LayerKind::from_flags(self.user, self.global)
    }

    /// Read and normalize the layer file if it exists.
    pub fn read(&mut self) -> Result<(), ApiError> {
        if self.path.is_file() {
            let content = std::fs::read_to_string(&self.path).map_err(|source| ApiError::Read {
                path: self.path.clone(),
                source,
            })?;
            let value: serde_json::Value =
                serde_json::from_str(&content).map_err(|source| ApiError::Parse {
                    path: self.path.clone(),
                    source,
                })?;
            self.properties = ConfigTree::from_value(value);
            self.exists = true;
            tracing::debug!(path = %self.path.display(), "loaded config layer");
        }
        self.properties.normalize();
        Ok(())
    }
}

/// Which layer receives mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ActiveLayer {
    pub user: bool,
    pub global: bool,
}

impl ActiveLayer {
    pub fn kind(self) -> LayerKind {
        LayerKind::from_flags(self.user, self.global)
    }
}

/// Fixed-order set of the four layers plus the activation state.
#[derive(Debug, Clone)]
pub struct LayerStore {
    layers: Vec<Layer>,
    active: ActiveLayer,
}

impl LayerStore {
    /// Build the store from the four resolved paths, in [`LayerKind::ORDER`].
    pub fn new(paths: [PathBuf; 4]) -> Self {
        let layers = LayerKind::ORDER
            .iter()
            .zip(paths)
            .map(|(kind, path)| Layer::new(*kind, path))
            .collect();
        Self {
            layers,
            active: ActiveLayer::default(),
        }
    }

    /// Read every existing layer file and pick the initial active layer:
    /// the first existing one in layer order, else project-shared.
    pub fn read_all(&mut self) -> Result<(), ApiError> {
        let mut picked = false;
        for layer in &mut self.layers {
            layer.read()?;
            if !picked && layer.exists {
                self.active = ActiveLayer {
                    user: layer.user,
                    global: layer.global,
                };
                picked = true;
            }
        }
        Ok(())
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, kind: LayerKind) -> &Layer {
        &self.layers[kind.index()]
    }

    pub fn active(&self) -> ActiveLayer {
        self.active
    }

    pub fn activate(&mut self, user: bool, global: bool) {
        self.active = ActiveLayer { user, global };
    }

    pub fn active_layer(&self) -> Result<&Layer, ApiError> {
        let active = self.active;
        self.layers
            .iter()
            .find(|layer| layer.user == active.user && layer.global == active.global)
            .ok_or_else(|| ApiError::Internal("no active layer found".to_string()))
    }

    pub fn active_layer_mut(&mut self) -> Result<&mut Layer, ApiError> {
        let active = self.active;
        self.layers
            .iter_mut()
            .find(|layer| layer.user == active.user && layer.global == active.global)
            .ok_or_else(|| ApiError::Internal("no active layer found".to_string()))
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.layers.iter().map(|l| l.path.clone()).collect()
    }

    pub fn any_exists(&self) -> bool {
        self.layers.iter().any(|l| l.exists)
    }
}
