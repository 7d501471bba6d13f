//! Layerconf: Layered JSON Configuration
//!
//! Discovers, merges and edits a four-layer JSON configuration (project and
//! global scope, each with a shared and a user file), with profile lookup and
//! vault-backed secure values.

pub mod config;
pub mod error;
pub mod logging;
pub mod tooling;

pub use config::{
    ConfigOptions, ConfigTree, Configuration, Layer, LayerKind, MemoryVault, Profile, SetOptions,
    Vault,
};
pub use error::{ApiError, ErrorKind};
