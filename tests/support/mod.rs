//! Shared fixtures: a fake home with a project checkout inside it.

use layerconf::config::{ConfigOptions, Configuration, Vault};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const APP: &str = "app";

pub struct Fixture {
    pub temp: TempDir,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("home").join("repo").join("src")).unwrap();
        fs::create_dir_all(temp.path().join("home").join(".app")).unwrap();
        Self { temp }
    }

    pub fn home(&self) -> PathBuf {
        self.temp.path().join("home")
    }

    pub fn project(&self) -> PathBuf {
        self.home().join("repo")
    }

    pub fn global(&self) -> PathBuf {
        self.home().join(".app")
    }

    /// Write a JSON file relative to the fake home.
    pub fn write(&self, relative: &str, content: Value) -> PathBuf {
        let path = self.home().join(relative);
        fs::write(&path, content.to_string()).unwrap();
        path
    }

    pub fn read(&self, relative: &str) -> Value {
        serde_json::from_str(&fs::read_to_string(self.home().join(relative)).unwrap()).unwrap()
    }

    pub fn options(&self) -> ConfigOptions {
        ConfigOptions {
            home_dir: Some(self.global()),
            project_dir: Some(self.project()),
            search_stop: Some(self.home()),
            vault: None,
        }
    }

    pub fn load(&self) -> Configuration {
        Configuration::load(APP, self.options()).unwrap()
    }

    pub fn load_with_vault(&self, vault: Arc<dyn Vault>) -> Configuration {
        Configuration::load(APP, self.options().with_vault(vault)).unwrap()
    }
}
