//! CLI Tooling
//!
//! Command-line surface over [`Configuration`]. Each command returns the text
//! to print; the binary decides how to render errors.

use crate::config::{paths, ConfigOptions, ConfigTree, Configuration, LayerKind, SetOptions, Vault};
use crate::error::ApiError;
use crate::logging::LoggingConfig;
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Layered JSON configuration manager
#[derive(Parser)]
#[command(name = "layerconf")]
#[command(about = "Manage layered project and global JSON configuration")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Application name; selects <app>.config.json and ~/.<app>
    #[arg(long, default_value = "layerconf")]
    pub app: String,

    /// Directory where the project config search starts
    #[arg(long)]
    pub project_dir: Option<PathBuf>,

    /// Directory holding the global config files
    #[arg(long)]
    pub home_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Logging settings derived from the command-line flags.
    pub fn logging_config(&self) -> LoggingConfig {
        let mut config = LoggingConfig::default();
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        config.file = self.log_file.clone();
        config
    }

    pub fn config_options(&self) -> ConfigOptions {
        ConfigOptions {
            home_dir: self.home_dir.clone(),
            project_dir: self.project_dir.clone(),
            ..ConfigOptions::default()
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create or update a configuration property
    Set {
        /// Dotted property path (e.g. profiles.db.main.properties.host)
        property: String,
        /// Value to store; parsed as JSON with --json
        value: Option<String>,
        /// Target the user config
        #[arg(long)]
        user: bool,
        /// Target the global config
        #[arg(long, short = 'g')]
        global: bool,
        /// The value is JSON
        #[arg(long)]
        json: bool,
        /// Mark the property secure (kept in the vault when one is attached)
        #[arg(long)]
        secure: bool,
        /// Append the value to an existing array
        #[arg(long)]
        append: bool,
    },
    /// Print a property from the merged configuration
    Get {
        /// Dotted property path
        property: String,
    },
    /// Show the merged configuration, each layer, or the layer paths
    List {
        /// Show each layer separately
        #[arg(long, conflicts_with = "paths")]
        layers: bool,
        /// Show the layer file paths
        #[arg(long)]
        paths: bool,
    },
    /// Inspect and select profiles
    Profiles {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Create a config layer, optionally from a URL
    Init {
        /// Target the user config
        #[arg(long)]
        user: bool,
        /// Target the global config
        #[arg(long, short = 'g')]
        global: bool,
        /// Download the initial config from this URL
        #[arg(long)]
        url: Option<String>,
    },
    /// Search upward from the project directory for a file
    Search {
        /// File name to look for
        file: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProfileCommands {
    /// List profile types
    List,
    /// Show a profile's resolved properties
    Get {
        profile_type: String,
        name: String,
    },
    /// Check whether a profile exists
    Exists {
        profile_type: String,
        name: String,
    },
    /// Make a profile the default for its type
    SetDefault {
        profile_type: String,
        name: String,
        /// Target the user config
        #[arg(long)]
        user: bool,
        /// Target the global config
        #[arg(long, short = 'g')]
        global: bool,
    },
}

/// CLI context holding the loaded configuration.
pub struct CliContext {
    config: Configuration,
    project_dir: PathBuf,
}

impl CliContext {
    /// Load the configuration for `app`.
    pub fn new(app: &str, opts: ConfigOptions) -> Result<Self, ApiError> {
        let project_dir = match &opts.project_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(|e| {
                ApiError::ConfigError(format!("Failed to determine working directory: {}", e))
            })?,
        };
        let config = Configuration::load(app, opts)?;
        Ok(Self {
            config,
            project_dir,
        })
    }

    /// Load with a vault attached.
    pub fn with_vault(app: &str, opts: ConfigOptions, vault: Arc<dyn Vault>) -> Result<Self, ApiError> {
        Self::new(app, opts.with_vault(vault))
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Execute a CLI command
    pub async fn execute(&mut self, command: &Commands) -> Result<String, ApiError> {
        tracing::info!(command = ?command, "executing command");
        match command {
            Commands::Set {
                property,
                value,
                user,
                global,
                json,
                secure,
                append,
            } => {
                if *secure && !self.config.has_vault() {
                    tracing::warn!(property = %property, "no vault attached; secure value is stored in plaintext");
                }
                self.config.layer_activate(*user, *global);
                self.config.load_secure().await?;

                let raw = value.clone().unwrap_or_default();
                let value = if *json {
                    serde_json::from_str(&raw).map_err(|e| {
                        ApiError::Validation(format!("could not parse JSON value: {}", e))
                    })?
                } else {
                    Value::String(raw)
                };
                self.config.set(
                    property,
                    value,
                    SetOptions {
                        secure: *secure,
                        append: *append,
                    },
                )?;
                self.config.write().await?;
                let layer = self.config.layer_get()?;
                Ok(format!("Set {} in {}", property, layer.path.display()))
            }
            Commands::Get { property } => {
                self.config.load_secure().await?;
                match self.config.get(property) {
                    Some(value) => to_pretty(&value),
                    None => Err(ApiError::Validation(format!(
                        "property {} is not defined",
                        property
                    ))),
                }
            }
            Commands::List { layers, paths } => {
                if *paths {
                    Ok(self.paths_table())
                } else if *layers {
                    let mut out = serde_json::Map::new();
                    for layer in self.config.layers() {
                        out.insert(layer.path.display().to_string(), layer.properties.into_value());
                    }
                    to_pretty(&Value::Object(out))
                } else {
                    to_pretty(&self.config.properties().into_value())
                }
            }
            Commands::Profiles { command } => self.handle_profile_command(command).await,
            Commands::Init { user, global, url } => {
                self.config.layer_activate(*user, *global);
                match url {
                    Some(url) => self.config.init_from_url(url).await?,
                    None => {
                        let existing = self.config.layer_get()?;
                        if !existing.exists {
                            self.config.layer_set(ConfigTree::default())?;
                        }
                    }
                }
                self.config.write().await?;
                let layer = self.config.layer_get()?;
                Ok(format!("Saved config to {}", layer.path.display()))
            }
            Commands::Search { file } => {
                let stop = paths::user_home().ok();
                match paths::search(file, &self.project_dir, stop.as_deref())? {
                    Some(found) => Ok(found.display().to_string()),
                    None => Ok(format!("{} not found", file)),
                }
            }
        }
    }

    async fn handle_profile_command(&mut self, command: &ProfileCommands) -> Result<String, ApiError> {
        match command {
            ProfileCommands::List => Ok(self.config.profiles().names().join("\n")),
            ProfileCommands::Get { profile_type, name } => {
                self.config.load_secure().await?;
                match self.config.profiles().get(profile_type, name) {
                    Some(properties) => to_pretty(&Value::Object(properties)),
                    None => Err(ApiError::Validation(format!(
                        "profile {} of type {} does not exist",
                        name, profile_type
                    ))),
                }
            }
            ProfileCommands::Exists { profile_type, name } => {
                Ok(self.config.profiles().exists(profile_type, name).to_string())
            }
            ProfileCommands::SetDefault {
                profile_type,
                name,
                user,
                global,
            } => {
                self.config.layer_activate(*user, *global);
                self.config.load_secure().await?;
                self.config.profiles_mut().default_set(profile_type, name)?;
                self.config.write().await?;
                Ok(format!("Default {} profile set to {}", profile_type, name))
            }
        }
    }

    fn paths_table(&self) -> String {
        let active = self.config.active().kind();
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Layer", "Path", "Exists", "Active"]);
        for layer in self.config.layers() {
            let kind: LayerKind = layer.kind();
            table.add_row(vec![
                kind.label().to_string(),
                layer.path.display().to_string(),
                if layer.exists { "yes" } else { "no" }.to_string(),
                if kind == active { "*" } else { "" }.to_string(),
            ]);
        }
        table.to_string()
    }
}

fn to_pretty(value: &Value) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::Internal(format!("failed to render JSON: {}", e)))
}
