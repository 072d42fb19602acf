use crate::shared::logging;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_RESOURCE_NAME_PATTERN: &str = "res-";
pub const DEFAULT_BACKEND_TYPE: &str = "local";
pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";
pub const DEFAULT_EXPORT_API_VERSION: &str = "2021-04-01";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub terraform: TerraformConfig,
    pub azure: AzureConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TerraformConfig {
    /// Explicit path to the terraform binary. When unset the binary is
    /// looked up in PATH.
    pub executable_path: Option<String>,
    pub binary_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    pub subscription_id: Option<String>,
    pub management_endpoint: String,
    pub api_version: String,
    pub access_token: Option<String>,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            subscription_id: None,
            management_endpoint: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
            api_version: DEFAULT_EXPORT_API_VERSION.to_string(),
            access_token: None,
        }
    }
}

/// Whether the edge from each resource to its resource group is written
/// into the generated `depends_on`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RootDependency {
    #[default]
    Explicit,
    Implicit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub resource_name_pattern: String,
    pub backend_type: String,
    pub backend_config: Vec<String>,
    pub root_dependency: RootDependency,
    pub overwrite: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            resource_name_pattern: DEFAULT_RESOURCE_NAME_PATTERN.to_string(),
            backend_type: DEFAULT_BACKEND_TYPE.to_string(),
            backend_config: Vec::new(),
            root_dependency: RootDependency::default(),
            overwrite: false,
        }
    }
}

impl Config {
    /// Subscription from the environment, else from the config file.
    pub fn subscription_id(&self) -> Option<String> {
        env_value("ARM_SUBSCRIPTION_ID")
            .or_else(|| env_value("AZURE_SUBSCRIPTION_ID"))
            .or_else(|| non_empty(self.azure.subscription_id.clone()))
    }

    pub fn access_token(&self) -> Option<String> {
        env_value("AZURE_ACCESS_TOKEN").or_else(|| non_empty(self.azure.access_token.clone()))
    }

    pub fn terraform_binary_name(&self) -> String {
        env_value("TERRAFORM_BINARY_NAME")
            .or_else(|| non_empty(self.terraform.binary_name.clone()))
            .unwrap_or_else(|| "terraform".to_string())
    }
}

fn env_value(name: &str) -> Option<String> {
    non_empty(std::env::var(name).ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Load the configuration from an explicit file.
pub fn init_from_path(path: &str) -> anyhow::Result<Config> {
    let path = Path::new(path);
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let config: Config = serde_json::from_str(&content)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    logging::debug(&format!("Loaded configuration from {}", path.display()));
    Ok(config)
}

/// Location of the per-user config file, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("aztfimport").join("config.json"))
}

/// Load the per-user config file when it exists, defaults otherwise.
pub fn init_default() -> anyhow::Result<Config> {
    match default_config_path() {
        Some(path) if path.is_file() => init_from_path(&path.to_string_lossy()),
        _ => Ok(Config::default()),
    }
}

/// Split a resource name pattern at its last `*` into prefix and suffix.
pub fn split_name_pattern(pattern: &str) -> (String, String) {
    match pattern.rfind('*') {
        Some(pos) => (pattern[..pos].to_string(), pattern[pos + 1..].to_string()),
        None => (pattern.to_string(), String::new()),
    }
}
