use std::path::{Path, PathBuf};

use anyhow::Context;
use lume_core::StorageOptions;
use lume_registry::RegistryConfig;
use serde::{Deserialize, Serialize};

/// Default storage directory, relative to the config file's directory.
pub const DEFAULT_STORE_DIR: &str = "data/registry";

pub const DEFAULT_BACKEND: &str = "redb";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LumeNodeConfig {
    #[serde(default)]
    pub identity: Option<NodeConfigIdentity>,
    #[serde(default)]
    pub store: NodeConfigStore,
    #[serde(default)]
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeConfigIdentity {
    /// Hex-encoded 32-byte ed25519 secret key, preferred over the file.
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Path to a file holding the secret key, raw or hex. Relative paths
    /// resolve against the config file's directory.
    #[serde(default)]
    pub secret_key_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeConfigStore {
    /// Name of the storage backend, as registered with the factory.
    #[serde(rename = "type", default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub memory_only: bool,
}

fn default_backend() -> String {
    DEFAULT_BACKEND.to_owned()
}

impl Default for NodeConfigStore {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
            memory_only: false,
        }
    }
}

impl NodeConfigStore {
    /// Backend options with `path` resolved against `config_dir`.
    pub fn options(&self, config_dir: &Path) -> StorageOptions {
        let path = match &self.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => config_dir.join(path),
            None => config_dir.join(DEFAULT_STORE_DIR),
        };
        StorageOptions {
            path: Some(path),
            memory_only: self.memory_only,
        }
    }
}

impl LumeNodeConfig {
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("could not parse node config")
    }

    /// Reads and parses the config file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
    }
}

/// Directory relative paths in the config file at `path` resolve against.
pub fn config_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}
