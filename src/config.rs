use crate::draft::{
    FileStorage, LocalStorage, MemoryStorage, RedbStorage, StorageError, DEFAULT_STORAGE_KEY,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Key the draft document is stored under.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_server_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_request_timeout_ms() -> u64 {
    15000
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            storage_key: default_storage_key(),
            storage: StorageConfig::default(),
            token: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Directory for `file`, database file for `redb`. Ignored for `memory`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
        }
    }
}

fn default_backend() -> StorageBackend {
    StorageBackend::File
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    File,
    Redb,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(StorageBackend::Memory),
            "file" => Ok(StorageBackend::File),
            "redb" => Ok(StorageBackend::Redb),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

impl StorageConfig {
    pub fn resolved_path(&self) -> PathBuf {
        match (&self.path, self.backend) {
            (Some(path), _) => path.clone(),
            (None, StorageBackend::Redb) => PathBuf::from("./site-drafts.redb"),
            (None, _) => PathBuf::from("./site-drafts"),
        }
    }

    /// Open the configured backing store.
    pub fn open(&self) -> Result<Box<dyn LocalStorage>, StorageError> {
        Ok(match self.backend {
            StorageBackend::Memory => Box::new(MemoryStorage::new()),
            StorageBackend::File => Box::new(FileStorage::new(self.resolved_path())?),
            StorageBackend::Redb => Box::new(RedbStorage::open(&self.resolved_path())?),
        })
    }
}

impl ConsoleConfig {
    pub fn load(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
