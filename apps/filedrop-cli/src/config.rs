//! CLI configuration.
//!
//! Lives at `~/.config/filedrop/config.json` unless `--config` says
//! otherwise. Every field has a default, so a missing file just means
//! defaults. `FILEDROP_API_KEY` overrides the HTTP backend key so it can
//! stay out of the file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use filedrop_protocol::RetryPolicy;
use filedrop_protocol::constants::{DEFAULT_CACHE_CONTROL, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
use filedrop_storage::{
    ApiKey, HttpStorage, HttpStorageConfig, LocalStorage, MemoryStorage, PutOptions,
    StorageCapability,
};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides the HTTP backend API key.
pub const API_KEY_ENV: &str = "FILEDROP_API_KEY";

/// Retry settings as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_delay_ms() -> u64 {
    u64::try_from(DEFAULT_RETRY_DELAY.as_millis()).unwrap_or(u64::MAX)
}

fn default_cache_control() -> String {
    DEFAULT_CACHE_CONTROL.into()
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.delay_ms))
    }
}

/// Which storage backend to wire in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "camelCase")]
pub enum StorageSettings {
    /// In-process only; handy for trying the CLI out.
    Memory,
    #[serde(rename_all = "camelCase")]
    Local {
        root: PathBuf,
        public_base_url: String,
    },
    #[serde(rename_all = "camelCase")]
    Http {
        endpoint: String,
        bucket: String,
        #[serde(default)]
        api_key: ApiKey,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
}

impl Default for StorageSettings {
    fn default() -> Self {
        let root = data_base_dir().join("filedrop").join("objects");
        let public_base_url = format!("file://{}", root.display());
        Self::Local {
            root,
            public_base_url,
        }
    }
}

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub retry: RetrySettings,
    /// Overwrite a file that was already uploaded under the same name.
    #[serde(default)]
    pub upsert: bool,
    #[serde(default = "default_cache_control")]
    pub cache_control: String,
    #[serde(default)]
    pub storage: StorageSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            retry: RetrySettings::default(),
            upsert: false,
            cache_control: default_cache_control(),
            storage: StorageSettings::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config from `path`, or the default location.
    ///
    /// A missing file yields defaults; an unparsable one logs a warning and
    /// yields defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path(),
        };

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<AppConfig>(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to parse config, using defaults"
                    );
                    AppConfig::default()
                }
            }
        } else {
            AppConfig::default()
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            config.apply_api_key(key);
        }

        Ok(config)
    }

    /// Writes the config to `path`, or the default location.
    pub fn save(&self, path: Option<&Path>) -> anyhow::Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path(),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        set_permissions_0600(&path);

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(path)
    }

    fn apply_api_key(&mut self, key: String) {
        if let StorageSettings::Http { api_key, .. } = &mut self.storage {
            *api_key = ApiKey::new(key);
        }
    }

    pub fn put_options(&self) -> PutOptions {
        PutOptions {
            upsert: self.upsert,
            cache_control: self.cache_control.clone(),
        }
    }

    /// Builds the configured storage adapter.
    pub fn build_storage(&self) -> anyhow::Result<Arc<dyn StorageCapability>> {
        let options = self.put_options();
        let storage: Arc<dyn StorageCapability> = match &self.storage {
            StorageSettings::Memory => {
                Arc::new(MemoryStorage::new("memory://filedrop").with_options(options))
            }
            StorageSettings::Local {
                root,
                public_base_url,
            } => Arc::new(LocalStorage::new(root, public_base_url.as_str()).with_options(options)),
            StorageSettings::Http {
                endpoint,
                bucket,
                api_key,
                timeout_secs,
            } => {
                if api_key.is_empty() {
                    anyhow::bail!("HTTP storage needs an API key (set {API_KEY_ENV})");
                }
                Arc::new(HttpStorage::new(HttpStorageConfig {
                    endpoint: endpoint.clone(),
                    bucket: bucket.clone(),
                    api_key: api_key.clone(),
                    timeout: timeout_secs.map(Duration::from_secs),
                    options,
                })?)
            }
        };
        Ok(storage)
    }
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

/// Default config file location.
pub fn config_path() -> PathBuf {
    config_base_dir().join("filedrop").join("config.json")
}

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".into()))
}

fn config_base_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        PathBuf::from(
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into()),
        )
    }

    #[cfg(not(target_os = "windows"))]
    {
        home_dir().join(".config")
    }
}

fn data_base_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        PathBuf::from(
            std::env::var("LOCALAPPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into()),
        )
    }

    #[cfg(not(target_os = "windows"))]
    {
        home_dir().join(".local").join("share")
    }
}
