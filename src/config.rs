use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};

use crate::free_entry::EventsConfig;
use crate::query::QueryPolicy;
use crate::season::SeasonalWindow;
use crate::tickets::TicketsConfig;

pub const API_BASE_ENV: &str = "TICKETSCLOUD_API_BASE";
pub const API_KEY_ENV: &str = "TICKETSCLOUD_API_KEY";

const DATA_DIR_NAME: &str = "vnvnc";

pub fn data_root() -> PathBuf {
    dirs::data_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

pub fn default_config_path() -> PathBuf {
    data_root().join("config.json")
}

pub fn default_database_path() -> PathBuf {
    data_root().join("vnvnc.sqlite")
}

pub(crate) fn ensure_parent(path: &Path) {
    let Some(parent) = path.parent() else {
        return;
    };
    if let Err(err) = fs::create_dir_all(parent) {
        tracing::warn!(path = %parent.display(), error = %err, "failed to create directory");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub events: EventsConfig,
    pub seasonal_window: SeasonalWindow,
    pub tickets: TicketsConfig,
    pub query: QueryPolicy,
}

/// Ticketing settings taken from the environment. They sit on top of the file
/// and are never written back to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub api_base: Option<String>,
    pub api_key: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self::new(std::env::var(API_BASE_ENV).ok(), std::env::var(API_KEY_ENV).ok())
    }

    pub fn new(api_base: Option<String>, api_key: Option<String>) -> Self {
        let clean = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            api_base: clean(api_base),
            api_key: clean(api_key),
        }
    }

    fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(base) = &self.api_base {
            config.tickets.api_base = base.clone();
        }
        if let Some(key) = &self.api_key {
            config.tickets.api_key = Some(key.clone());
        }
        config
    }
}

pub struct ConfigStore {
    path: PathBuf,
    file: Mutex<AppConfig>,
    overrides: EnvOverrides,
}

impl ConfigStore {
    pub fn with_overrides(path: PathBuf, overrides: EnvOverrides) -> Self {
        let file = read_config(&path).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "using default config");
            AppConfig::default()
        });
        Self {
            path,
            file: Mutex::new(file),
            overrides,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> AppConfig {
        let file = self
            .file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        self.overrides.apply(file)
    }

    /// `transform` sees the file contents only; the result returned is effective.
    pub fn update<F>(&self, transform: F) -> Result<AppConfig, ConfigError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        transform(&mut next);
        write_config(&self.path, &next)?;
        *guard = next;
        Ok(self.overrides.apply(guard.clone()))
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&contents)?)
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    ensure_parent(path);
    let contents = serde_json::to_string_pretty(config)?;
    fs::write(path, contents).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
