use crate::error::AppError;
use crate::remote::DEFAULT_API_BASE;
use crate::storage::json_store;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "PLANVIBE_CONFIG_PATH";

/// Which system of record the task store talks to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    #[default]
    Local,
    Remote,
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

impl FromStr for BackendMode {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "local" | "offline" | "storage" => Ok(Self::Local),
            "remote" | "api" | "server" => Ok(Self::Remote),
            other => Err(AppError::invalid_input(format!(
                "unknown backend '{other}' (expected local or remote)"
            ))),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendMode,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub data_dir: Option<String>,
    /// Set from `--config-override data_dir=...`; beats `PLANVIBE_DATA_DIR`.
    #[serde(skip)]
    pub data_dir_override: Option<String>,
}

fn non_blank(dir: Option<&str>) -> Option<PathBuf> {
    dir.map(str::trim)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
}

impl Config {
    pub fn api_base(&self) -> &str {
        self.api_base
            .as_deref()
            .map(str::trim)
            .filter(|base| !base.is_empty())
            .unwrap_or(DEFAULT_API_BASE)
    }

    /// Resolution order: override, `PLANVIBE_DATA_DIR`, `data_dir`, then the
    /// directory holding the config file.
    pub fn data_dir(&self) -> Result<PathBuf, AppError> {
        if let Some(dir) = non_blank(self.data_dir_override.as_deref()) {
            return Ok(dir);
        }
        if let Some(dir) = json_store::data_dir_from_env() {
            return Ok(dir);
        }
        if let Some(dir) = non_blank(self.data_dir.as_deref()) {
            return Ok(dir);
        }
        let path = config_path()?;
        Ok(path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")))
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub backend: Option<BackendMode>,
    pub api_base: Option<String>,
    pub user_id: Option<u64>,
    pub data_dir: Option<String>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("planvibe")
            .join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("planvibe")
            .join(CONFIG_FILE_NAME))
    }
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(backend) = overrides.backend {
        merged.backend = backend;
    }
    if let Some(api_base) = overrides.api_base.as_ref() {
        merged.api_base = Some(api_base.trim().to_string());
    }
    if let Some(user_id) = overrides.user_id {
        merged.user_id = Some(user_id);
    }
    if let Some(data_dir) = overrides.data_dir.as_ref() {
        merged.data_dir_override = Some(data_dir.trim().to_string());
    }
    merged
}
