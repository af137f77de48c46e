// Config store: a small JSON file holding the API key (and any other
// string settings) under the user's config directory.
//
// The store is an explicit handle. `main` opens it once per invocation and
// passes it to whatever needs it; nothing reads the file behind its back.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Key under which the API key is stored.
pub const API_KEY: &str = "apiKey";

/// Environment variable that overrides the config directory.
pub const CONFIG_DIR_ENV: &str = "GOUPC_CONFIG_DIR";

const APP_DIR: &str = "ktmcp-goupc";
const CONFIG_FILENAME: &str = "config.json";

/// Errors raised while reading or writing the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a config directory for this platform")]
    NoConfigDir,

    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// File-backed key/value settings.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl ConfigStore {
    /// Open the store at its default location: `$GOUPC_CONFIG_DIR` when set,
    /// otherwise `<platform config dir>/ktmcp-goupc`.
    pub fn open() -> Result<Self, ConfigError> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()
                .ok_or(ConfigError::NoConfigDir)?
                .join(APP_DIR),
        };
        Self::open_in(dir)
    }

    /// Open the store kept in `dir`. A missing file is an empty config.
    pub fn open_in<P: AsRef<Path>>(dir: P) -> Result<Self, ConfigError> {
        let path = dir.as_ref().join(CONFIG_FILENAME);
        let values = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            parse_values(&content).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), keys = values.len(), "loaded config");
        Ok(ConfigStore { path, values })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Store a value and write the file immediately.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }

    pub fn get_all(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Remove every stored value, including the API key.
    pub fn clear(&mut self) -> Result<(), ConfigError> {
        self.values.clear();
        self.save()
    }

    /// The stored API key, or an empty string when none is set.
    pub fn api_key(&self) -> &str {
        self.get(API_KEY).unwrap_or_default()
    }

    /// True when an API key with at least one non-whitespace character is
    /// stored.
    pub fn is_configured(&self) -> bool {
        !self.api_key().trim().is_empty()
    }

    fn save(&self) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let content =
            serde_json::to_string_pretty(&self.values).map_err(|source| ConfigError::Parse {
                path: self.path.clone(),
                source,
            })?;
        fs::write(&self.path, content).map_err(io_err)?;
        debug!(path = %self.path.display(), "saved config");
        Ok(())
    }
}

/// Read a config object, keeping only string values. Other value types can
/// only appear if the file was edited by hand and are ignored.
fn parse_values(content: &str) -> Result<BTreeMap<String, String>, serde_json::Error> {
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let raw: BTreeMap<String, Value> = serde_json::from_str(content)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(s) => Some((key, s)),
            _ => None,
        })
        .collect())
}

/// Hide most of an API key for display: keys longer than eight characters
/// keep their first and last four, shorter ones are fully masked.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}
