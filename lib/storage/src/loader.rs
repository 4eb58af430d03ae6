//! Config file loading
//!
//! Both the selection config and the database config are read from JSON
//! (`.json`), YAML (`.yaml`/`.yml`) or TOML (`.toml`) files, picked by
//! extension.

use dedupx_core::{Error, Result};
use dedupx_selection::DedupeConfig;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::sqlite::SqliteStore;

fn read_structured<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let text = std::fs::read_to_string(path)?;

    match ext.as_str() {
        "json" => serde_json::from_str(&text)
            .map_err(|e| Error::Serialization(format!("{}: {}", path.display(), e))),
        "yaml" | "yml" => serde_yaml::from_str(&text)
            .map_err(|e| Error::Serialization(format!("{}: {}", path.display(), e))),
        "toml" => toml::from_str(&text)
            .map_err(|e| Error::Serialization(format!("{}: {}", path.display(), e))),
        other => Err(Error::InvalidConfig(format!(
            "unknown config file type '{}' for {}",
            other,
            path.display()
        ))),
    }
}

/// Load a selection config. Validation happens when it is compiled.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<DedupeConfig> {
    read_structured(path.as_ref())
}

/// Database connection settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DbConfig {
    /// Backend name; only `sqlite` is supported
    #[serde(rename = "type")]
    pub kind: String,
    /// Database file. Relative paths resolve against the config file.
    pub path: PathBuf,
}

impl DbConfig {
    pub fn open(&self) -> Result<SqliteStore> {
        SqliteStore::open(&self.path)
    }
}

/// Load database settings and check the backend is supported
pub fn load_db_config<P: AsRef<Path>>(path: P) -> Result<DbConfig> {
    let path = path.as_ref();
    let mut config: DbConfig = read_structured(path)?;

    if !config.kind.eq_ignore_ascii_case("sqlite") {
        return Err(Error::InvalidConfig(format!(
            "unsupported database type '{}'",
            config.kind
        )));
    }

    if config.path.is_relative() {
        if let Some(dir) = path.parent() {
            config.path = dir.join(&config.path);
        }
    }
    Ok(config)
}
