//! Server configuration.
//!
//! Configuration is read from `~/.config/appshell/config.json` (missing file
//! means defaults) and then overridden by `APPSHELL_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::account::USERS_COLLECTION;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "appshell";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Callable invocations allowed in flight at once.
const DEFAULT_MAX_INSTANCES: usize = 10;

const DEFAULT_BIND: &str = "0.0.0.0:8080";

const DEFAULT_ORIGIN: &str = "http://127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the server listens on
    pub bind: String,
    /// Upstream origin serving the web app build
    pub origin: String,
    /// Document store base URL; in-memory store when unset
    pub document_url: Option<String>,
    /// Auth store base URL; in-memory store when unset
    pub auth_url: Option<String>,
    /// Bearer token sent to both stores
    pub token: Option<String>,
    pub users_collection: String,
    /// Build-time asset manifest (JSON object keyed by URL)
    pub manifest_path: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub max_instances: usize,
    /// Daily-rolling log files go here when set
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            document_url: None,
            auth_url: None,
            token: None,
            users_collection: USERS_COLLECTION.to_string(),
            manifest_path: None,
            cache_dir: None,
            max_instances: DEFAULT_MAX_INSTANCES,
            log_dir: None,
        }
    }
}

impl Config {
    /// Load the config file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            debug!(?path, "Config file loaded");
            Ok(config)
        } else {
            info!(?path, "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Rewrite the file at `path` with every field filled in.
    ///
    /// Only the file's own values are written; `APPSHELL_*` overrides such as
    /// the store token stay in the environment.
    pub fn write_file_config(path: &Path) -> Result<Self> {
        let config = Self::load_file(path)?;
        config.save_to(path)?;
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Override fields from `APPSHELL_*` variables as returned by `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(bind) = var("APPSHELL_BIND") {
            self.bind = bind;
        }
        if let Some(origin) = var("APPSHELL_ORIGIN") {
            self.origin = origin;
        }
        if let Some(url) = var("APPSHELL_DOCUMENT_URL") {
            self.document_url = Some(url);
        }
        if let Some(url) = var("APPSHELL_AUTH_URL") {
            self.auth_url = Some(url);
        }
        if let Some(token) = var("APPSHELL_TOKEN") {
            self.token = Some(token);
        }
        if let Some(collection) = var("APPSHELL_USERS_COLLECTION") {
            self.users_collection = collection;
        }
        if let Some(path) = var("APPSHELL_MANIFEST") {
            self.manifest_path = Some(PathBuf::from(path));
        }
        if let Some(path) = var("APPSHELL_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(path));
        }
        if let Some(value) = var("APPSHELL_MAX_INSTANCES") {
            self.max_instances = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid APPSHELL_MAX_INSTANCES value: {}", value))?;
        }
        if let Some(path) = var("APPSHELL_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(path));
        }

        if self.max_instances == 0 {
            anyhow::bail!("max_instances must be at least 1");
        }
        Ok(())
    }

    /// Offline cache location, defaulting to the user cache directory
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.max_instances, 10);
        assert_eq!(config.users_collection, "users");
        assert!(config.document_url.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"origin": "https://app.example.com", "max_instances": 4}"#).unwrap();

        let config = Config::load_file(&path).unwrap();
        assert_eq!(config.origin, "https://app.example.com");
        assert_eq!(config.max_instances, 4);
        assert_eq!(config.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_file(&dir.path().join("none.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(Config::load_file(&path).is_err());
    }

    #[test]
    fn test_write_file_config_keeps_env_values_off_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("appshell").join("config.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"origin": "https://app.example.com"}"#).unwrap();

        let mut effective = Config::load_file(&path).unwrap();
        effective
            .apply_overrides(env(&[("APPSHELL_TOKEN", "s3cret")]))
            .unwrap();
        assert_eq!(effective.token.as_deref(), Some("s3cret"));

        let written = Config::write_file_config(&path).unwrap();
        assert!(written.token.is_none());

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("s3cret"));
        assert_eq!(Config::load_file(&path).unwrap(), written);
        assert_eq!(written.origin, "https://app.example.com");
        assert_eq!(written.max_instances, 10);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("APPSHELL_BIND", "127.0.0.1:9999"),
                ("APPSHELL_AUTH_URL", "http://auth.internal/v1"),
                ("APPSHELL_MAX_INSTANCES", " 3 "),
                ("APPSHELL_CACHE_DIR", "/tmp/appshell-cache"),
                ("APPSHELL_TOKEN", ""),
            ]))
            .unwrap();

        assert_eq!(config.bind, "127.0.0.1:9999");
        assert_eq!(config.auth_url.as_deref(), Some("http://auth.internal/v1"));
        assert_eq!(config.max_instances, 3);
        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/tmp/appshell-cache"));
        // Empty values are ignored
        assert!(config.token.is_none());
    }

    #[test]
    fn test_invalid_max_instances() {
        let mut config = Config::default();
        assert!(config
            .apply_overrides(env(&[("APPSHELL_MAX_INSTANCES", "many")]))
            .is_err());

        let mut config = Config::default();
        assert!(config
            .apply_overrides(env(&[("APPSHELL_MAX_INSTANCES", "0")]))
            .is_err());
    }
}
