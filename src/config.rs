//! Provider configuration
//!
//! Settings are layered: `config.toml` in the config directory, then
//! `NETBOX_*` environment variables, then command-line flags.

use anyhow::{Context, Result, bail};
use netbox::ClientConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths;

pub const ENV_SERVER_URL: &str = "NETBOX_SERVER_URL";
pub const ENV_API_TOKEN: &str = "NETBOX_API_TOKEN";
pub const ENV_REQUEST_TIMEOUT: &str = "NETBOX_REQUEST_TIMEOUT";
pub const ENV_ALLOW_INSECURE_HTTPS: &str = "NETBOX_ALLOW_INSECURE_HTTPS";
pub const ENV_SKIP_VERSION_CHECK: &str = "NETBOX_SKIP_VERSION_CHECK";
pub const ENV_STRIP_TRAILING_SLASHES: &str = "NETBOX_STRIP_TRAILING_SLASHES_FROM_URL";
pub const ENV_HEADERS: &str = "NETBOX_HEADERS";

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub server_url: Option<String>,
    pub api_token: Option<String>,
    /// Seconds
    pub request_timeout: Option<u64>,
    pub allow_insecure_https: Option<bool>,
    pub skip_version_check: Option<bool>,
    pub strip_trailing_slashes: Option<bool>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Default manifest file or directory
    pub manifest: Option<String>,
    /// Default state file
    pub state_file: Option<String>,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub server_url: Option<String>,
    pub api_token: Option<String>,
    pub insecure: bool,
    pub skip_version_check: bool,
}

impl Settings {
    /// Path of the config file
    pub fn path() -> Result<PathBuf> {
        Ok(paths::config_dir()?.join("config.toml"))
    }

    /// Load settings from a file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Config file {} does not exist", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Load from the file, the process environment and the command line
    pub fn resolve(overrides: &Overrides) -> Result<Self> {
        let mut settings = Self::load_from(&Self::path()?)?;
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.apply_overrides(overrides);
        Ok(settings)
    }

    /// Apply `NETBOX_*` variables from `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_SERVER_URL) {
            self.server_url = Some(url);
        }
        if let Some(token) = lookup(ENV_API_TOKEN) {
            self.api_token = Some(token);
        }
        if let Some(timeout) = lookup(ENV_REQUEST_TIMEOUT) {
            let secs = timeout
                .trim()
                .parse()
                .with_context(|| format!("{ENV_REQUEST_TIMEOUT} must be a number of seconds"))?;
            self.request_timeout = Some(secs);
        }
        if let Some(value) = lookup(ENV_ALLOW_INSECURE_HTTPS) {
            self.allow_insecure_https = Some(parse_bool(ENV_ALLOW_INSECURE_HTTPS, &value)?);
        }
        if let Some(value) = lookup(ENV_SKIP_VERSION_CHECK) {
            self.skip_version_check = Some(parse_bool(ENV_SKIP_VERSION_CHECK, &value)?);
        }
        if let Some(value) = lookup(ENV_STRIP_TRAILING_SLASHES) {
            self.strip_trailing_slashes = Some(parse_bool(ENV_STRIP_TRAILING_SLASHES, &value)?);
        }
        if let Some(headers) = lookup(ENV_HEADERS) {
            let parsed: BTreeMap<String, String> = serde_json::from_str(&headers)
                .with_context(|| format!("{ENV_HEADERS} must be a JSON object of strings"))?;
            self.headers.extend(parsed);
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(url) = &overrides.server_url {
            self.server_url = Some(url.clone());
        }
        if let Some(token) = &overrides.api_token {
            self.api_token = Some(token.clone());
        }
        if overrides.insecure {
            self.allow_insecure_https = Some(true);
        }
        if overrides.skip_version_check {
            self.skip_version_check = Some(true);
        }
    }

    /// Client configuration; fails when the server or token is missing
    pub fn client_config(&self) -> Result<ClientConfig> {
        let Some(url) = self.server_url.as_deref().filter(|u| !u.trim().is_empty()) else {
            bail!("NetBox server URL is not set (use --server, {ENV_SERVER_URL} or config.toml)");
        };
        let Some(token) = self.api_token.as_deref().filter(|t| !t.trim().is_empty()) else {
            bail!("NetBox API token is not set (use --token, {ENV_API_TOKEN} or config.toml)");
        };

        let mut config = ClientConfig::new(url, token);
        if let Some(secs) = self.request_timeout {
            config.request_timeout = Duration::from_secs(secs);
        }
        config.allow_insecure_https = self.allow_insecure_https.unwrap_or(false);
        config.strip_trailing_slashes = self.strip_trailing_slashes.unwrap_or(true);
        config.headers = self.headers.clone();
        Ok(config)
    }

    pub fn skip_version_check(&self) -> bool {
        self.skip_version_check.unwrap_or(false)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("{name} must be true or false, got '{other}'"),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
server_url = "https://netbox.example.com"
api_token = "file-token"
request_timeout = 30

[headers]
X-Tenant = "ops"
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.request_timeout, Some(30));
        assert_eq!(settings.headers["X-Tenant"], "ops");

        let config = settings.client_config().unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.strip_trailing_slashes);
        assert!(!config.allow_insecure_https);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "server = \"x\"\n").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides_file_and_flags_override_env() {
        let mut settings = Settings {
            server_url: Some("https://file".into()),
            api_token: Some("file-token".into()),
            ..Default::default()
        };

        settings
            .apply_env(env(&[
                (ENV_SERVER_URL, "https://env"),
                (ENV_ALLOW_INSECURE_HTTPS, "true"),
                (ENV_STRIP_TRAILING_SLASHES, "false"),
                (ENV_HEADERS, r#"{"X-Env": "1"}"#),
            ]))
            .unwrap();
        assert_eq!(settings.server_url.as_deref(), Some("https://env"));
        assert_eq!(settings.api_token.as_deref(), Some("file-token"));

        settings.apply_overrides(&Overrides {
            server_url: Some("https://flag".into()),
            skip_version_check: true,
            ..Default::default()
        });

        let config = settings.client_config().unwrap();
        assert_eq!(config.server_url, "https://flag");
        assert!(config.allow_insecure_https);
        assert!(!config.strip_trailing_slashes);
        assert_eq!(config.headers["X-Env"], "1");
        assert!(settings.skip_version_check());
    }

    #[test]
    fn test_invalid_env_values() {
        let mut settings = Settings::default();
        assert!(
            settings
                .apply_env(env(&[(ENV_REQUEST_TIMEOUT, "soon")]))
                .is_err()
        );
        assert!(
            settings
                .apply_env(env(&[(ENV_SKIP_VERSION_CHECK, "maybe")]))
                .is_err()
        );
        assert!(settings.apply_env(env(&[(ENV_HEADERS, "[1]")])).is_err());
    }

    #[test]
    fn test_missing_credentials() {
        let settings = Settings {
            server_url: Some("https://netbox".into()),
            ..Default::default()
        };
        let err = settings.client_config().unwrap_err();
        assert!(err.to_string().contains("token"));
        assert!(Settings::default().client_config().is_err());
    }
}
