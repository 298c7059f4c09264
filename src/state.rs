use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::{Address, TrackedState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

// ============================================================================
// State Structures
// ============================================================================

/// Tracked state of every managed resource, persisted between runs
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StateFile {
    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,

    /// NetBox server the resources live on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    /// Tracked resources by address
    #[serde(default)]
    pub resources: BTreeMap<Address, TrackedState>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            last_updated: Utc::now(),
            server_url: None,
            resources: BTreeMap::new(),
        }
    }
}

// ============================================================================
// StateFile Implementation
// ============================================================================

impl StateFile {
    /// Default state file path
    pub fn default_path() -> Result<PathBuf> {
        Ok(paths::state_dir()?.join("state.toml"))
    }

    /// Load state from disk, or return default if file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!(
            "Loaded {} tracked resources from {}",
            state.resources.len(),
            path.display()
        );
        Ok(state)
    }

    /// Save state to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(&self).context("Failed to serialize state to TOML")?;

        fs::write(path, &content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Update the last_updated timestamp and save
    pub fn touch(&mut self, path: &Path) -> Result<()> {
        self.last_updated = Utc::now();
        self.save(path)
    }

    /// Refuse to mix resources from two servers in one state file
    pub fn check_server(&mut self, server_url: &str) -> Result<()> {
        match &self.server_url {
            Some(tracked) if tracked != server_url && !self.resources.is_empty() => {
                anyhow::bail!(
                    "State tracks resources on {tracked}, not {server_url}; use a separate state file"
                )
            }
            _ => {
                self.server_url = Some(server_url.to_string());
                Ok(())
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
