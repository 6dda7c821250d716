//! Configuration Management
//!
//! The sweep configuration is a YAML file selecting regions and resource
//! types and carrying per-type settings:
//!
//! ```yaml
//! regions:
//!   - global
//!   - us-central1
//! resource_types:
//!   excludes:
//!     - StorageBucket
//! settings:
//!   IAMServiceAccount:
//!     DeleteDefaultServiceAccounts: false
//! ```
//!
//! An absent file means the defaults: every region, every type, no settings.

use crate::gcp::Environment;
use crate::sweep::{ConfigError, Registry, Settings};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Region name that expands to every discovered region
const ALL_REGIONS: &str = "all";

/// Sweep configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Regions to sweep; empty or containing "all" means every region
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub resource_types: TypeSelection,
    /// Per-type settings injected into resources before filtering
    #[serde(default)]
    pub settings: HashMap<String, Settings>,
}

/// Resource type include/exclude lists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeSelection {
    /// Only sweep these types; empty means all registered types
    #[serde(default)]
    pub includes: Vec<String>,
    /// Never sweep these types
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl SweepConfig {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gcpsweep").join("config.yaml"))
    }

    /// Load configuration from a YAML file.
    ///
    /// Unlike an absent file, a file that fails to parse is an error: a
    /// teardown must not run on half-read intent.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Check every type name in the selection against the registry
    pub fn validate_types(&self, registry: &Registry) -> Result<(), ConfigError> {
        for kind in self
            .resource_types
            .includes
            .iter()
            .chain(&self.resource_types.excludes)
        {
            if !registry.contains(kind) {
                return Err(ConfigError::UnknownResourceType(kind.clone()));
            }
        }
        Ok(())
    }

    /// The set of types to sweep, or `None` when everything is in scope
    pub fn selected_types(&self, registry: &Registry) -> Option<HashSet<String>> {
        let selection = &self.resource_types;
        if selection.includes.is_empty() && selection.excludes.is_empty() {
            return None;
        }

        let base: Vec<String> = if selection.includes.is_empty() {
            registry.kinds().iter().map(|k| k.to_string()).collect()
        } else {
            selection.includes.clone()
        };

        Some(
            base.into_iter()
                .filter(|kind| !selection.excludes.contains(kind))
                .collect(),
        )
    }

    /// Resolve the region list against the discovered environment.
    ///
    /// Empty and "all" both expand to every region the environment knows.
    /// Explicit names must exist; duplicates collapse, order is kept.
    pub fn resolve_regions(&self, env: &Environment) -> Result<Vec<String>, ConfigError> {
        if self.regions.is_empty() || self.regions.iter().any(|r| r == ALL_REGIONS) {
            return Ok(env.regions().to_vec());
        }

        let mut resolved = Vec::new();
        for region in &self.regions {
            if !env.has_region(region) {
                return Err(ConfigError::UnknownRegion(region.clone()));
            }
            if !resolved.contains(region) {
                resolved.push(region.clone());
            }
        }
        Ok(resolved)
    }

    pub fn settings_for(&self, kind: &str) -> Option<&Settings> {
        self.settings.get(kind)
    }
}
