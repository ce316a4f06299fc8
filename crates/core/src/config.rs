//! Operator configuration.
//!
//! The config declares which APIServices the operator keeps registered and the
//! operand settings shared by all of them. It is read from TOML or YAML, chosen
//! by file extension:
//!
//! ```toml
//! component = "openshift-apiserver"
//! operand_version = "4.2.0"
//!
//! [[api_services]]
//! group = "apps.openshift.io"
//! version = "v1"
//! ```

use std::path::Path;
use std::time::Duration;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::result::Result;

/// Default minimum priority for an APIService's group.
pub const DEFAULT_GROUP_PRIORITY_MINIMUM: i32 = 9900;

/// Default priority of a version within its group.
pub const DEFAULT_VERSION_PRIORITY: i32 = 15;

/// Supported on-disk config formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Detect the format from a file extension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// One APIService the operator should keep registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiServiceEntry {
    pub group: String,
    pub version: String,
    #[serde(default)]
    pub group_priority_minimum: Option<i32>,
    #[serde(default)]
    pub version_priority: Option<i32>,
}

impl ApiServiceEntry {
    /// Identity of the APIService object, `<version>.<group>`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.version, self.group)
    }

    pub fn group_priority_minimum(&self) -> i32 {
        self.group_priority_minimum
            .unwrap_or(DEFAULT_GROUP_PRIORITY_MINIMUM)
    }

    pub fn version_priority(&self) -> i32 {
        self.version_priority.unwrap_or(DEFAULT_VERSION_PRIORITY)
    }
}

/// Top-level operator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Component name used when recording the reconciled version.
    #[serde(default = "default_component")]
    pub component: String,
    /// Operand version recorded once every APIService is available.
    pub operand_version: String,
    /// Namespace of the service backing the APIServices.
    #[serde(default = "default_target_namespace")]
    pub target_namespace: String,
    /// Name of the service backing the APIServices.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    /// Consecutive failed passes before the loop gives up.
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: usize,
    pub api_services: Vec<ApiServiceEntry>,
}

fn default_component() -> String {
    "openshift-apiserver".to_string()
}

fn default_target_namespace() -> String {
    "openshift-apiserver".to_string()
}

fn default_service_name() -> String {
    "api".to_string()
}

const fn default_sync_interval_secs() -> u64 {
    30
}

const fn default_max_consecutive_errors() -> usize {
    10
}

impl OperatorConfig {
    /// Load and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, has an unknown extension,
    /// fails to parse, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path)?;
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::file_read_failed(path, e.to_string()))?;
        let config = Self::parse(&raw, format)?;
        tracing::debug!(
            path = %path.display(),
            api_services = config.api_services.len(),
            "Loaded operator config"
        );
        Ok(config)
    }

    /// Parse and validate config text in the given format.
    ///
    /// # Errors
    ///
    /// Returns a parse error or [`Error::InvalidConfig`].
    pub fn parse(raw: &str, format: ConfigFormat) -> Result<Self> {
        let config: Self = match format {
            ConfigFormat::Toml => toml::from_str(raw).map_err(|e| Error::TomlParseFailed {
                reason: e.to_string(),
            })?,
            ConfigFormat::Yaml => {
                serde_yaml::from_str(raw).map_err(|e| Error::YamlParseFailed {
                    reason: e.to_string(),
                })?
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the reconciler relies on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.api_services.is_empty() {
            return Err(Error::invalid_config("api_services must not be empty"));
        }
        if self.operand_version.trim().is_empty() {
            return Err(Error::invalid_config("operand_version must not be empty"));
        }
        if self.sync_interval_secs == 0 {
            return Err(Error::invalid_config(
                "sync_interval_secs must be greater than zero",
            ));
        }
        if let Some(entry) = self
            .api_services
            .iter()
            .find(|e| e.group.trim().is_empty() || e.version.trim().is_empty())
        {
            return Err(Error::invalid_config(format!(
                "api service entry '{}' needs both group and version",
                entry.name()
            )));
        }
        let duplicates = self
            .api_services
            .iter()
            .map(ApiServiceEntry::name)
            .duplicates()
            .sorted()
            .collect_vec();
        if !duplicates.is_empty() {
            return Err(Error::invalid_config(format!(
                "duplicate api services: {}",
                duplicates.join(", ")
            )));
        }
        Ok(())
    }

    pub const fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }
}
