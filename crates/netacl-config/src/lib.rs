//! Configuration management for netacl
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (NETACL_* prefix, highest precedence)
//! 2. netacl.local.toml (gitignored, local overrides)
//! 3. netacl.toml (git-tracked, project config)
//! 4. ~/.config/netacl/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! A configuration declares the default policy and an ordered rule list:
//!
//! ```toml
//! default_policy = "deny"
//! audit = true
//!
//! [[rules]]
//! network = "10.0.0.0/8"
//! policy = "allow"
//!
//! [[rules]]
//! network = "10.1.0.0/16"
//! policy = "deny"
//! ```

use std::fs;
use std::path::Path;

use anyhow::Result;
use netacl::{AccessList, NetworkAddress, RuleRecord};
use serde::{Deserialize, Serialize};
use tracing::info;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main netacl configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AclConfig {
    /// Answer for addresses no rule covers.
    pub default_policy: Policy,
    /// Log every rule change at info level.
    pub audit: bool,
    /// Rules in insertion order.
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    Allow,
    #[default]
    Deny,
}

impl Policy {
    pub fn as_bool(self) -> bool {
        matches!(self, Self::Allow)
    }
}

impl From<bool> for Policy {
    fn from(allowed: bool) -> Self {
        if allowed { Self::Allow } else { Self::Deny }
    }
}

/// Rule definition from config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// CIDR text such as `192.168.0.0/16` or `2001:db8::/32`.
    pub network: String,
    pub policy: Policy,
}

impl AclConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Read a single TOML file, without layering or environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses every rule, stopping at the first one that is not valid CIDR.
    pub fn validate(&self) -> Result<Vec<RuleRecord>, ConfigError> {
        self.rules
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                let network = NetworkAddress::parse_cidr(&rule.network).map_err(|source| {
                    ConfigError::InvalidRule {
                        index,
                        network: rule.network.clone(),
                        source,
                    }
                })?;
                Ok(RuleRecord {
                    network,
                    policy: rule.policy.as_bool(),
                })
            })
            .collect()
    }

    /// Builds the access list described by this configuration.
    pub fn build(&self) -> Result<AccessList, ConfigError> {
        let records = self.validate()?;

        let mut list = AccessList::new(self.default_policy.as_bool());
        if !self.audit {
            list = list.without_audit();
        }
        for (index, record) in records.iter().enumerate() {
            list.add_network(record.network, record.policy)
                .map_err(|source| ConfigError::InvalidRule {
                    index,
                    network: record.network.to_string(),
                    source,
                })?;
        }

        info!(
            default_policy = self.default_policy.as_bool(),
            rules = records.len(),
            audit = self.audit,
            "access list built from configuration"
        );

        Ok(list)
    }
}
