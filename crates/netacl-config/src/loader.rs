//! Layered loading: defaults, config files, then environment

use crate::{AclConfig, Paths};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Builds an [`AclConfig`] from every configured source.
///
/// Files are merged in the order [`Paths::layers`] returns them and
/// `NETACL_*` variables win over all files. The merged rules are parsed
/// before `load` returns, so a bad CIDR is reported with its rule index at
/// load time rather than when the list is built.
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    env_source: Option<config::Map<String, String>>,
}

impl ConfigLoader {
    /// Loader rooted at the current directory.
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "NETACL".to_string(),
            env_source: None,
        }
    }

    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "NETACL")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Reads variables from `vars` instead of the process environment.
    pub fn with_env_source(mut self, vars: config::Map<String, String>) -> Self {
        self.env_source = Some(vars);
        self
    }

    pub fn load(self) -> Result<AclConfig> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&AclConfig::default())?);

        for layer in Paths::new().layers(&self.project_dir) {
            debug!(path = %layer.display(), "merging config layer");
            builder = builder.add_source(
                config::File::from(layer).format(config::FileFormat::Toml),
            );
        }

        // NETACL_DEFAULT_POLICY, NETACL_AUDIT: field names contain
        // underscores, so nesting uses a double one.
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(self.env_source),
        );

        let acl_config: AclConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        let rules = acl_config
            .validate()
            .with_context(|| format!("Invalid rules under {}", self.project_dir.display()))?;
        debug!(
            default_policy = acl_config.default_policy.as_bool(),
            rules = rules.len(),
            "configuration loaded"
        );

        Ok(acl_config)
    }

    /// Load configuration, falling back to defaults (deny everything) on any error
    pub fn load_or_default(self) -> AclConfig {
        self.load().unwrap_or_else(|error| {
            warn!(error = %format!("{error:#}"), "using default configuration");
            AclConfig::default()
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfigError, Policy, RuleConfig};
    use std::fs;
    use tempfile::tempdir;

    fn loader(project_dir: &Path) -> ConfigLoader {
        ConfigLoader::new()
            .with_project_dir(project_dir)
            .with_env_source(config::Map::new())
    }

    fn env(vars: &[(&str, &str)]) -> config::Map<String, String> {
        vars.iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = loader(temp_dir.path()).load().expect("Failed to load config");

        assert_eq!(config.default_policy, Policy::Deny);
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_load_project_rules() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        let config_content = r#"
default_policy = "allow"
audit = true

[[rules]]
network = "10.0.0.0/8"
policy = "deny"

[[rules]]
network = "2001:db8::/32"
policy = "deny"
"#;
        fs::write(project_dir.join("netacl.toml"), config_content)
            .expect("Failed to write config");

        let config = loader(project_dir).load().expect("Failed to load config");

        assert_eq!(config.default_policy, Policy::Allow);
        assert!(config.audit);
        assert_eq!(
            config.rules,
            vec![
                RuleConfig {
                    network: "10.0.0.0/8".to_string(),
                    policy: Policy::Deny,
                },
                RuleConfig {
                    network: "2001:db8::/32".to_string(),
                    policy: Policy::Deny,
                },
            ]
        );

        let list = config.build().expect("Failed to build access list");
        assert!(!list.check_access("10.9.8.7").unwrap());
        assert!(list.check_access("11.0.0.1").unwrap());
    }

    #[test]
    fn test_local_overrides_default_policy() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("netacl.toml"),
            r#"
default_policy = "deny"

[[rules]]
network = "192.168.0.0/16"
policy = "allow"
"#,
        )
        .expect("Failed to write project config");
        fs::write(project_dir.join("netacl.local.toml"), "default_policy = \"allow\"\n")
            .expect("Failed to write local config");

        let config = loader(project_dir).load().expect("Failed to load config");

        // Local file flips the default, rules come from the project file
        assert_eq!(config.default_policy, Policy::Allow);
        assert_eq!(config.rules.len(), 1);
    }

    #[test]
    fn test_env_overrides_top_level_fields() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();
        fs::write(project_dir.join("netacl.toml"), "default_policy = \"deny\"\n")
            .expect("Failed to write config");

        let config = loader(project_dir)
            .with_env_source(env(&[
                ("NETACL_DEFAULT_POLICY", "allow"),
                ("NETACL_AUDIT", "true"),
            ]))
            .load()
            .expect("Failed to load config");

        assert_eq!(config.default_policy, Policy::Allow);
        assert!(config.audit);
    }

    #[test]
    fn test_env_with_other_prefix_is_ignored() {
        let temp_dir = tempdir().expect("Failed to create temp dir");

        let config = loader(temp_dir.path())
            .with_env_source(env(&[
                ("OTHER_DEFAULT_POLICY", "allow"),
                ("NETACLX_AUDIT", "true"),
            ]))
            .load()
            .expect("Failed to load config");

        assert_eq!(config, AclConfig::default());
    }

    #[test]
    fn test_bad_rule_fails_at_load_time() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();
        fs::write(
            project_dir.join("netacl.toml"),
            r#"
[[rules]]
network = "10.0.0.0/8"
policy = "allow"

[[rules]]
network = "10.0.0.300/24"
policy = "deny"
"#,
        )
        .expect("Failed to write config");

        let err = loader(project_dir).load().unwrap_err();
        match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::InvalidRule { index, network, .. }) => {
                assert_eq!(*index, 1);
                assert_eq!(network, "10.0.0.300/24");
            }
            other => panic!("expected InvalidRule, got {other:?}"),
        }

        assert_eq!(loader(project_dir).load_or_default(), AclConfig::default());
    }

    #[test]
    fn test_unknown_policy_falls_back_to_default() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();
        fs::write(project_dir.join("netacl.toml"), "default_policy = \"sometimes\"")
            .expect("Failed to write config");

        assert!(loader(project_dir).load().is_err());
        assert_eq!(loader(project_dir).load_or_default(), AclConfig::default());
    }
}
