//! Where configuration files live

use crate::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const PROJECT_FILE: &str = "netacl.toml";
const LOCAL_FILE: &str = "netacl.local.toml";

/// XDG user config plus the per-directory rule files.
pub struct Paths {
    project_dirs: Option<ProjectDirs>,
}

impl Paths {
    pub fn new() -> Self {
        Self {
            project_dirs: ProjectDirs::from("com", "netacl", "netacl"),
        }
    }

    /// User-wide defaults (~/.config/netacl/config.toml)
    pub fn user_config_file(&self) -> Result<PathBuf, ConfigError> {
        self.project_dirs
            .as_ref()
            .map(|p| p.config_dir().join("config.toml"))
            .ok_or_else(|| {
                ConfigError::XdgError("Failed to determine user config directory".to_string())
            })
    }

    /// Rule file checked in next to the service (netacl.toml)
    pub fn project_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join(PROJECT_FILE)
    }

    /// Untracked local overrides (netacl.local.toml)
    pub fn local_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join(LOCAL_FILE)
    }

    /// Existing config files for `project_dir`, lowest precedence first.
    ///
    /// A missing user directory is skipped, not an error.
    pub fn layers(&self, project_dir: impl AsRef<Path>) -> Vec<PathBuf> {
        let project_dir = project_dir.as_ref();
        self.user_config_file()
            .ok()
            .into_iter()
            .chain([
                Self::project_config_file(project_dir),
                Self::local_config_file(project_dir),
            ])
            .filter(|path| path.is_file())
            .collect()
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
