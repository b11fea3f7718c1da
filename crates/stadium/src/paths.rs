use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;
use sceneconfig::CONFIG_FILE_NAME;

pub const ENV_CONFIG_DIR: &str = "STADIUM_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Stadium";
const APPLICATION: &str = "stadium";

/// Where the configuration file is expected, and how that was decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    pub path: PathBuf,
    /// The path was named on the command line, so it must exist.
    pub explicit: bool,
}

impl ConfigLocation {
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self {
                path: path.to_path_buf(),
                explicit: true,
            });
        }
        Ok(Self {
            path: config_dir()?.join(CONFIG_FILE_NAME),
            explicit: false,
        })
    }
}

fn config_dir() -> Result<PathBuf> {
    if let Some(value) = env_override(ENV_CONFIG_DIR) {
        return Ok(value);
    }
    let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
        .ok_or_else(|| anyhow!("failed to determine user directories"))?;
    Ok(project_dirs.config_dir().to_path_buf())
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}
