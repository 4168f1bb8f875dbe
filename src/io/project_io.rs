use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::LogConfig;
use crate::model::project::Project;

pub const LOG_DIR: &str = "tasklog";
pub const CONFIG_FILE: &str = "tasklog.toml";

/// Error type for project I/O operations
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("not a tasklog project: no tasklog/tasklog.toml found")]
    NotAProject,
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse tasklog.toml: {0}")]
    ConfigParseError(#[from] toml::de::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Walk up from `start` looking for a `tasklog/` directory with a config file.
pub fn discover_project(start: &Path) -> Result<PathBuf, ProjectError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(LOG_DIR).join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(ProjectError::NotAProject);
        }
    }
}

/// Load the project rooted at `root`.
pub fn load_project(root: &Path) -> Result<Project, ProjectError> {
    let log_dir = root.join(LOG_DIR);
    if !log_dir.is_dir() {
        return Err(ProjectError::NotAProject);
    }

    let config_path = log_dir.join(CONFIG_FILE);
    let config_text = fs::read_to_string(&config_path).map_err(|e| ProjectError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;
    let config: LogConfig = toml::from_str(&config_text)?;
    tracing::debug!(root = %root.display(), project = %config.project.name, "project loaded");

    Ok(Project {
        root: root.to_path_buf(),
        log_dir,
        config,
    })
}
