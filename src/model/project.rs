use std::path::PathBuf;

use super::config::LogConfig;

/// A discovered task log project
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of `tasklog/`)
    pub root: PathBuf,
    /// Path to the `tasklog/` directory
    pub log_dir: PathBuf,
    /// Parsed tasklog.toml
    pub config: LogConfig,
}

impl Project {
    /// Directory holding one CSV file per destination id
    pub fn sheets_dir(&self) -> PathBuf {
        self.log_dir.join("sheets")
    }
}
