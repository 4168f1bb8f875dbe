use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration from tasklog.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub project: ProjectInfo,
    /// Destination id per logical sheet (e.g. `tasks = "family-tasks"`)
    #[serde(default = "default_sheets")]
    pub sheets: IndexMap<String, String>,
    #[serde(default)]
    pub time: TimeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Feature key → allowed roles; entries override the built-in table
    #[serde(default)]
    pub permissions: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub users: HashMap<String, UserConfig>,
}

impl LogConfig {
    /// Destination id of the task sheet
    pub fn task_sheet(&self) -> &str {
        self.sheets
            .get(TASK_SHEET_KEY)
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_TASK_SHEET)
    }
}

pub const TASK_SHEET_KEY: &str = "tasks";
pub const DEFAULT_TASK_SHEET: &str = "family-tasks";

fn default_sheets() -> IndexMap<String, String> {
    let mut sheets = IndexMap::new();
    sheets.insert(TASK_SHEET_KEY.to_string(), DEFAULT_TASK_SHEET.to_string());
    sheets
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    /// Offset of the civil timezone used for stamps and "today".
    /// Default: Asia/Ho_Chi_Minh (UTC+7, no DST)
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        TimeConfig {
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

fn default_utc_offset_hours() -> i32 {
    7
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub role: String,
    /// Hex-encoded SHA-256 of the password
    pub password_sha256: String,
}
