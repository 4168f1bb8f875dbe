use std::fs;
use std::path::{Path, PathBuf};

use crate::ops::access::Session;

fn session_path(log_dir: &Path) -> PathBuf {
    log_dir.join(".session.json")
}

/// Read the logged-in session from .session.json, if any
pub fn read_session(log_dir: &Path) -> Option<Session> {
    let content = fs::read_to_string(session_path(log_dir)).ok()?;
    match serde_json::from_str(&content) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable session file");
            None
        }
    }
}

/// Write .session.json to the log directory
pub fn write_session(log_dir: &Path, session: &Session) -> Result<(), std::io::Error> {
    let content = serde_json::to_string_pretty(session)?;
    fs::write(session_path(log_dir), content)
}

/// Remove .session.json. Returns whether a session existed.
pub fn clear_session(log_dir: &Path) -> Result<bool, std::io::Error> {
    match fs::remove_file(session_path(log_dir)) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
