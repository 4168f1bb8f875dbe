use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::config::{LogConfig, UserConfig};

pub const VIEW_ALL_TASKS: &str = "view_all_tasks";
pub const ADD_NEW_TASK: &str = "add_new_task";
pub const EDIT_OWN_TASK: &str = "edit_own_task";
pub const DELETE_TASK: &str = "delete_task";
pub const SEARCH_TASK: &str = "search_task";
pub const PROCESS_DEADLINE_TASKS: &str = "process_deadline_tasks";
pub const GET_OVERDUE_TASKS: &str = "get_overdue_tasks";
pub const ACCESS_ADMIN_DASHBOARD: &str = "access_admin_dashboard";
pub const ACCESS_REPORTS_PAGE: &str = "access_reports_page";

const ALL_ROLES: &[&str] = &["admin", "manager", "employee"];

/// Built-in feature → roles table
const DEFAULT_PERMISSIONS: &[(&str, &[&str])] = &[
    (VIEW_ALL_TASKS, &["admin"]),
    (ADD_NEW_TASK, &["admin"]),
    (EDIT_OWN_TASK, ALL_ROLES),
    (DELETE_TASK, &["admin"]),
    (SEARCH_TASK, ALL_ROLES),
    (PROCESS_DEADLINE_TASKS, ALL_ROLES),
    (GET_OVERDUE_TASKS, ALL_ROLES),
    (ACCESS_ADMIN_DASHBOARD, &["admin"]),
    (ACCESS_REPORTS_PAGE, &["admin", "manager"]),
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("incorrect username or password")]
    BadCredentials,
    #[error("not logged in: run `tl login <user>` first")]
    NotLoggedIn,
    #[error("access denied: role '{role}' may not use {feature}")]
    Denied { feature: String, role: String },
}

/// A logged-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub role: String,
}

/// Which roles may use which features
#[derive(Debug, Clone)]
pub struct Permissions {
    table: HashMap<String, Vec<String>>,
}

impl Default for Permissions {
    fn default() -> Self {
        let table = DEFAULT_PERMISSIONS
            .iter()
            .map(|(feature, roles)| {
                (
                    feature.to_string(),
                    roles.iter().map(|r| r.to_string()).collect(),
                )
            })
            .collect();
        Permissions { table }
    }
}

impl Permissions {
    /// Built-in table with the config's `[permissions]` entries layered on top.
    pub fn from_config(config: &LogConfig) -> Self {
        let mut perms = Permissions::default();
        for (feature, roles) in &config.permissions {
            perms.table.insert(feature.clone(), roles.clone());
        }
        perms
    }

    /// Whether `role` may use `feature_key`. Unknown features are denied.
    pub fn is_authorized(&self, feature_key: &str, role: &str) -> bool {
        match self.table.get(feature_key) {
            Some(roles) => roles.iter().any(|r| r == role),
            None => {
                tracing::warn!(feature = feature_key, "no permission entry configured; denying");
                false
            }
        }
    }

    /// `Ok` when the session exists and its role may use `feature_key`.
    pub fn require<'a>(
        &self,
        feature_key: &str,
        session: Option<&'a Session>,
    ) -> Result<&'a Session, AuthError> {
        let session = session.ok_or(AuthError::NotLoggedIn)?;
        if self.is_authorized(feature_key, &session.role) {
            Ok(session)
        } else {
            tracing::info!(feature = feature_key, user = %session.username, "access denied");
            Err(AuthError::Denied {
                feature: feature_key.to_string(),
                role: session.role.clone(),
            })
        }
    }
}

/// Hex SHA-256 of a password, as stored in `[users.<name>] password_sha256`.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Check a username/password pair. Usernames are case-insensitive.
pub fn authenticate(
    users: &HashMap<String, UserConfig>,
    username: &str,
    password: &str,
) -> Result<Session, AuthError> {
    let username = username.trim().to_lowercase();
    let user = users
        .iter()
        .find(|(name, _)| name.to_lowercase() == username)
        .map(|(_, u)| u)
        .ok_or(AuthError::BadCredentials)?;
    if !user
        .password_sha256
        .eq_ignore_ascii_case(&hash_password(password))
    {
        return Err(AuthError::BadCredentials);
    }
    Ok(Session {
        username,
        role: user.role.clone(),
    })
}
