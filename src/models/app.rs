use super::user::User;
use crate::session::{MAX_SESSION_TTL_SECS, SessionConfig};
use crate::settings::SessionSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Application configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Session enforcement flags
    #[serde(default)]
    pub session: SessionSettings,
    /// Session lifetime in seconds (default: two weeks)
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: i64,
    /// Users known to the demo host
    #[serde(default)]
    pub users: Vec<User>,
}

fn default_session_ttl() -> i64 {
    SessionConfig::default().ttl_secs
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session: SessionSettings::default(),
            session_ttl_secs: default_session_ttl(),
            users: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            ttl_secs: self.session_ttl_secs,
        }
    }

    pub fn find_user(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username == username)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.session_ttl_secs <= 0 {
            return Err("session_ttl_secs must be positive".to_string());
        }
        if self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(format!(
                "session_ttl_secs must not exceed {} (ten years)",
                MAX_SESSION_TTL_SECS
            ));
        }

        let mut seen = HashSet::new();
        for user in &self.users {
            if user.username.is_empty() {
                return Err(format!("User '{}' must have a username", user.id));
            }
            if !seen.insert(user.username.as_str()) {
                return Err(format!("Duplicate username '{}'", user.username));
            }
        }

        Ok(())
    }
}
