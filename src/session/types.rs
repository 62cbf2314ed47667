// Session types and data structures

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Key under which the host stores the authenticated user's id in session data
pub const USER_ID_KEY: &str = "_auth_user_id";

/// Longest accepted session lifetime (ten years)
pub const MAX_SESSION_TTL_SECS: i64 = 315_360_000;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Lifetime of a freshly created session
    pub ttl_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 1_209_600, // two weeks
        }
    }
}

/// Server-side session record owned by the host's session store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub session_key: String,
    pub data: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a session with a fresh random key
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_key(&Uuid::new_v4().simple().to_string(), config)
    }

    pub fn with_key(session_key: &str, config: &SessionConfig) -> Self {
        let now = Utc::now();
        // saturate instead of overflowing for out-of-range lifetimes
        let expires_at = Duration::try_seconds(config.ttl_secs)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            session_key: session_key.to_string(),
            data: HashMap::new(),
            created_at: now,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.data
            .get(USER_ID_KEY)
            .and_then(|id| Uuid::parse_str(id).ok())
    }

    pub fn set_user_id(&mut self, user_id: Uuid) {
        self.data.insert(USER_ID_KEY.to_string(), user_id.to_string());
    }

    pub fn to_info(&self, current_key: Option<&str>) -> SessionInfo {
        SessionInfo {
            session_key: self.session_key.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
            is_current: current_key == Some(self.session_key.as_str()),
        }
    }
}

/// Link between a session and the user that logged in with it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSession {
    pub session_key: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl UserSession {
    pub fn new(session_key: &str, user_id: Uuid) -> Self {
        Self {
            session_key: session_key.to_string(),
            user_id,
            created_at: Utc::now(),
        }
    }
}

/// Session information for display (without session data)
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_key: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_current: bool,
}
