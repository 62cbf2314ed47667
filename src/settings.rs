// Runtime-mutable session enforcement settings

use crate::error::Result;
use crate::signals::{AuthSignals, SettingChanged};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Settings consumed by the enforcement listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    SingleUserSession,
    LogoutAllSessions,
}

impl SettingKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::SingleUserSession => "SINGLE_USER_SESSION",
            SettingKey::LogoutAllSessions => "LOGOUT_ALL_SESSIONS",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flag value: either a plain boolean or a dotted path naming a registered predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Path(String),
}

impl SettingValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            SettingValue::Bool(enabled) => *enabled,
            SettingValue::Path(path) => !path.is_empty(),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Path(value.to_string())
    }
}

/// Session enforcement flags. Unset values behave as enabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default)]
    pub single_user_session: Option<SettingValue>,
    #[serde(default)]
    pub logout_all_sessions: Option<SettingValue>,
}

impl SessionSettings {
    pub fn get(&self, key: SettingKey) -> Option<&SettingValue> {
        match key {
            SettingKey::SingleUserSession => self.single_user_session.as_ref(),
            SettingKey::LogoutAllSessions => self.logout_all_sessions.as_ref(),
        }
    }

    fn slot(&mut self, key: SettingKey) -> &mut Option<SettingValue> {
        match key {
            SettingKey::SingleUserSession => &mut self.single_user_session,
            SettingKey::LogoutAllSessions => &mut self.logout_all_sessions,
        }
    }

    /// Whether logging out should drop every session of the user
    pub fn logout_all_enabled(&self) -> bool {
        self.logout_all_sessions
            .as_ref()
            .map(SettingValue::is_truthy)
            .unwrap_or(true)
    }
}

/// Shared handle over the live settings
#[derive(Debug, Clone, Default)]
pub struct SettingsHandle {
    inner: Arc<RwLock<SessionSettings>>,
}

impl SettingsHandle {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    pub async fn snapshot(&self) -> SessionSettings {
        self.inner.read().await.clone()
    }

    pub async fn get(&self, key: SettingKey) -> Option<SettingValue> {
        self.inner.read().await.get(key).cloned()
    }

    /// Replace a value without notifying anyone, returning the previous one
    pub async fn set(&self, key: SettingKey, value: Option<SettingValue>) -> Option<SettingValue> {
        let mut settings = self.inner.write().await;
        std::mem::replace(settings.slot(key), value)
    }

    /// Change a setting and announce it on `setting_changed`.
    /// The returned guard puts the previous value back when restored.
    pub async fn override_setting(
        &self,
        signals: &AuthSignals,
        key: SettingKey,
        value: SettingValue,
    ) -> Result<SettingOverride> {
        let previous = self.set(key, Some(value.clone())).await;
        debug!("Overriding setting {} with {:?}", key, value);

        let announced = signals
            .setting_changed
            .send(&SettingChanged {
                setting: key,
                value: Some(value),
                enter: true,
            })
            .await;

        if let Err(e) = announced {
            warn!("Override of {} rejected, keeping previous value: {}", key, e);
            self.set(key, previous).await;
            return Err(e);
        }

        Ok(SettingOverride {
            handle: self.clone(),
            key,
            previous,
        })
    }
}

/// Pending override created by [`SettingsHandle::override_setting`]
#[must_use = "call restore() to put the previous value back"]
#[derive(Debug)]
pub struct SettingOverride {
    handle: SettingsHandle,
    key: SettingKey,
    previous: Option<SettingValue>,
}

impl SettingOverride {
    pub async fn restore(self, signals: &AuthSignals) -> Result<()> {
        self.handle.set(self.key, self.previous.clone()).await;
        debug!("Restored setting {} to {:?}", self.key, self.previous);

        signals
            .setting_changed
            .send(&SettingChanged {
                setting: self.key,
                value: self.previous,
                enter: false,
            })
            .await
    }
}
