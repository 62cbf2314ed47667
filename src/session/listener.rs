// Signal receivers wiring the enforcer to login, logout and settings events

use super::manager::SessionEnforcer;
use crate::error::Result;
use crate::settings::SettingKey;
use crate::signals::{AuthSignals, LoginEvent, LogoutEvent, Receiver, SettingChanged};
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

pub const REMOVE_OTHER_SESSIONS: &str = "single_session.remove_other_sessions";
pub const REMOVE_ALL_SESSIONS: &str = "single_session.remove_all_sessions";
pub const CHANGE_SETTINGS: &str = "single_session.change_settings";

pub struct LoginReceiver {
    enforcer: Arc<SessionEnforcer>,
}

#[async_trait]
impl Receiver<LoginEvent> for LoginReceiver {
    fn id(&self) -> &str {
        REMOVE_OTHER_SESSIONS
    }

    async fn receive(&self, event: &LoginEvent) -> Result<()> {
        self.enforcer
            .remove_other_sessions(&event.user, &event.session_key)
            .await
            .map(|_| ())
    }
}

pub struct LogoutReceiver {
    enforcer: Arc<SessionEnforcer>,
}

#[async_trait]
impl Receiver<LogoutEvent> for LogoutReceiver {
    fn id(&self) -> &str {
        REMOVE_ALL_SESSIONS
    }

    async fn receive(&self, event: &LogoutEvent) -> Result<()> {
        self.enforcer
            .remove_all_sessions(event.user.as_ref())
            .await
            .map(|_| ())
    }
}

/// Attaches or detaches the logout receiver when `LOGOUT_ALL_SESSIONS` changes
pub struct SettingsReceiver {
    enforcer: Arc<SessionEnforcer>,
    signals: Weak<AuthSignals>,
}

#[async_trait]
impl Receiver<SettingChanged> for SettingsReceiver {
    fn id(&self) -> &str {
        CHANGE_SETTINGS
    }

    async fn receive(&self, event: &SettingChanged) -> Result<()> {
        let Some(signals) = self.signals.upgrade() else {
            warn!("Signals dropped before setting change of {}", event.setting);
            return Ok(());
        };

        change_settings(&self.enforcer, &signals, event).await;
        Ok(())
    }
}

/// Whether the logout receiver should be attached after a setting change.
/// On teardown the restored value is used, unset meaning enabled.
fn logout_all_wanted(event: &SettingChanged) -> bool {
    match (&event.value, event.enter) {
        (Some(value), _) => value.is_truthy(),
        (None, enter) => !enter,
    }
}

/// React to a setting change. Only `LOGOUT_ALL_SESSIONS` is acted upon.
pub async fn change_settings(
    enforcer: &Arc<SessionEnforcer>,
    signals: &AuthSignals,
    event: &SettingChanged,
) {
    if event.setting != SettingKey::LogoutAllSessions {
        return;
    }

    if logout_all_wanted(event) {
        let attached = signals
            .user_logged_out
            .connect(Arc::new(LogoutReceiver {
                enforcer: enforcer.clone(),
            }))
            .await;
        if attached {
            debug!("Logout-all-sessions receiver attached");
        }
    } else if signals.user_logged_out.disconnect(REMOVE_ALL_SESSIONS).await {
        debug!("Logout-all-sessions receiver detached");
    }
}

/// Validate settings and connect the enforcer's receivers.
/// The logout receiver is only attached when `LOGOUT_ALL_SESSIONS` is enabled.
pub async fn install(enforcer: Arc<SessionEnforcer>, signals: &Arc<AuthSignals>) -> Result<()> {
    enforcer.validate_settings().await?;

    signals
        .user_logged_in
        .connect(Arc::new(LoginReceiver {
            enforcer: enforcer.clone(),
        }))
        .await;

    signals
        .setting_changed
        .connect(Arc::new(SettingsReceiver {
            enforcer: enforcer.clone(),
            signals: Arc::downgrade(signals),
        }))
        .await;

    let logout_all = enforcer.logout_all_enabled().await;
    if logout_all {
        signals
            .user_logged_out
            .connect(Arc::new(LogoutReceiver {
                enforcer: enforcer.clone(),
            }))
            .await;
    }

    info!(
        "Session enforcement installed (logout all sessions: {})",
        logout_all
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingValue;

    fn changed(value: Option<SettingValue>, enter: bool) -> SettingChanged {
        SettingChanged {
            setting: SettingKey::LogoutAllSessions,
            value,
            enter,
        }
    }

    #[test]
    fn test_logout_all_wanted() {
        assert!(logout_all_wanted(&changed(Some(true.into()), true)));
        assert!(!logout_all_wanted(&changed(Some(false.into()), true)));
        assert!(logout_all_wanted(&changed(None, false)));
        assert!(!logout_all_wanted(&changed(Some(false.into()), false)));
        assert!(!logout_all_wanted(&changed(None, true)));
    }
}
