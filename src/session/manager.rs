// Session enforcer: applies the single-session and logout-all policies

use super::storage::{SessionStorage, UserSessionStorage};
use super::types::{Session, SessionConfig};
use crate::error::Result;
use crate::models::User;
use crate::policy::{PredicateRegistry, SingleSessionPolicy};
use crate::settings::{SettingKey, SettingsHandle};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Enforces session policies against the host's session store
pub struct SessionEnforcer {
    sessions: Arc<dyn SessionStorage>,
    links: Arc<dyn UserSessionStorage>,
    settings: SettingsHandle,
    predicates: PredicateRegistry,
    config: SessionConfig,
}

impl SessionEnforcer {
    pub fn new(
        sessions: Arc<dyn SessionStorage>,
        links: Arc<dyn UserSessionStorage>,
        settings: SettingsHandle,
        predicates: PredicateRegistry,
        config: SessionConfig,
    ) -> Self {
        Self {
            sessions,
            links,
            settings,
            predicates,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Check that the configured single-session setting can be resolved
    pub async fn validate_settings(&self) -> Result<()> {
        self.policy().await.map(|_| ())
    }

    /// Current single-session policy
    pub async fn policy(&self) -> Result<SingleSessionPolicy> {
        let value = self.settings.get(SettingKey::SingleUserSession).await;
        SingleSessionPolicy::from_setting(value.as_ref(), &self.predicates)
    }

    pub async fn logout_all_enabled(&self) -> bool {
        self.settings.snapshot().await.logout_all_enabled()
    }

    /// Login hook: drop the user's other sessions when the policy applies to them,
    /// then make sure the current session is stored and linked to the user.
    /// Returns the number of sessions removed.
    pub async fn remove_other_sessions(&self, user: &User, session_key: &str) -> Result<usize> {
        let policy = self.policy().await?;

        let removed = if policy.applies_to(user) {
            self.delete_user_sessions(user.id, Some(session_key)).await?
        } else {
            debug!(
                "Single-session policy {:?} does not apply to user {}",
                policy, user.id
            );
            0
        };

        if self.sessions.get_session(session_key).await?.is_none() {
            let mut session = Session::with_key(session_key, &self.config);
            session.set_user_id(user.id);
            self.sessions.save_session(session).await?;
        }

        let (_, created) = self.links.get_or_create_link(session_key, user.id).await?;
        if created {
            debug!("Linked session {} to user {}", session_key, user.id);
        }

        if removed > 0 {
            info!(
                "Removed {} other session(s) of user {} on login",
                removed, user.id
            );
        }

        Ok(removed)
    }

    /// Logout hook: drop every session linked to the user. Anonymous logouts are ignored.
    pub async fn remove_all_sessions(&self, user: Option<&User>) -> Result<usize> {
        let Some(user) = user else {
            return Ok(0);
        };

        let removed = self.delete_user_sessions(user.id, None).await?;
        info!("Removed {} session(s) of user {} on logout", removed, user.id);
        Ok(removed)
    }

    /// Live sessions linked to a user, oldest link first
    pub async fn sessions_for_user(&self, user_id: Uuid) -> Result<Vec<Session>> {
        let links = self.links.links_for_user(user_id).await?;

        let mut sessions = Vec::with_capacity(links.len());
        for link in links {
            if let Some(session) = self.sessions.get_session(&link.session_key).await?
                && !session.is_expired()
            {
                sessions.push(session);
            }
        }

        Ok(sessions)
    }

    pub async fn active_session_count(&self, user_id: Uuid) -> Result<usize> {
        Ok(self.sessions_for_user(user_id).await?.len())
    }

    /// Drop expired sessions and their links (should be run periodically)
    pub async fn cleanup_expired_sessions(&self) -> Result<usize> {
        let count = self.sessions.cleanup_expired_sessions().await?;
        if count > 0 {
            debug!("Cleaned up {} expired sessions", count);
        }
        Ok(count)
    }

    async fn delete_user_sessions(&self, user_id: Uuid, keep: Option<&str>) -> Result<usize> {
        let keys: Vec<String> = self
            .links
            .user_session_keys(user_id)
            .await?
            .into_iter()
            .filter(|key| Some(key.as_str()) != keep)
            .collect();

        if keys.is_empty() {
            return Ok(0);
        }

        let removed = self.sessions.delete_sessions(&keys).await?;
        self.links.delete_links(&keys).await?;
        Ok(removed)
    }
}
