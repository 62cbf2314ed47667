// Session storage backends

use super::types::{Session, UserSession};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// The host's session store
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Insert or replace a session
    async fn save_session(&self, session: Session) -> Result<()>;

    /// Get a session by key
    async fn get_session(&self, session_key: &str) -> Result<Option<Session>>;

    /// Delete a session, returning whether it existed
    async fn delete_session(&self, session_key: &str) -> Result<bool>;

    /// Delete several sessions, returning how many existed
    async fn delete_sessions(&self, session_keys: &[String]) -> Result<usize>;

    /// Drop every session past its expiry
    async fn cleanup_expired_sessions(&self) -> Result<usize>;
}

/// Join table mapping sessions to users
#[async_trait]
pub trait UserSessionStorage: Send + Sync {
    /// Link a session to a user. An existing link for the key is returned untouched.
    async fn get_or_create_link(
        &self,
        session_key: &str,
        user_id: Uuid,
    ) -> Result<(UserSession, bool)>;

    /// Keys of every session linked to the user
    async fn user_session_keys(&self, user_id: Uuid) -> Result<Vec<String>>;

    /// Links of the user, oldest first
    async fn links_for_user(&self, user_id: Uuid) -> Result<Vec<UserSession>>;

    /// Remove the links of the given sessions
    async fn delete_links(&self, session_keys: &[String]) -> Result<usize>;
}

/// In-memory session store. Deleting a session also removes its user link.
pub struct MemorySessionStorage {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    links: Arc<RwLock<HashMap<String, UserSession>>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            links: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn link_count(&self) -> usize {
        self.links.read().await.len()
    }

    async fn remove(&self, session_keys: &[String]) -> usize {
        let mut sessions = self.sessions.write().await;
        let mut links = self.links.write().await;

        let mut count = 0;
        for key in session_keys {
            if sessions.remove(key).is_some() {
                count += 1;
            }
            links.remove(key);
        }
        count
    }
}

impl Default for MemorySessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn save_session(&self, session: Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        debug!("Saving session {}", session.session_key);
        sessions.insert(session.session_key.clone(), session);
        Ok(())
    }

    async fn get_session(&self, session_key: &str) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_key).cloned())
    }

    async fn delete_session(&self, session_key: &str) -> Result<bool> {
        Ok(self.remove(&[session_key.to_string()]).await > 0)
    }

    async fn delete_sessions(&self, session_keys: &[String]) -> Result<usize> {
        Ok(self.remove(session_keys).await)
    }

    async fn cleanup_expired_sessions(&self) -> Result<usize> {
        let expired: Vec<String> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.is_expired())
            .map(|s| s.session_key.clone())
            .collect();

        let count = self.remove(&expired).await;
        if count > 0 {
            info!("Cleaned up {} expired sessions", count);
        }
        Ok(count)
    }
}

#[async_trait]
impl UserSessionStorage for MemorySessionStorage {
    async fn get_or_create_link(
        &self,
        session_key: &str,
        user_id: Uuid,
    ) -> Result<(UserSession, bool)> {
        let mut links = self.links.write().await;

        if let Some(existing) = links.get(session_key) {
            return Ok((existing.clone(), false));
        }

        let link = UserSession::new(session_key, user_id);
        links.insert(session_key.to_string(), link.clone());
        Ok((link, true))
    }

    async fn user_session_keys(&self, user_id: Uuid) -> Result<Vec<String>> {
        let links = self.links.read().await;
        Ok(links
            .values()
            .filter(|l| l.user_id == user_id)
            .map(|l| l.session_key.clone())
            .collect())
    }

    async fn links_for_user(&self, user_id: Uuid) -> Result<Vec<UserSession>> {
        let links = self.links.read().await;
        let mut user_links: Vec<UserSession> = links
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();

        user_links.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(user_links)
    }

    async fn delete_links(&self, session_keys: &[String]) -> Result<usize> {
        let mut links = self.links.write().await;
        Ok(session_keys
            .iter()
            .filter(|key| links.remove(key.as_str()).is_some())
            .count())
    }
}
