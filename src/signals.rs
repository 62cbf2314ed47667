// In-process signal dispatch for authentication events
// Receivers can be attached and detached at runtime

use crate::error::Result;
use crate::models::User;
use crate::settings::{SettingKey, SettingValue};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A listener attached to a [`Signal`]
#[async_trait]
pub trait Receiver<E>: Send + Sync {
    /// Stable identifier; connecting a second receiver with the same id is a no-op
    fn id(&self) -> &str;

    async fn receive(&self, event: &E) -> Result<()>;
}

/// Sent after the host has authenticated a user and bound them to a session
#[derive(Debug, Clone)]
pub struct LoginEvent {
    pub user: User,
    pub session_key: String,
}

/// Sent when a user logs out. `user` is `None` for anonymous logouts.
#[derive(Debug, Clone)]
pub struct LogoutEvent {
    pub user: Option<User>,
    pub session_key: Option<String>,
}

/// Sent when a setting is overridden (`enter`) or restored
#[derive(Debug, Clone)]
pub struct SettingChanged {
    pub setting: SettingKey,
    pub value: Option<SettingValue>,
    pub enter: bool,
}

pub struct Signal<E> {
    name: &'static str,
    receivers: RwLock<Vec<Arc<dyn Receiver<E>>>>,
}

impl<E: Send + Sync> Signal<E> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            receivers: RwLock::new(Vec::new()),
        }
    }

    /// Attach a receiver. Returns false if one with the same id was already attached.
    pub async fn connect(&self, receiver: Arc<dyn Receiver<E>>) -> bool {
        let mut receivers = self.receivers.write().await;
        if receivers.iter().any(|r| r.id() == receiver.id()) {
            return false;
        }

        debug!("Connecting {} to {}", receiver.id(), self.name);
        receivers.push(receiver);
        true
    }

    /// Detach a receiver by id. Returns whether anything was removed.
    pub async fn disconnect(&self, id: &str) -> bool {
        let mut receivers = self.receivers.write().await;
        let before = receivers.len();
        receivers.retain(|r| r.id() != id);

        let removed = receivers.len() != before;
        if removed {
            debug!("Disconnected {} from {}", id, self.name);
        }
        removed
    }

    pub async fn is_connected(&self, id: &str) -> bool {
        self.receivers.read().await.iter().any(|r| r.id() == id)
    }

    pub async fn receiver_count(&self) -> usize {
        self.receivers.read().await.len()
    }

    /// Deliver an event to every receiver in connection order, stopping at the first error.
    /// The receiver list is snapshotted first so receivers may reconnect signals while running.
    pub async fn send(&self, event: &E) -> Result<()> {
        let receivers: Vec<Arc<dyn Receiver<E>>> = self.receivers.read().await.clone();

        for receiver in receivers {
            receiver.receive(event).await?;
        }

        Ok(())
    }
}

/// The authentication signals a host emits
pub struct AuthSignals {
    pub user_logged_in: Signal<LoginEvent>,
    pub user_logged_out: Signal<LogoutEvent>,
    pub setting_changed: Signal<SettingChanged>,
}

impl AuthSignals {
    pub fn new() -> Self {
        Self {
            user_logged_in: Signal::new("user_logged_in"),
            user_logged_out: Signal::new("user_logged_out"),
            setting_changed: Signal::new("setting_changed"),
        }
    }
}

impl Default for AuthSignals {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        id: String,
        hits: AtomicUsize,
    }

    impl Counter {
        fn new(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                hits: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Receiver<LogoutEvent> for Counter {
        fn id(&self) -> &str {
            &self.id
        }

        async fn receive(&self, _event: &LogoutEvent) -> Result<()> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Receiver<LogoutEvent> for Failing {
        fn id(&self) -> &str {
            "failing"
        }

        async fn receive(&self, _event: &LogoutEvent) -> Result<()> {
            Err(Error::Storage("boom".to_string()))
        }
    }

    fn anonymous_logout() -> LogoutEvent {
        LogoutEvent {
            user: None,
            session_key: None,
        }
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let signal: Signal<LogoutEvent> = Signal::new("user_logged_out");
        let counter = Counter::new("counter");

        assert!(signal.connect(counter.clone()).await);
        assert!(!signal.connect(counter.clone()).await);
        assert_eq!(signal.receiver_count().await, 1);

        signal.send(&anonymous_logout()).await.unwrap();
        assert_eq!(counter.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disconnect() {
        let signal: Signal<LogoutEvent> = Signal::new("user_logged_out");
        let counter = Counter::new("counter");
        signal.connect(counter.clone()).await;

        assert!(signal.disconnect("counter").await);
        assert!(!signal.disconnect("counter").await);
        assert!(!signal.is_connected("counter").await);

        signal.send(&anonymous_logout()).await.unwrap();
        assert_eq!(counter.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_send_stops_at_first_error() {
        let signal: Signal<LogoutEvent> = Signal::new("user_logged_out");
        let counter = Counter::new("after");
        signal.connect(Arc::new(Failing)).await;
        signal.connect(counter.clone()).await;

        let result = signal.send(&anonymous_logout()).await;
        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(counter.hits.load(Ordering::SeqCst), 0);
    }
}
