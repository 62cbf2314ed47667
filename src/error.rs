// Error types shared by the enforcement listener, storage and config loading

use thiserror::Error;

/// Result type alias for session enforcement operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A setting has a shape or value the enforcer cannot act on.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    /// Failure reported by a session or user-session storage backend.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration file could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl Error {
    /// Whether the error stems from the host configuration rather than runtime state
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::ImproperlyConfigured(_) | Error::Config(_))
    }
}
