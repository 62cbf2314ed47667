// Session enforcement module
// Links sessions to users and applies the single-session and logout-all policies

pub mod listener;
pub mod manager;
pub mod storage;
pub mod types;

pub use listener::{change_settings, install};
pub use manager::SessionEnforcer;
pub use storage::{MemorySessionStorage, SessionStorage, UserSessionStorage};
pub use types::{MAX_SESSION_TTL_SECS, Session, SessionConfig, SessionInfo, UserSession};
