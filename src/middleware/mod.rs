pub mod session;

pub use session::{CurrentSession, SESSION_COOKIE, session_key_from_headers, session_middleware};
