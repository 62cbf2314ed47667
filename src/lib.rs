// Single-session enforcement for axum services
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod session;
pub mod settings;
pub mod signals;

pub use error::{Error, Result};
pub use policy::{PredicateRegistry, SingleSessionPolicy};
pub use session::{SessionEnforcer, install};
pub use settings::{SessionSettings, SettingKey, SettingValue, SettingsHandle};
pub use signals::AuthSignals;
