pub mod app;
pub mod user;

pub use app::AppConfig;
pub use user::{LoginRequest, LoginResponse, User, UserInfo, UserRole};
