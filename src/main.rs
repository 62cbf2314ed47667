use single_session::handlers::{self, AppState};
use single_session::models::{AppConfig, User};
use single_session::session::MemorySessionStorage;
use single_session::{
    AuthSignals, PredicateRegistry, SessionEnforcer, SettingsHandle, config, install,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Predicates selectable from `session.single_user_session`
fn predicates() -> PredicateRegistry {
    let mut registry = PredicateRegistry::new();
    registry
        .register("policies.staff_only", |user: &User| user.is_staff)
        .register("policies.admins_only", |user: &User| user.is_admin());
    registry
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "single_session=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let app_config = match config::load_config_with_fallback() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("{}. Running with default settings and no users.", e);
            Arc::new(AppConfig::default())
        }
    };

    let storage = Arc::new(MemorySessionStorage::new());
    let enforcer = Arc::new(SessionEnforcer::new(
        storage.clone(),
        storage.clone(),
        SettingsHandle::new(app_config.session.clone()),
        predicates(),
        app_config.session_config(),
    ));
    let signals = Arc::new(AuthSignals::new());

    // A predicate path that cannot be resolved stops startup here
    if let Err(e) = install(enforcer.clone(), &signals).await {
        if e.is_configuration() {
            tracing::error!("Invalid session settings: {}", e);
        }
        return Err(e.into());
    }

    let state = AppState {
        enforcer,
        signals,
        sessions: storage,
        config: app_config,
    };

    let app = handlers::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()?;
    tracing::info!("Starting single-session server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
