use crate::error::{Error, Result};
use crate::models::AppConfig;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Arc<AppConfig>> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let contents = fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let config = parse_config(&contents)?;

    info!(
        "Configuration loaded: single_user_session={:?}, logout_all_sessions={:?}, {} user(s)",
        config.session.single_user_session,
        config.session.logout_all_sessions,
        config.users.len()
    );

    Ok(Arc::new(config))
}

/// Parse and validate YAML configuration
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = serde_yaml::from_str(contents)
        .map_err(|e| Error::Config(format!("Failed to parse YAML config: {}", e)))?;

    config.validate().map_err(Error::Config)?;

    Ok(config)
}

/// Load configuration with fallback options
pub fn load_config_with_fallback() -> Result<Arc<AppConfig>> {
    // Try loading from environment variable first
    if let Ok(config_path) = std::env::var("CONFIG_PATH") {
        match load_config(&config_path) {
            Ok(config) => return Ok(config),
            Err(e) => warn!(
                "Failed to load config from CONFIG_PATH ({}): {}",
                config_path, e
            ),
        }
    }

    let paths = ["config.yaml", "config.yml"];

    for path in paths {
        if Path::new(path).exists() {
            match load_config(path) {
                Ok(config) => return Ok(config),
                Err(e) => warn!("Failed to load config from '{}': {}", path, e),
            }
        }
    }

    Err(Error::Config(
        "No configuration file found. Create a config.yaml file or set CONFIG_PATH. \
        See config.example.yaml for an example configuration."
            .to_string(),
    ))
}
