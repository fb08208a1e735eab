use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Session lifecycle configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum live sessions per user; oldest-by-expiry entries beyond this
    /// bound are pruned after each registration
    pub max_sessions_per_user: usize,
    /// Session validity window in seconds
    pub session_ttl_secs: i64,
    /// Redis URL for the registry backend; `None` selects the in-memory store
    pub redis_url: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions_per_user: 8,
            session_ttl_secs: 432_000, // 5 days
            redis_url: None,
        }
    }
}

impl SessionConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_sessions_per_user == 0 {
            return Err(
                "max_sessions_per_user must be at least 1; a zero cap would evict every \
                 session immediately after login"
                    .to_string(),
            );
        }
        if self.session_ttl_secs <= 0 {
            return Err(format!(
                "session_ttl_secs must be positive, got {}",
                self.session_ttl_secs
            ));
        }
        Ok(())
    }
}

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SessionConfig, String> {
    let path = path.as_ref();
    info!("Loading session configuration from: {}", path.display());

    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

    let config: SessionConfig = serde_yaml::from_str(&contents)
        .map_err(|e| format!("Failed to parse YAML config: {}", e))?;

    config.validate()?;

    info!(
        "Session configuration loaded: cap {} sessions/user, {}s window",
        config.max_sessions_per_user, config.session_ttl_secs
    );

    Ok(config)
}

/// Load configuration with fallback options
pub fn load_config_with_fallback() -> Result<SessionConfig, String> {
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

    // Try common config file locations
    let paths = vec!["session.yaml", "session.yml", "config.yaml", "config.yml"];

    for path in paths {
        if Path::new(path).exists() {
            match load_config(path) {
                Ok(config) => return Ok(config),
                Err(e) => warn!("Failed to load config from '{}': {}", path, e),
            }
        }
    }

    info!("No configuration file found, using session defaults");
    Ok(SessionConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.max_sessions_per_user, 8);
        assert_eq!(config.session_ttl_secs, 432_000);
        assert!(config.redis_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_valid_config() {
        let yaml = r#"
max_sessions_per_user: 4
session_ttl_secs: 86400
redis_url: "redis://127.0.0.1/"
"#;

        let config: SessionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.max_sessions_per_user, 4);
        assert_eq!(config.session_ttl_secs, 86_400);
        assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let yaml = "session_ttl_secs: 3600\n";

        let config: SessionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.session_ttl_secs, 3600);
        assert_eq!(config.max_sessions_per_user, 8);
    }

    #[test]
    fn test_validation_zero_cap() {
        let config = SessionConfig {
            max_sessions_per_user: 0,
            ..SessionConfig::default()
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("at least 1"));
    }

    #[test]
    fn test_validation_nonpositive_window() {
        let config = SessionConfig {
            session_ttl_secs: 0,
            ..SessionConfig::default()
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("must be positive"));
    }
}
