use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where each connection's affect samples come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AffectSourceKind {
    /// Random emotion, age and gender on every tick.
    Simulated,
    /// Expression scores reported by the browser's face detector.
    Detector,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub affect_source: AffectSourceKind,
    pub tick_interval: Duration,
    pub setup_timeout: Duration,
    pub content_path: Option<PathBuf>,
    pub log_level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            affect_source: AffectSourceKind::Simulated,
            tick_interval: Duration::from_millis(3000),
            setup_timeout: Duration::from_secs(30),
            content_path: None,
            log_level: Level::INFO,
        }
    }
}

fn parse_positive_u64(var: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(0) => Err(ConfigError::InvalidValue(
                var.to_string(),
                "must be greater than zero".to_string(),
            )),
            Ok(value) => Ok(value),
            Err(e) => Err(ConfigError::InvalidValue(var.to_string(), e.to_string())),
        },
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let source_str =
            std::env::var("AFFECT_SOURCE").unwrap_or_else(|_| "simulated".to_string());
        let affect_source = match source_str.to_lowercase().as_str() {
            "simulated" => AffectSourceKind::Simulated,
            "detector" => AffectSourceKind::Detector,
            other => {
                return Err(ConfigError::InvalidValue(
                    "AFFECT_SOURCE".to_string(),
                    format!("'{}' is not one of 'simulated', 'detector'", other),
                ));
            }
        };

        let tick_interval = Duration::from_millis(parse_positive_u64("TICK_INTERVAL_MS", 3000)?);
        let setup_timeout = Duration::from_secs(parse_positive_u64("SETUP_TIMEOUT_SECS", 30)?);

        let content_path = std::env::var("CONTENT_PATH").ok().map(PathBuf::from);

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        if let Some(path) = &content_path {
            if !path.is_file() {
                return Err(ConfigError::InvalidValue(
                    "CONTENT_PATH".to_string(),
                    format!("'{}' is not a file", path.display()),
                ));
            }
        }

        Ok(Self {
            bind_address,
            affect_source,
            tick_interval,
            setup_timeout,
            content_path,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("AFFECT_SOURCE");
            env::remove_var("TICK_INTERVAL_MS");
            env::remove_var("SETUP_TIMEOUT_SECS");
            env::remove_var("CONTENT_PATH");
            env::remove_var("RUST_LOG");
        }
    }

    #[test]
    fn test_config_error_display() {
        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.affect_source, AffectSourceKind::Simulated);
        assert_eq!(config.tick_interval, Duration::from_millis(3000));
        assert_eq!(config.setup_timeout, Duration::from_secs(30));
        assert_eq!(config.content_path, None);
        assert_eq!(config.log_level, Level::INFO);

        let default = Config::default();
        assert_eq!(default.bind_address, config.bind_address);
        assert_eq!(default.tick_interval, config.tick_interval);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        let content = std::env::temp_dir().join("affect-tutor-config-test.json");
        std::fs::write(&content, "{}").unwrap();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("AFFECT_SOURCE", "Detector");
            env::set_var("TICK_INTERVAL_MS", "4000");
            env::set_var("SETUP_TIMEOUT_SECS", "5");
            env::set_var("CONTENT_PATH", &content);
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.affect_source, AffectSourceKind::Detector);
        assert_eq!(config.tick_interval, Duration::from_millis(4000));
        assert_eq!(config.setup_timeout, Duration::from_secs(5));
        assert_eq!(config.content_path, Some(content.clone()));
        assert_eq!(config.log_level, Level::DEBUG);

        clear_env_vars();
        let _ = std::fs::remove_file(content);
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "BIND_ADDRESS"),
        }
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_invalid_affect_source() {
        clear_env_vars();
        unsafe {
            env::set_var("AFFECT_SOURCE", "webcam");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, msg) => {
                assert_eq!(var, "AFFECT_SOURCE");
                assert!(msg.contains("webcam"));
            }
        }
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_rejects_zero_tick_interval() {
        clear_env_vars();
        unsafe {
            env::set_var("TICK_INTERVAL_MS", "0");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "TICK_INTERVAL_MS"),
        }
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_rejects_non_numeric_timeout() {
        clear_env_vars();
        unsafe {
            env::set_var("SETUP_TIMEOUT_SECS", "soon");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "SETUP_TIMEOUT_SECS"),
        }
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
        }
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_missing_content_file() {
        clear_env_vars();
        unsafe {
            env::set_var("CONTENT_PATH", "/definitely/not/here.json");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "CONTENT_PATH"),
        }
        clear_env_vars();
    }
}
