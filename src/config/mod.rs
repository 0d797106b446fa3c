//! Configuration module for the minutes backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Rejected `MINUTES_BIND_ADDR` value, reported once logging is up
    pub invalid_bind_addr: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_psk = env::var("MINUTES_API_PSK")
            .ok()
            .filter(|psk| !psk.trim().is_empty());

        let db_path = env::var("MINUTES_DB_PATH")
            .unwrap_or_else(|_| "./data/minutes.sqlite".to_string())
            .into();

        let mut invalid_bind_addr = None;
        let bind_addr = match env::var("MINUTES_BIND_ADDR") {
            Ok(raw) => match raw.parse() {
                Ok(addr) => addr,
                Err(_) => {
                    invalid_bind_addr = Some(raw);
                    default_bind_addr()
                }
            },
            Err(_) => default_bind_addr(),
        };

        let log_level = env::var("MINUTES_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            api_psk,
            db_path,
            bind_addr,
            log_level,
            invalid_bind_addr,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("MINUTES_API_PSK");
        env::remove_var("MINUTES_DB_PATH");
        env::remove_var("MINUTES_BIND_ADDR");
        env::remove_var("MINUTES_LOG_LEVEL");

        let config = Config::from_env();

        assert!(config.api_psk.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/minutes.sqlite"));
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.log_level, "info");
        assert!(config.invalid_bind_addr.is_none());

        env::set_var("MINUTES_BIND_ADDR", "not-an-address");
        let config = Config::from_env();
        env::remove_var("MINUTES_BIND_ADDR");

        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.invalid_bind_addr.as_deref(), Some("not-an-address"));
    }
}
