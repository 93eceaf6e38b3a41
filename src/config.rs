//! Server configuration from environment variables.
//!
//! Lookup order:
//! 1. `DERIVADA_HOST`, `DERIVADA_PORT`, `DERIVADA_LOG`
//! 2. Built-in defaults (127.0.0.1, 5000, info)

use std::env;

use simplelog::LevelFilter;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: LevelFilter,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
            log_level: LevelFilter::Info,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = ServerConfig::default();
        let host = env::var("DERIVADA_HOST").unwrap_or(defaults.host);
        let port = env::var("DERIVADA_PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(defaults.port);
        let log_level = env::var("DERIVADA_LOG")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(defaults.log_level);
        ServerConfig {
            host,
            port,
            log_level,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:5000");
        assert_eq!(config.log_level, LevelFilter::Info);
    }
}
