// src/config.rs
// Client settings loaded from conf/client.conf, with defaults for every key

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::defs::{AUDIO_FALLBACK_INTERVAL_MS, FLASH_START_DELAY_MS, FLASH_STEP_MS, OVERLAY_PULSE_MS};
use crate::presentation::Timings;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub timeout: u64,
    pub retry_attempts: u32,
    pub verbose: bool,
    pub audio_fallback_ms: u64,
    pub flash_step_ms: u64,
    pub flash_delay_ms: u64,
    pub pulse_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            timeout: 30,
            retry_attempts: 3,
            verbose: false,
            audio_fallback_ms: AUDIO_FALLBACK_INTERVAL_MS,
            flash_step_ms: FLASH_STEP_MS,
            flash_delay_ms: FLASH_START_DELAY_MS,
            pulse_ms: OVERLAY_PULSE_MS,
        }
    }
}

impl ClientConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_map(&parse_config(&content)?))
    }

    fn from_map(config_map: &HashMap<String, String>) -> Self {
        let defaults = Self::default();

        let millis = |key: &str, default: u64| {
            config_map.get(key)
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };

        let host = config_map.get("host")
            .cloned()
            .unwrap_or(defaults.host);

        let port = config_map.get("port")
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(defaults.port);

        let timeout = config_map.get("timeout")
            .and_then(|t| t.parse::<u64>().ok())
            .unwrap_or(defaults.timeout);

        let retry_attempts = config_map.get("retry_attempts")
            .and_then(|r| r.parse::<u32>().ok())
            .unwrap_or(defaults.retry_attempts);

        let verbose = config_map.get("verbose")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(defaults.verbose);

        ClientConfig {
            host,
            port,
            timeout,
            retry_attempts,
            verbose,
            audio_fallback_ms: millis("audio_fallback_ms", defaults.audio_fallback_ms),
            flash_step_ms: millis("flash_step_ms", defaults.flash_step_ms),
            flash_delay_ms: millis("flash_delay_ms", defaults.flash_delay_ms),
            pulse_ms: millis("pulse_ms", defaults.pulse_ms),
        }
    }

    pub fn load_or_default() -> Self {
        let config_path = "conf/client.conf";

        match Self::from_file(config_path) {
            Ok(config) => {
                println!("📄 Loaded client configuration from {}", config_path);
                config
            }
            Err(e) => {
                println!("⚠️  Could not load client config from {}: {}. Using defaults.", config_path, e);
                Self::default()
            }
        }
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}/ws", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn timings(&self) -> Timings {
        Timings {
            audio_fallback: Duration::from_millis(self.audio_fallback_ms),
            pulse: Duration::from_millis(self.pulse_ms),
            flash_delay: Duration::from_millis(self.flash_delay_ms),
            flash_step: Duration::from_millis(self.flash_step_ms),
        }
    }
}

fn parse_config(content: &str) -> Result<HashMap<String, String>, Box<dyn std::error::Error>> {
    let mut config = HashMap::new();

    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            config.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let content = r#"
            # This is a comment
            host = 192.168.1.100
            port = 8080
            # Another comment
            flash_step_ms = 250
        "#;

        let config = parse_config(content).unwrap();
        assert_eq!(config.get("host"), Some(&"192.168.1.100".to_string()));
        assert_eq!(config.get("port"), Some(&"8080".to_string()));
        assert_eq!(config.get("flash_step_ms"), Some(&"250".to_string()));
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5000);
        assert_eq!(config.timeout, 30);
        assert_eq!(config.retry_attempts, 3);
        assert!(!config.verbose);
        assert_eq!(config.audio_fallback_ms, 3500);
    }

    #[test]
    fn test_client_config_from_map() {
        let map = parse_config("port = 9000\nverbose = yes\npulse_ms = 0\naudio_fallback_ms = 2000").unwrap();
        let config = ClientConfig::from_map(&map);
        assert_eq!(config.port, 9000);
        assert!(config.verbose);
        // zero is not a usable period
        assert_eq!(config.pulse_ms, 420);
        assert_eq!(config.timings().audio_fallback, Duration::from_millis(2000));
    }

    #[test]
    fn test_client_config_urls() {
        let config = ClientConfig {
            host: "192.168.1.100".to_string(),
            port: 8080,
            ..ClientConfig::default()
        };
        assert_eq!(config.server_url(), "http://192.168.1.100:8080");
        assert_eq!(config.ws_url(), "ws://192.168.1.100:8080/ws");
    }
}
