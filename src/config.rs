use std::time::Duration;

use crate::capture::CaptureConfig;
use crate::discovery::DiscoveryOptions;
use crate::error::ConfigError;
use crate::matcher::{PortSignature, DEFAULT_PORT};

const ENV_PORT: &str = "PORTSCOUT_PORT";
const ENV_SNAPLEN: &str = "PORTSCOUT_SNAPLEN";
const ENV_PROMISCUOUS: &str = "PORTSCOUT_PROMISCUOUS";
const ENV_READ_TIMEOUT: &str = "PORTSCOUT_READ_TIMEOUT_SECS";

/// Runtime settings: built-in defaults, then environment, then command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub capture: CaptureConfig,
    pub discovery_timeout: Option<Duration>,
    pub join_probers: bool,
    pub skip_down: bool,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            capture: CaptureConfig::default(),
            discovery_timeout: None,
            join_probers: false,
            skip_down: false,
            verbose: false,
        }
    }
}

impl Config {
    /// Defaults overridden by `PORTSCOUT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(val) = lookup(ENV_PORT) {
            config.port = parse(ENV_PORT, &val)?;
        }
        if let Some(val) = lookup(ENV_SNAPLEN) {
            config.capture.snaplen = parse(ENV_SNAPLEN, &val)?;
            if config.capture.snaplen == 0 {
                return Err(ConfigError::InvalidValue {
                    key: ENV_SNAPLEN,
                    value: val,
                });
            }
        }
        if let Some(val) = lookup(ENV_PROMISCUOUS) {
            config.capture.promiscuous = parse_bool(ENV_PROMISCUOUS, &val)?;
        }
        if let Some(val) = lookup(ENV_READ_TIMEOUT) {
            config.capture.read_timeout = Duration::from_secs(parse(ENV_READ_TIMEOUT, &val)?);
        }

        Ok(config)
    }

    pub fn signature(&self) -> PortSignature {
        PortSignature::new(self.port)
    }

    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            capture: self.capture.clone(),
            deadline: self.discovery_timeout,
            join_probers: self.join_probers,
            skip_down: self.skip_down,
        }
    }

    /// Fallback log filter when `RUST_LOG` is unset.
    pub fn tracing_filter(&self) -> &'static str {
        if self.verbose {
            "portscout=debug,info"
        } else {
            "info"
        }
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 2050);
        assert_eq!(config.capture.snaplen, 1024);
        assert!(!config.capture.promiscuous);
        assert_eq!(config.capture.read_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORTSCOUT_PORT", "443"),
            ("PORTSCOUT_SNAPLEN", "65535"),
            ("PORTSCOUT_PROMISCUOUS", "yes"),
            ("PORTSCOUT_READ_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.port, 443);
        assert_eq!(config.capture.snaplen, 65535);
        assert!(config.capture.promiscuous);
        assert_eq!(config.capture.read_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_lookup(lookup_from(&[("PORTSCOUT_PORT", "70000")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "PORTSCOUT_PORT",
                value: "70000".to_string()
            }
        );
    }

    #[test]
    fn test_zero_snaplen_rejected() {
        assert!(Config::from_lookup(lookup_from(&[("PORTSCOUT_SNAPLEN", "0")])).is_err());
    }

    #[test]
    fn test_invalid_bool() {
        assert!(Config::from_lookup(lookup_from(&[("PORTSCOUT_PROMISCUOUS", "maybe")])).is_err());
    }

    #[test]
    fn test_discovery_options_follow_config() {
        let config = Config {
            discovery_timeout: Some(Duration::from_secs(30)),
            join_probers: true,
            skip_down: true,
            ..Config::default()
        };
        let options = config.discovery_options();
        assert_eq!(options.deadline, Some(Duration::from_secs(30)));
        assert!(options.join_probers);
        assert!(options.skip_down);
        assert_eq!(options.capture, config.capture);
        assert_eq!(config.signature().port(), 2050);
    }
}
