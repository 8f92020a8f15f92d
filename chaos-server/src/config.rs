//! Server configuration from environment variables.
//!
//! | Variable                   | Default              |
//! |----------------------------|----------------------|
//! | `GEMINI_API_KEY`           | required             |
//! | `GEMINI_MODEL`             | `gemini-1.5-flash`   |
//! | `CHAOS_BIND`               | `127.0.0.1:5000`     |
//! | `CHAOS_SESSION_TTL_SECS`   | `3600`               |
//! | `CHAOS_MAX_SESSIONS`       | `10000`              |
//! | `CHAOS_TEMPERATURE`        | model default        |
//! | `CHAOS_MAX_TOKENS`         | `1024`               |
//! | `CHAOS_SYSTEM_INSTRUCTION` | built-in instruction |

use chaos_core::prompts::CHAOS_INSTRUCTIONS;
use chaos_core::{StorytellerConfig, DEFAULT_MAX_SESSIONS};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_BIND: &str = "127.0.0.1:5000";
const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No API key configured - set GEMINI_API_KEY environment variable")]
    MissingApiKey,

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Everything the server needs at startup.
#[derive(Clone)]
pub struct ServerConfig {
    pub api_key: String,
    pub model: String,
    pub bind_addr: SocketAddr,
    pub session_ttl: Duration,
    pub max_sessions: usize,
    pub temperature: Option<f32>,
    pub max_output_tokens: u32,
    pub system_instruction: String,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("bind_addr", &self.bind_addr)
            .field("session_ttl", &self.session_ttl)
            .field("max_sessions", &self.max_sessions)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve variable names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_key = get("GEMINI_API_KEY").ok_or(ConfigError::MissingApiKey)?;
        let model = get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let bind_addr = match parse::<SocketAddr>("CHAOS_BIND", get("CHAOS_BIND"))? {
            Some(addr) => addr,
            None => parse_value("CHAOS_BIND", DEFAULT_BIND)?,
        };
        let session_ttl = Duration::from_secs(
            parse("CHAOS_SESSION_TTL_SECS", get("CHAOS_SESSION_TTL_SECS"))?
                .unwrap_or(DEFAULT_SESSION_TTL_SECS),
        );
        let max_sessions = parse("CHAOS_MAX_SESSIONS", get("CHAOS_MAX_SESSIONS"))?
            .unwrap_or(DEFAULT_MAX_SESSIONS);
        let temperature = parse("CHAOS_TEMPERATURE", get("CHAOS_TEMPERATURE"))?;
        let max_output_tokens =
            parse("CHAOS_MAX_TOKENS", get("CHAOS_MAX_TOKENS"))?.unwrap_or(DEFAULT_MAX_TOKENS);
        let system_instruction =
            get("CHAOS_SYSTEM_INSTRUCTION").unwrap_or_else(|| CHAOS_INSTRUCTIONS.to_string());

        Ok(Self {
            api_key,
            model,
            bind_addr,
            session_ttl,
            max_sessions,
            temperature,
            max_output_tokens,
            system_instruction,
        })
    }

    /// Storyteller settings derived from this configuration.
    pub fn storyteller_config(&self) -> StorytellerConfig {
        StorytellerConfig {
            model: Some(self.model.clone()),
            system_instruction: self.system_instruction.clone(),
            temperature: self.temperature,
            max_output_tokens: Some(self.max_output_tokens),
        }
    }
}

fn parse<T: FromStr>(name: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError> {
    value.map(|v| parse_value(name, &v)).transpose()
}

fn parse_value<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("GEMINI_API_KEY", "key")]).unwrap();
        assert_eq!(config.api_key, "key");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.bind_addr, "127.0.0.1:5000".parse().unwrap());
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
        assert_eq!(config.max_sessions, DEFAULT_MAX_SESSIONS);
        assert_eq!(config.temperature, None);
        assert_eq!(config.max_output_tokens, 1024);
        assert_eq!(config.system_instruction, CHAOS_INSTRUCTIONS);
    }

    #[test]
    fn test_missing_or_blank_api_key() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingApiKey)));
        assert!(matches!(
            load(&[("GEMINI_API_KEY", "   ")]),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("GEMINI_API_KEY", "key"),
            ("GEMINI_MODEL", "gemini-1.5-pro"),
            ("CHAOS_BIND", "0.0.0.0:8080"),
            ("CHAOS_SESSION_TTL_SECS", "60"),
            ("CHAOS_MAX_SESSIONS", "250"),
            ("CHAOS_TEMPERATURE", "0.9"),
            ("CHAOS_MAX_TOKENS", "512"),
            ("CHAOS_SYSTEM_INSTRUCTION", "Be brief."),
        ])
        .unwrap();

        assert_eq!(config.model, "gemini-1.5-pro");
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.session_ttl, Duration::from_secs(60));
        assert_eq!(config.max_sessions, 250);
        assert_eq!(config.temperature, Some(0.9));

        let storyteller = config.storyteller_config();
        assert_eq!(storyteller.model.as_deref(), Some("gemini-1.5-pro"));
        assert_eq!(storyteller.system_instruction, "Be brief.");
        assert_eq!(storyteller.max_output_tokens, Some(512));
    }

    #[test]
    fn test_invalid_values() {
        let err = load(&[("GEMINI_API_KEY", "key"), ("CHAOS_BIND", "not an address")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "CHAOS_BIND", .. }));

        let err = load(&[("GEMINI_API_KEY", "key"), ("CHAOS_SESSION_TTL_SECS", "-5")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "CHAOS_SESSION_TTL_SECS", .. }));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = load(&[("GEMINI_API_KEY", "super-secret")]).unwrap();
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}
