//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

use crate::game::session::DisconnectPolicy;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS ("*" for any)
    pub client_origin: String,
    /// Match result store; results are only logged when unset
    pub supabase: Option<SupabaseConfig>,
    /// What happens to a session when a member disconnects
    pub disconnect_policy: DisconnectPolicy,
}

/// Supabase project credentials
#[derive(Clone, Debug)]
pub struct SupabaseConfig {
    /// Supabase project URL
    pub url: String,
    /// Supabase service role key (bypasses RLS - server only!)
    pub service_role_key: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let supabase = match (lookup("SUPABASE_URL"), lookup("SUPABASE_SERVICE_ROLE_KEY")) {
            (Some(url), Some(service_role_key)) => Some(SupabaseConfig { url, service_role_key }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY")),
            (None, Some(_)) => return Err(ConfigError::Missing("SUPABASE_URL")),
        };

        let disconnect_policy = match lookup("DISCONNECT_POLICY") {
            Some(value) => parse_policy(&value)?,
            None => DisconnectPolicy::default(),
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),
            supabase,
            disconnect_policy,
        })
    }
}

fn parse_policy(value: &str) -> Result<DisconnectPolicy, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "forfeit" => Ok(DisconnectPolicy::Forfeit),
        "freeze" => Ok(DisconnectPolicy::Freeze),
        _ => Err(ConfigError::Invalid {
            key: "DISCONNECT_POLICY",
            value: value.to_string(),
        }),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
