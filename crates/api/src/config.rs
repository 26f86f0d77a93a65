//! Process configuration read from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8082";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {message}")]
    Invalid { var: &'static str, message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the stores live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    InMemory,
    Postgres { url: String, max_connections: u32 },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// PEM encoded RSA public key used to verify bearer tokens.
    pub jwt_public_key: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    pub persistence: Persistence,
    /// Policy file replacing the embedded rule table.
    pub policy_path: Option<PathBuf>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "BIND_ADDR",
                message: e.to_string(),
            })?;

        let jwt_public_key = match (var("JWT_PUBLIC_KEY"), var("JWT_PUBLIC_KEY_PATH")) {
            // Single-line deployments pass the PEM with escaped newlines.
            (Some(inline), _) => inline.replace("\\n", "\n"),
            (None, Some(path)) => {
                let path = PathBuf::from(path);
                std::fs::read_to_string(&path).map_err(|source| ConfigError::Io { path, source })?
            }
            (None, None) => return Err(ConfigError::Missing("JWT_PUBLIC_KEY")),
        };

        let persistent = match var("USE_PERSISTENT_STORES") {
            None => false,
            Some(v) => parse_bool(&v).ok_or_else(|| ConfigError::Invalid {
                var: "USE_PERSISTENT_STORES",
                message: format!("expected a boolean, got '{v}'"),
            })?,
        };

        let persistence = if persistent {
            let url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
            let max_connections = match var("DATABASE_MAX_CONNECTIONS") {
                None => DEFAULT_MAX_CONNECTIONS,
                Some(v) => v
                    .parse::<u32>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| ConfigError::Invalid {
                        var: "DATABASE_MAX_CONNECTIONS",
                        message: format!("expected a positive integer, got '{v}'"),
                    })?,
            };
            Persistence::Postgres { url, max_connections }
        } else {
            Persistence::InMemory
        };

        Ok(Self {
            bind_addr,
            jwt_public_key,
            jwt_issuer: var("JWT_ISSUER"),
            jwt_audience: var("JWT_AUDIENCE"),
            persistence,
            policy_path: var("RBAC_POLICY_PATH").map(PathBuf::from),
        })
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self.persistence, Persistence::Postgres { .. })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_in_memory_stores() {
        let cfg = config(&[("JWT_PUBLIC_KEY", "-----BEGIN PUBLIC KEY-----\\nabc")]).unwrap();
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR.parse().unwrap());
        assert_eq!(cfg.persistence, Persistence::InMemory);
        assert_eq!(cfg.jwt_public_key, "-----BEGIN PUBLIC KEY-----\nabc");
        assert!(cfg.policy_path.is_none());
    }

    #[test]
    fn public_key_is_required() {
        assert!(matches!(config(&[]), Err(ConfigError::Missing("JWT_PUBLIC_KEY"))));
    }

    #[test]
    fn persistent_mode_needs_a_database() {
        let err = config(&[("JWT_PUBLIC_KEY", "k"), ("USE_PERSISTENT_STORES", "true")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));

        let cfg = config(&[
            ("JWT_PUBLIC_KEY", "k"),
            ("USE_PERSISTENT_STORES", "1"),
            ("DATABASE_URL", "postgres://localhost/feedback"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
        ])
        .unwrap();
        assert_eq!(
            cfg.persistence,
            Persistence::Postgres {
                url: "postgres://localhost/feedback".into(),
                max_connections: 4
            }
        );
    }

    #[test]
    fn malformed_values_are_reported() {
        assert!(matches!(
            config(&[("JWT_PUBLIC_KEY", "k"), ("BIND_ADDR", "nowhere")]),
            Err(ConfigError::Invalid { var: "BIND_ADDR", .. })
        ));
        assert!(matches!(
            config(&[("JWT_PUBLIC_KEY", "k"), ("USE_PERSISTENT_STORES", "maybe")]),
            Err(ConfigError::Invalid { var: "USE_PERSISTENT_STORES", .. })
        ));
    }

    #[test]
    fn missing_key_file_is_an_io_error() {
        assert!(matches!(
            config(&[("JWT_PUBLIC_KEY_PATH", "/definitely/not/here.pem")]),
            Err(ConfigError::Io { .. })
        ));
    }
}
