//! Process configuration, read once from the environment (after `.env`).
//!
//! - `STORAGE_BACKEND` - `file` (default) or `postgres`
//! - `DATABASE_URL` - required when the backend is `postgres`
//! - `DATA_FILE` - flat-file location (default: data/db.json)
//! - `HOST` / `PORT` - bind address (default: 127.0.0.1:3000)
//! - `JWT_SECRET` - session signing secret
//! - `SESSION_TTL_HOURS` - session lifetime (default: 24)
//! - `COOKIE_SECURE` - mark the session cookie `Secure` (default: false)
//! - `UPLOAD_DIR` - where uploads are written (default: public/img/produtos)
//! - `MEDIA_URL_PREFIX` - URL prefix of stored uploads (default: /img/produtos)

use std::env;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "madame-modas-dev-secret";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres { database_url: String },
    File { path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageBackend,
    pub host: IpAddr,
    pub port: u16,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,
    pub upload_dir: PathBuf,
    pub media_url_prefix: String,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{key} must be set"),
            ConfigError::Invalid { key, value } => write!(f, "invalid {key} value: {value}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes `env::var`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let storage = match var("STORAGE_BACKEND").as_deref().unwrap_or("file") {
            "file" => StorageBackend::File {
                path: var("DATA_FILE").unwrap_or_else(|| "data/db.json".to_string()).into(),
            },
            "postgres" => StorageBackend::Postgres {
                database_url: var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            },
            other => {
                return Err(ConfigError::Invalid { key: "STORAGE_BACKEND", value: other.to_string() })
            }
        };

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.to_string()
        });

        let config = Self {
            storage,
            host: parse_or(var("HOST"), "HOST", IpAddr::from([127, 0, 0, 1]))?,
            port: parse_or(var("PORT"), "PORT", 3000)?,
            jwt_secret,
            session_ttl_hours: parse_or(var("SESSION_TTL_HOURS"), "SESSION_TTL_HOURS", 24)?,
            cookie_secure: parse_or(var("COOKIE_SECURE"), "COOKIE_SECURE", false)?,
            upload_dir: var("UPLOAD_DIR")
                .unwrap_or_else(|| "public/img/produtos".to_string())
                .into(),
            media_url_prefix: var("MEDIA_URL_PREFIX").unwrap_or_else(|| "/img/produtos".to_string()),
        };

        if config.session_ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                key: "SESSION_TTL_HOURS",
                value: config.session_ttl_hours.to_string(),
            });
        }
        Ok(config)
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => {
            info!("{key} not set, using default");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_to_flat_file() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.storage, StorageBackend::File { path: "data/db.json".into() });
        assert_eq!(config.port, 3000);
        assert_eq!(config.session_ttl_hours, 24);
        assert!(!config.cookie_secure);
        assert_eq!(config.media_url_prefix, "/img/produtos");
    }

    #[test]
    fn postgres_requires_database_url() {
        let err = config_from(&[("STORAGE_BACKEND", "postgres")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));

        let config = config_from(&[
            ("STORAGE_BACKEND", "postgres"),
            ("DATABASE_URL", "postgres://localhost/madame"),
        ])
        .unwrap();
        assert!(matches!(config.storage, StorageBackend::Postgres { .. }));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config_from(&[("STORAGE_BACKEND", "mongo")]).is_err());
        assert!(config_from(&[("PORT", "http")]).is_err());
        assert!(config_from(&[("SESSION_TTL_HOURS", "0")]).is_err());
    }
}
