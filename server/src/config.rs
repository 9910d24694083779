//! Server configuration.
//!
//! Values are layered with figment, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, or `infradocs.toml` in the working directory)
//! 3. Environment variables prefixed with `INFRADOCS_`, using `__` between
//!    nesting levels (`INFRADOCS_AUTH__JWT_SECRET`)

use std::net::SocketAddr;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "infradocs.toml";
const ENV_PREFIX: &str = "INFRADOCS_";

pub const DOCUMENTS_FILE_NAME: &str = "documents.json";
pub const USERS_FILE_NAME: &str = "users.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(Box<figment::Error>),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body, in MiB.
    pub body_limit_mb: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: u32,
    pub recovery_code_ttl_minutes: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for JSON snapshots. Data is kept in memory only when unset.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub from: String,
    pub app_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            body_limit_mb: 50,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me".to_string(),
            token_ttl_hours: 8,
            recovery_code_ttl_minutes: 15,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: "InfraDocs <noreply@infradocs.local>".to_string(),
            app_name: "InfraDocs".to_string(),
        }
    }
}

impl Config {
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config_file = config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        Self::from_figment(
            Figment::new()
                .merge(Serialized::defaults(Config::default()))
                .merge(Toml::file(config_file))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.jwt_secret must not be empty".into()));
        }
        if self.auth.token_ttl_hours == 0 {
            return Err(ConfigError::Invalid(
                "auth.token_ttl_hours must be greater than 0".into(),
            ));
        }
        if self.auth.recovery_code_ttl_minutes == 0 {
            return Err(ConfigError::Invalid(
                "auth.recovery_code_ttl_minutes must be greater than 0".into(),
            ));
        }
        if self.server.body_limit_mb == 0 {
            return Err(ConfigError::Invalid(
                "server.body_limit_mb must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|err| {
                ConfigError::Invalid(format!(
                    "server address {}:{}: {err}",
                    self.server.host, self.server.port
                ))
            })
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.server.body_limit_mb.saturating_mul(1024 * 1024)
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.auth.token_ttl_hours))
    }

    pub fn recovery_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.auth.recovery_code_ttl_minutes))
    }

    pub fn documents_path(&self) -> Option<PathBuf> {
        self.storage.data_dir.as_ref().map(|dir| dir.join(DOCUMENTS_FILE_NAME))
    }

    pub fn users_path(&self) -> Option<PathBuf> {
        self.storage.data_dir.as_ref().map(|dir| dir.join(USERS_FILE_NAME))
    }
}
