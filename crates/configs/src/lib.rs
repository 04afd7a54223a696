//! # configs
//!
//! Layered runtime settings for the Wordbook server.
//!
//! Precedence, lowest first: built-in defaults, an optional config file,
//! then `WORDBOOK__<SECTION>__<KEY>` environment variables (a `.env` file is
//! read into the environment first).

use std::path::PathBuf;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

pub const ENV_PREFIX: &str = "WORDBOOK";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub log: LogSettings,
    pub storage: StorageSettings,
    pub auth: AuthSettings,
    pub relay: RelaySettings,
    /// The `.env` file read by [`Settings::load`], if any. Reported by the
    /// caller once logging is up.
    #[serde(skip)]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin; `*` allows any.
    pub cors_origin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `info,wb_core=debug`.
    pub filter: String,
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Used when the binary is built with the `db-sqlite` feature.
    pub database_url: String,
    /// Used when the binary is built with the `storage-local` feature.
    pub blob_root: PathBuf,
    pub blob_url_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// HMAC key for session tokens.
    pub secret: SecretString,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
    pub timeout_secs: u64,
    pub max_bytes: usize,
}

impl Settings {
    /// Loads `.env`, the optional `file` and the environment.
    pub fn load(file: Option<&str>) -> Result<Self, SettingsError> {
        let env_file = dotenvy::dotenv().ok();
        let mut builder = Self::defaults()?;
        if let Some(file) = file {
            builder = builder.add_source(File::with_name(file).required(false));
        }
        let mut settings = Self::build(builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        ))?;
        settings.env_file = env_file;
        Ok(settings)
    }

    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, SettingsError> {
        Ok(Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.cors_origin", "*")?
            .set_default("log.filter", "info")?
            .set_default("log.json", false)?
            .set_default("storage.database_url", "sqlite:wordbook.db")?
            .set_default("storage.blob_root", "./data/blobs")?
            .set_default("storage.blob_url_prefix", "/blobs")?
            .set_default("relay.timeout_secs", 10)?
            .set_default("relay.max_bytes", 10 * 1024 * 1024)?)
    }

    /// Builds and validates settings from an assembled builder.
    pub fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.auth.secret.expose_secret().trim().is_empty() {
            return Err(SettingsError::Invalid {
                key: "auth.secret",
                reason: "must not be empty".into(),
            });
        }
        if self.relay.max_bytes == 0 {
            return Err(SettingsError::Invalid {
                key: "relay.max_bytes",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<Settings, SettingsError> {
        Settings::build(Settings::defaults()?.add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn defaults_fill_everything_but_the_secret() {
        let settings = from_toml("[auth]\nsecret = \"s3cret\"").unwrap();
        assert_eq!(settings.bind_address(), ("127.0.0.1".to_owned(), 8080));
        assert_eq!(settings.log.filter, "info");
        assert_eq!(settings.storage.blob_url_prefix, "/blobs");
        assert_eq!(settings.relay.max_bytes, 10 * 1024 * 1024);
        assert_eq!(settings.auth.secret.expose_secret(), "s3cret");
        assert_eq!(settings.env_file, None);

        assert!(matches!(from_toml(""), Err(SettingsError::Load(_))));
    }

    #[test]
    fn file_values_override_defaults() {
        let settings = from_toml(
            r#"
            [server]
            port = 9000
            [log]
            json = true
            [auth]
            secret = "k"
            "#,
        )
        .unwrap();
        assert_eq!(settings.server.port, 9000);
        assert!(settings.log.json);
    }

    #[test]
    fn blank_secret_is_rejected() {
        let err = from_toml("[auth]\nsecret = \"  \"").unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { key: "auth.secret", .. }));
    }
}
