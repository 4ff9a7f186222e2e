use config::{Config, ConfigError, Environment, File};
use medichaser_auth::AuthSettings;
use medicover_api::ApiSettings;
use serde::Deserialize;
use std::path::PathBuf;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingSettings {
    /// Also write logs to a daily rolling file
    #[serde(default)]
    pub to_file: bool,

    /// Defaults to `<data dir>/medichaser/logs`
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl LoggingSettings {
    pub fn file_directory(&self) -> Option<PathBuf> {
        if !self.to_file {
            return None;
        }
        self.directory
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join("medichaser").join("logs")))
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load `config.toml` (or the file named by `MEDICHASER_CONFIG`), then let
    /// `MEDICHASER_<SECTION>__<KEY>` environment variables override it.
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = std::env::var("MEDICHASER_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        Self::from_path(&config_path)
    }

    pub fn from_path(config_path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(Environment::with_prefix("MEDICHASER").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        self.auth.validate()?;
        self.api.validate()?;
        Ok(())
    }
}
