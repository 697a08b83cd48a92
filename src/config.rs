//! Layered settings: defaults, then ~/.movaa/config.toml (or `--config`),
//! then `MOVAA_*` environment variables. CLI flags are applied on top by
//! the binary.

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Keyed autocomplete provider; disabled when absent.
    pub geoapify_key: Option<String>,
    pub geoapify_url: String,
    pub nominatim_url: String,
    pub ipapi_url: String,
    pub user_agent: String,
    /// ISO country code search is restricted to.
    pub country: String,
    pub http_timeout_secs: u64,
    pub geolocation_timeout_secs: u64,
    pub debounce_ms: u64,
    pub suggestion_limit: usize,
    pub store_path: Option<PathBuf>,
    pub log_level: String,
    pub offline: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            geoapify_key: None,
            geoapify_url: "https://api.geoapify.com".into(),
            nominatim_url: "https://nominatim.openstreetmap.org".into(),
            ipapi_url: "https://ipapi.co/json/".into(),
            user_agent: format!("movaa-booking/{}", env!("CARGO_PKG_VERSION")),
            country: "NG".into(),
            http_timeout_secs: 6,
            geolocation_timeout_secs: 8,
            debounce_ms: 300,
            suggestion_limit: 5,
            store_path: None,
            log_level: "info".into(),
            offline: false,
        }
    }
}

impl Settings {
    /// Load from `path`, or from the default file when `None`. A missing
    /// file is not an error; a malformed one is.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let file = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        let required = path.is_some();

        Config::builder()
            .add_source(File::from(file).format(FileFormat::Toml).required(required))
            .add_source(Environment::with_prefix("MOVAA").try_parsing(true).source(env))
            .build()?
            .try_deserialize()
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".movaa")
            .join("config.toml")
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_secs(self.geolocation_timeout_secs.max(1))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
