// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub user: UserConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub geolocation: GeolocationConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    /// Owning identity stamped on every new walk.
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// "google" or "mapbox"
    pub provider: String,
    pub walking_speed_kmh: f64,
    pub request_timeout_secs: u64,
    pub alternatives_delay_ms: u64,
    pub max_retries: u32,
    #[serde(default = "ProviderConfig::google")]
    pub google: ProviderConfig,
    #[serde(default = "ProviderConfig::mapbox")]
    pub mapbox: ProviderConfig,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            provider: "google".into(),
            walking_speed_kmh: 5.0,
            request_timeout_secs: 15,
            alternatives_delay_ms: 100,
            max_retries: 2,
            google: ProviderConfig::google(),
            mapbox: ProviderConfig::mapbox(),
        }
    }
}

impl RoutingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn alternatives_delay(&self) -> Duration {
        Duration::from_millis(self.alternatives_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Environment variable holding the API key / access token.
    pub api_key_env: String,
    /// Override the service endpoint (self-hosted proxies, tests).
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ProviderConfig {
    fn google() -> Self {
        Self {
            api_key_env: "GOOGLE_MAPS_API_KEY".into(),
            base_url: None,
        }
    }

    fn mapbox() -> Self {
        Self {
            api_key_env: "MAPBOX_ACCESS_TOKEN".into(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub tick_interval_ms: u64,
    /// How long `last_error` stays visible before it clears itself.
    pub error_display_secs: u64,
    pub store_timeout_secs: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            error_display_secs: 5,
            store_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    pub high_accuracy: bool,
    pub timeout_secs: u64,
    pub maximum_age_secs: u64,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout_secs: 10,
            maximum_age_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub db_path: Option<String>,
}

impl StorageConfig {
    pub fn resolved_db_path(&self) -> std::path::PathBuf {
        match &self.db_path {
            Some(p) => std::path::PathBuf::from(p),
            None => paths::db_path(),
        }
    }
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
