//! Configuration management for relieftrack.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default config directory name.
const CONFIG_DIR_NAME: &str = "relieftrack";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `RELIEFTRACK_`)
/// 2. TOML config file at `~/.config/relieftrack/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote data store configuration.
    pub store: StoreConfig,
    /// Live-tracking configuration.
    pub tracking: TrackingConfig,
    /// Map viewport configuration.
    pub map: MapConfig,
    /// Shareable link configuration.
    pub links: LinkConfig,
    /// Device geolocation configuration.
    pub geolocate: GeolocateConfig,
}

/// Remote data store configuration.
///
/// The base URL is the REST root of the hosted tabular API and the key is the
/// public (anonymous) API key it expects on every request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// REST root of the hosted data API, e.g. `https://<project>.example/rest/v1`.
    pub base_url: String,
    /// Public API key sent as `apikey` header and bearer token.
    pub api_key: String,
}

/// Live-tracking configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Seconds between polling cycles while following a vehicle.
    pub poll_interval_secs: u64,
}

/// Map viewport configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Viewport width in pixels.
    pub width_px: u32,
    /// Viewport height in pixels.
    pub height_px: u32,
    /// Padding in pixels kept around fitted geometry.
    pub padding_px: u32,
    /// Maximum zoom level the viewport may fit to.
    pub max_zoom: f64,
    /// Initial center latitude before anything is rendered.
    pub center_lat: f64,
    /// Initial center longitude before anything is rendered.
    pub center_lon: f64,
    /// Initial zoom level before anything is rendered.
    pub default_zoom: f64,
}

/// Shareable link configuration.
///
/// Scan and receipt URLs embed the identifier as a `uuid` query parameter
/// after a `?` inside the routing hash fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Origin the front-end is served from, e.g. `https://ayuda.example`.
    pub public_origin: String,
    /// Hash route that shows a code's status and attached list.
    pub lookup_route: String,
    /// Hash route where a recipient confirms a kit delivery.
    pub receipt_route: String,
    /// Hash route where field staff register an item list for a code.
    pub registration_route: String,
}

/// Device geolocation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocateConfig {
    /// Timeout in seconds for each position provider.
    pub timeout_secs: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width_px: 1024,
            height_px: 768,
            padding_px: 20,
            max_zoom: 19.0,
            center_lat: 19.4326,
            center_lon: -99.1332,
            default_zoom: 13.0,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            public_origin: "http://localhost:5173".to_string(),
            lookup_route: "ConsultaQR".to_string(),
            receipt_route: "recepcionKit".to_string(),
            registration_route: "registroLista".to_string(),
        }
    }
}

impl Default for GeolocateConfig {
    fn default() -> Self {
        Self { timeout_secs: 15 }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `RELIEFTRACK_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("RELIEFTRACK_").split("_"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// The store base URL and API key are allowed to be empty here so that
    /// offline commands keep working; they are checked when a client is built.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.tracking.poll_interval_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "poll_interval_secs must be greater than 0".to_string(),
            });
        }

        if self.map.width_px == 0 || self.map.height_px == 0 {
            return Err(Error::ConfigValidation {
                message: "map viewport dimensions must be greater than 0".to_string(),
            });
        }

        let min_side = self.map.width_px.min(self.map.height_px);
        if self.map.padding_px.saturating_mul(2) >= min_side {
            return Err(Error::ConfigValidation {
                message: format!(
                    "padding_px ({}) leaves no room in a {}x{} viewport",
                    self.map.padding_px, self.map.width_px, self.map.height_px
                ),
            });
        }

        if !(0.0..=22.0).contains(&self.map.max_zoom) {
            return Err(Error::ConfigValidation {
                message: format!("max_zoom ({}) must be within 0..=22", self.map.max_zoom),
            });
        }

        if self.map.default_zoom > self.map.max_zoom {
            return Err(Error::ConfigValidation {
                message: format!(
                    "default_zoom ({}) cannot exceed max_zoom ({})",
                    self.map.default_zoom, self.map.max_zoom
                ),
            });
        }

        for (name, value) in [
            ("links.lookup_route", &self.links.lookup_route),
            ("links.receipt_route", &self.links.receipt_route),
            ("links.registration_route", &self.links.registration_route),
        ] {
            if value.trim().is_empty() {
                return Err(Error::ConfigValidation {
                    message: format!("{name} must not be empty"),
                });
            }
        }

        if self.geolocate.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "geolocate timeout_secs must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the polling interval as a Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.tracking.poll_interval_secs)
    }

    /// Get the geolocation timeout as a Duration.
    #[must_use]
    pub fn geolocate_timeout(&self) -> Duration {
        Duration::from_secs(self.geolocate.timeout_secs)
    }
}
