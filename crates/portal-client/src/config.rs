//! Portal configuration.
//!
//! One `PortalConfig` is built at startup (from YAML or the environment)
//! and handed to every component that talks to the map server.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;
use wms_common::{WmsError, WmsResult};
use wms_protocol::{CapabilitiesOptions, InfoFormat};

use crate::feature_info::QueryOptions;

pub const DEFAULT_BASE_URL: &str = "http://31.97.8.51:8082/geoserver";
pub const DEFAULT_WORKSPACE: &str = "sembrando";

/// Connection and query settings for one map server workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Server root, e.g. "http://host:8082/geoserver"
    pub base_url: String,
    /// Workspace whose layers the portal shows
    pub workspace: String,
    #[serde(default)]
    pub default_format: InfoFormat,
    #[serde(default = "default_feature_count")]
    pub default_feature_count: u32,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub map: MapDefaults,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

fn default_feature_count() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

/// Initial map view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapDefaults {
    pub center_lon: f64,
    pub center_lat: f64,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub projection: String,
}

impl Default for MapDefaults {
    fn default() -> Self {
        Self {
            center_lon: -98.9,
            center_lat: 20.1,
            zoom: 9.0,
            min_zoom: 5.0,
            max_zoom: 19.0,
            projection: "EPSG:3857".to_string(),
        }
    }
}

/// Layers preloaded into the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub principal: Vec<CatalogEntry>,
    #[serde(default)]
    pub extras: Vec<CatalogEntry>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            principal: vec![
                CatalogEntry::new(
                    "sembrando:territorios_28",
                    "Territorios",
                    "Capa de territorios sembrando datos",
                ),
                CatalogEntry::new(
                    "sembrando:unidades_riego",
                    "Unidades de riego",
                    "Unidades de riego en México",
                ),
            ],
            extras: vec![
                CatalogEntry::new(
                    "sembrando:municipios_hidalgo",
                    "Municipios",
                    "Límites municipales",
                ),
                CatalogEntry::new("sembrando:rios", "Ríos", "Red hidrológica principal"),
            ],
        }
    }
}

/// A configured catalog layer. Layers start hidden unless `visible` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Fully-qualified layer name
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub style: Option<String>,
}

impl CatalogEntry {
    pub fn new(name: &str, title: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            visible: false,
            style: None,
        }
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            workspace: DEFAULT_WORKSPACE.to_string(),
            default_format: InfoFormat::default(),
            default_feature_count: default_feature_count(),
            request_timeout_secs: default_timeout_secs(),
            map: MapDefaults::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl PortalConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> WmsResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            WmsError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        let config: PortalConfig = serde_yaml::from_str(&contents).map_err(|e| {
            WmsError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;

        config.validate()?;
        debug!(path = %path.display(), base_url = %config.base_url, "Loaded portal config");
        Ok(config)
    }

    /// Defaults overridden by `GEOPORTAL_*` environment variables.
    pub fn from_env() -> WmsResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the
    /// `GEOPORTAL_*` keys.
    pub fn from_lookup<F>(lookup: F) -> WmsResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = PortalConfig::default();

        if let Some(base_url) = lookup("GEOPORTAL_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(workspace) = lookup("GEOPORTAL_WORKSPACE") {
            config.workspace = workspace;
        }
        if let Some(format) = lookup("GEOPORTAL_INFO_FORMAT") {
            config.default_format = InfoFormat::from_mime(&format).ok_or_else(|| {
                WmsError::Config(format!("GEOPORTAL_INFO_FORMAT: unknown format '{}'", format))
            })?;
        }
        if let Some(count) = lookup("GEOPORTAL_FEATURE_COUNT") {
            config.default_feature_count = parse_number("GEOPORTAL_FEATURE_COUNT", &count)?;
        }
        if let Some(secs) = lookup("GEOPORTAL_TIMEOUT_SECS") {
            config.request_timeout_secs = parse_number("GEOPORTAL_TIMEOUT_SECS", &secs)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> WmsResult<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(WmsError::Config("base_url must not be empty".to_string()));
        }
        let parsed = Url::parse(base)
            .map_err(|e| WmsError::Config(format!("base_url '{}': {}", base, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(WmsError::Config(format!(
                "base_url '{}' must use http or https",
                base
            )));
        }

        if self.workspace.trim().is_empty() {
            return Err(WmsError::Config("workspace must not be empty".to_string()));
        }
        if self.workspace.contains(':') || self.workspace.contains('/') {
            return Err(WmsError::Config(format!(
                "workspace '{}' must be a bare name",
                self.workspace
            )));
        }

        if self.default_feature_count == 0 {
            return Err(WmsError::Config(
                "default_feature_count must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(WmsError::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }

        let map = &self.map;
        if map.min_zoom > map.max_zoom || map.zoom < map.min_zoom || map.zoom > map.max_zoom {
            return Err(WmsError::Config(format!(
                "map zoom {} outside [{}, {}]",
                map.zoom, map.min_zoom, map.max_zoom
            )));
        }

        Ok(())
    }

    /// Workspace WMS endpoint.
    pub fn wms_url(&self) -> String {
        format!("{}/{}/wms", self.base_root(), self.workspace)
    }

    /// Server-wide OWS endpoint used for WFS requests.
    pub fn wfs_url(&self) -> String {
        format!("{}/ows", self.base_root())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn capabilities_options(&self) -> CapabilitiesOptions {
        CapabilitiesOptions::new(self.base_root(), self.workspace.clone())
    }

    /// Query options used when the caller does not pass its own.
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            format: self.default_format,
            feature_count: self.default_feature_count,
        }
    }

    fn base_root(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> WmsResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| WmsError::Config(format!("{}: invalid value '{}': {}", key, value, e)))
}
