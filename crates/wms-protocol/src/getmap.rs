//! WMS GetMap layer parameters.
//!
//! These are the per-layer parameters a map client sends on every tile
//! request; GetFeatureInfo requests reuse them as the base parameter set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use wms_common::{AxisOrder, CrsCode, WmsError};

/// Supported WMS protocol versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WmsVersion {
    #[serde(rename = "1.1.1")]
    V1_1_1,
    #[serde(rename = "1.3.0")]
    V1_3_0,
}

impl WmsVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            WmsVersion::V1_1_1 => "1.1.1",
            WmsVersion::V1_3_0 => "1.3.0",
        }
    }

    /// Name of the CRS parameter: `SRS` before 1.3.0, `CRS` after.
    pub fn crs_param(&self) -> &'static str {
        match self {
            WmsVersion::V1_1_1 => "SRS",
            WmsVersion::V1_3_0 => "CRS",
        }
    }

    /// Names of the pixel position parameters for GetFeatureInfo.
    pub fn pixel_params(&self) -> (&'static str, &'static str) {
        match self {
            WmsVersion::V1_1_1 => ("X", "Y"),
            WmsVersion::V1_3_0 => ("I", "J"),
        }
    }

    /// Axis order of the BBOX parameter for the given CRS.
    pub fn axis_order(&self, crs: &CrsCode) -> AxisOrder {
        match self {
            WmsVersion::V1_1_1 => crs.axis_order_wms_1_1(),
            WmsVersion::V1_3_0 => crs.axis_order_wms_1_3(),
        }
    }
}

impl fmt::Display for WmsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WmsVersion {
    type Err = WmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.1.1" | "1.1.0" => Ok(WmsVersion::V1_1_1),
            "1.3.0" | "1.3" => Ok(WmsVersion::V1_3_0),
            other => Err(WmsError::InvalidParameter {
                param: "VERSION".to_string(),
                message: format!("unsupported WMS version '{}'", other),
            }),
        }
    }
}

fn default_format() -> String {
    "image/png".to_string()
}

fn default_true() -> bool {
    true
}

fn default_version() -> WmsVersion {
    WmsVersion::V1_1_1
}

/// Parameters for rendering one WMS layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WmsLayerParams {
    /// Fully-qualified layer name(s), comma separated
    pub layers: String,
    #[serde(default = "default_true")]
    pub tiled: bool,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub transparent: bool,
    #[serde(default = "default_version")]
    pub version: WmsVersion,
    #[serde(default)]
    pub styles: Option<String>,
}

impl WmsLayerParams {
    /// Tiled, transparent PNG over WMS 1.1.1.
    pub fn new(layers: impl Into<String>) -> Self {
        Self {
            layers: layers.into(),
            tiled: true,
            format: default_format(),
            transparent: true,
            version: default_version(),
            styles: None,
        }
    }

    pub fn with_version(mut self, version: WmsVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.styles = Some(style.into());
        self
    }

    /// Layer names as a list.
    pub fn layer_names(&self) -> Vec<String> {
        self.layers
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Query-string pairs in the usual upper-case WMS spelling.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("LAYERS".to_string(), self.layers.clone()),
            ("TILED".to_string(), self.tiled.to_string()),
            ("FORMAT".to_string(), self.format.clone()),
            ("TRANSPARENT".to_string(), self.transparent.to_string()),
            ("VERSION".to_string(), self.version.to_string()),
        ];
        if let Some(ref styles) = self.styles {
            pairs.push(("STYLES".to_string(), styles.clone()));
        }
        pairs
    }
}
