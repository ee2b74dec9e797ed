//! Feature-info queries against map layers.
//!
//! `query_layer` asks one layer for the features under a click;
//! `query_all` asks every candidate layer at once and keeps the first one
//! that actually found something. Failures are never raised: they come
//! back as a `FeatureQueryResult` with `success == false`, a message and a
//! `FailureKind`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use wms_common::{LayerId, WmsError};
use wms_protocol::{FeatureInfoResponse, FeatureRecord, InfoFormat};

use crate::config::PortalConfig;
use crate::http::HttpFetch;
use crate::map::{Coordinate, MapLayer, MapView};

/// Message of the failure returned when no layer can be queried.
pub const NO_QUERYABLE_LAYERS_MESSAGE: &str = "No visible layers support GetFeatureInfo";

/// Message of the failure returned when no queried layer had features.
pub const NO_FEATURES_FOUND_MESSAGE: &str = "No features found at this location";

/// Why a feature query failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No resolution or no usable coordinate; nothing was requested
    MissingInput,
    /// The layer's source cannot answer feature-info requests
    Unsupported,
    /// A request URL could not be built for the layer
    UrlUnavailable,
    Transport,
    HttpStatus,
    InvalidResponse,
    ServiceException,
    NoQueryableLayers,
    NoFeaturesFound,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MissingInput => "missing_input",
            FailureKind::Unsupported => "unsupported",
            FailureKind::UrlUnavailable => "url_unavailable",
            FailureKind::Transport => "transport",
            FailureKind::HttpStatus => "http_status",
            FailureKind::InvalidResponse => "invalid_response",
            FailureKind::ServiceException => "service_exception",
            FailureKind::NoQueryableLayers => "no_queryable_layers",
            FailureKind::NoFeaturesFound => "no_features_found",
        }
    }

    /// The two aggregate outcomes that mean "nothing to show" rather than
    /// an error worth displaying.
    pub fn is_nothing_to_show(&self) -> bool {
        matches!(
            self,
            FailureKind::NoQueryableLayers | FailureKind::NoFeaturesFound
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a feature-info query.
///
/// A successful result always has a `features` list, possibly empty; use
/// [`has_features`](Self::has_features) to check for data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureQueryResult {
    pub success: bool,
    pub layer_id: Option<LayerId>,
    pub layer_name: String,
    /// Decoded response payload
    pub data: Option<Value>,
    pub features: Vec<FeatureRecord>,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
    pub error_kind: Option<FailureKind>,
}

impl FeatureQueryResult {
    pub fn succeeded(layer: &MapLayer, response: FeatureInfoResponse) -> Self {
        Self {
            success: true,
            layer_id: Some(layer.id.clone()),
            layer_name: layer.display_name().to_string(),
            data: Some(response.data),
            features: response.features,
            timestamp: Utc::now(),
            error: None,
            error_kind: None,
        }
    }

    pub fn failed(layer: Option<&MapLayer>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            layer_id: layer.map(|l| l.id.clone()),
            layer_name: layer.map_or("unknown", |l| l.display_name()).to_string(),
            data: None,
            features: Vec::new(),
            timestamp: Utc::now(),
            error: Some(message.into()),
            error_kind: Some(kind),
        }
    }

    pub fn has_features(&self) -> bool {
        self.success && !self.features.is_empty()
    }
}

/// Per-query settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub format: InfoFormat,
    /// Maximum number of features per layer
    pub feature_count: u32,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            format: InfoFormat::Json,
            feature_count: 10,
        }
    }
}

/// Issues GetFeatureInfo requests for map layers.
#[derive(Clone)]
pub struct FeatureInfoClient {
    http: Arc<dyn HttpFetch>,
    defaults: QueryOptions,
}

impl fmt::Debug for FeatureInfoClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureInfoClient")
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl FeatureInfoClient {
    pub fn new(http: Arc<dyn HttpFetch>, defaults: QueryOptions) -> Self {
        Self { http, defaults }
    }

    pub fn from_config(http: Arc<dyn HttpFetch>, config: &PortalConfig) -> Self {
        Self::new(http, config.query_options())
    }

    pub fn defaults(&self) -> &QueryOptions {
        &self.defaults
    }

    /// Query one layer at `coordinate`.
    ///
    /// Missing input and unsupported layers fail without a request.
    #[instrument(skip(self, view, layer, options), fields(layer = %layer.display_name()))]
    pub async fn query_layer(
        &self,
        view: &MapView,
        coordinate: Coordinate,
        layer: &MapLayer,
        options: &QueryOptions,
    ) -> FeatureQueryResult {
        let resolution = match check_input(view, coordinate) {
            Ok(resolution) => resolution,
            Err(message) => {
                return FeatureQueryResult::failed(Some(layer), FailureKind::MissingInput, message)
            }
        };

        let Some(source) = layer.source.feature_info() else {
            return FeatureQueryResult::failed(
                Some(layer),
                FailureKind::Unsupported,
                "Layer does not support GetFeatureInfo",
            );
        };

        let url = match source.feature_info_url(coordinate, resolution, &view.projection, options) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Could not build GetFeatureInfo URL");
                return FeatureQueryResult::failed(
                    Some(layer),
                    FailureKind::UrlUnavailable,
                    format!("Could not build GetFeatureInfo URL: {}", e),
                );
            }
        };

        debug!(url = %url, "Requesting feature info");

        let response = match self.http.get(&url).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "GetFeatureInfo request failed");
                return FeatureQueryResult::failed(Some(layer), FailureKind::Transport, e.to_string());
            }
        };

        if !response.is_success() {
            let e = WmsError::http_status(response.status, response.reason.as_deref());
            warn!(status = response.status, "GetFeatureInfo returned an error status");
            return FeatureQueryResult::failed(Some(layer), FailureKind::HttpStatus, e.to_string());
        }

        match FeatureInfoResponse::from_body(&response.body, options.format) {
            Ok(parsed) => {
                debug!(features = parsed.features.len(), "Feature info received");
                FeatureQueryResult::succeeded(layer, parsed)
            }
            Err(e @ WmsError::ServiceException { .. }) => {
                warn!(error = %e, "Server answered with a service exception");
                FeatureQueryResult::failed(Some(layer), FailureKind::ServiceException, e.to_string())
            }
            Err(e) => {
                warn!(error = %e, "Could not decode feature info response");
                FeatureQueryResult::failed(Some(layer), FailureKind::InvalidResponse, e.to_string())
            }
        }
    }

    /// Query several layers at `coordinate` and keep the first with features.
    ///
    /// Candidates are the layers named in `layer_ids` (unknown ids are
    /// skipped) or, when `None`, every visible queryable layer. All
    /// candidates are queried concurrently and every request is awaited;
    /// the winner is the first successful, non-empty result in candidate
    /// order.
    #[instrument(skip(self, view, coordinate, layer_ids), fields(coordinate = %coordinate))]
    pub async fn query_all(
        &self,
        view: &MapView,
        coordinate: Coordinate,
        layer_ids: Option<&[LayerId]>,
    ) -> FeatureQueryResult {
        if let Err(message) = check_input(view, coordinate) {
            debug!(%message, "Feature info input incomplete");
            return FeatureQueryResult::failed(None, FailureKind::MissingInput, message);
        }

        let candidates: Vec<&MapLayer> = match layer_ids {
            Some(ids) => ids
                .iter()
                .filter_map(|id| {
                    let layer = view.layers.get(id);
                    if layer.is_none() {
                        debug!(layer_id = %id, "Skipping unknown layer");
                    }
                    layer
                })
                .collect(),
            None => view.layers.visible_queryable().collect(),
        };

        if candidates.is_empty() {
            debug!("No candidate layers for feature info");
            return FeatureQueryResult::failed(
                None,
                FailureKind::NoQueryableLayers,
                NO_QUERYABLE_LAYERS_MESSAGE,
            );
        }

        let results = join_all(
            candidates
                .iter()
                .map(|layer| self.query_layer(view, coordinate, layer, &self.defaults)),
        )
        .await;

        let queried = results.len();
        match results.into_iter().find(FeatureQueryResult::has_features) {
            Some(result) => {
                info!(
                    layer = %result.layer_name,
                    features = result.features.len(),
                    queried,
                    "Feature info found"
                );
                result
            }
            None => {
                debug!(queried, "No layer returned features");
                FeatureQueryResult::failed(
                    None,
                    FailureKind::NoFeaturesFound,
                    NO_FEATURES_FOUND_MESSAGE,
                )
            }
        }
    }
}

/// Resolution of `view`, or the message explaining which input is missing.
fn check_input(view: &MapView, coordinate: Coordinate) -> Result<f64, String> {
    let resolution = match view.resolution {
        Some(r) if r.is_finite() && r > 0.0 => r,
        _ => {
            return Err(
                "Incomplete parameters for GetFeatureInfo: the view has no resolution".to_string(),
            )
        }
    };
    if !coordinate.is_finite() {
        return Err(format!(
            "Incomplete parameters for GetFeatureInfo: invalid coordinate {}",
            coordinate
        ));
    }
    Ok(resolution)
}
