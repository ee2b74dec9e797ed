//! Shared helpers for portal-client integration tests.
//!
//! Provides:
//! - A routing `HttpFetch` mock keyed by the queried layer
//! - Map layer and view builders

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use portal_client::{
    Coordinate, FeatureQueryResult, HttpFetch, HttpResponse, LayerCollection, LayerSource,
    MapLayer, MapView, TileSource, WmsSource,
};
use url::Url;
use wms_common::{CrsCode, WmsError, WmsResult};
use wms_protocol::WmsLayerParams;

pub const WMS_URL: &str = "http://localhost:8082/geoserver/sembrando/wms";

/// Answers each GetFeatureInfo request by its `QUERY_LAYERS` value.
///
/// Unrouted requests fail with a transport error.
#[derive(Default)]
pub struct RoutedFetch {
    routes: HashMap<String, (u16, String)>,
    requests: Mutex<Vec<String>>,
}

impl RoutedFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, layer: &str, status: u16, body: impl Into<String>) -> Self {
        self.routes.insert(layer.to_string(), (status, body.into()));
        self
    }

    /// URLs requested so far, in call order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpFetch for RoutedFetch {
    async fn get(&self, url: &str) -> WmsResult<HttpResponse> {
        self.requests.lock().unwrap().push(url.to_string());

        let parsed = Url::parse(url).map_err(|e| WmsError::Transport(e.to_string()))?;
        let layer = parsed
            .query_pairs()
            .find(|(k, _)| k == "QUERY_LAYERS")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();

        match self.routes.get(&layer) {
            Some((status, body)) => Ok(HttpResponse::new(*status, body.clone())),
            None => Err(WmsError::Transport(format!("no route for '{}'", layer))),
        }
    }
}

/// Visible WMS layer `sembrando:<id>`.
pub fn wms_layer(id: &str) -> MapLayer {
    let name = format!("sembrando:{}", id);
    MapLayer::new(
        id,
        name.clone(),
        LayerSource::Wms(WmsSource::new(WMS_URL, WmsLayerParams::new(name))),
    )
}

pub fn tile_layer(id: &str) -> MapLayer {
    MapLayer::new(
        id,
        id,
        LayerSource::Tile(TileSource {
            url_template: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
        }),
    )
}

/// Web Mercator view at zoom 10 over the given layers.
pub fn view(layers: Vec<MapLayer>) -> MapView {
    let mut view = MapView::new(CrsCode::Epsg3857).with_layers(LayerCollection::from_layers(layers));
    view.set_zoom(10.0);
    view
}

/// Click near Pachuca, Hidalgo.
pub fn click() -> Coordinate {
    Coordinate::new(-10999000.0, 2272000.0)
}

/// Result with its timestamp zeroed, for comparing two runs of a query.
pub fn without_timestamp(mut result: FeatureQueryResult) -> FeatureQueryResult {
    result.timestamp = Default::default();
    result
}
