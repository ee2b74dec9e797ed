//! Map view and layer model.
//!
//! This is the part of a web map the feature-info code needs to see: the
//! current resolution and projection plus the ordered set of rendered
//! layers. Only WMS sources can be queried for feature info; that
//! capability is expressed by the `FeatureInfoSource` trait.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::{Deserialize, Serialize};
use tracing::debug;
use wms_common::crs::WEB_MERCATOR_EXTENT;
use wms_common::{wgs84_to_mercator, CrsCode, LayerId, WmsError, WmsResult};
use wms_protocol::{GetFeatureInfoRequest, WmsLayerParams};

use crate::config::MapDefaults;
use crate::feature_info::QueryOptions;

/// Tile size the zoom/resolution conversion assumes.
const TILE_SIZE: f64 = 256.0;

/// A position in the view projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// Map units per pixel at `zoom` for the usual 256px tile pyramid.
///
/// `None` for projections without a known world extent.
pub fn resolution_for_zoom(projection: &CrsCode, zoom: f64) -> Option<f64> {
    let world_width = match projection {
        CrsCode::Epsg3857 => 2.0 * WEB_MERCATOR_EXTENT,
        CrsCode::Epsg4326 | CrsCode::Epsg4269 => 360.0,
        CrsCode::Custom(_) => return None,
    };
    Some(world_width / TILE_SIZE / 2f64.powf(zoom))
}

/// A layer source that can build GetFeatureInfo URLs.
pub trait FeatureInfoSource: Send + Sync {
    /// URL querying the layer at `coordinate`, seen at `resolution` in
    /// `projection`.
    fn feature_info_url(
        &self,
        coordinate: Coordinate,
        resolution: f64,
        projection: &CrsCode,
        options: &QueryOptions,
    ) -> WmsResult<String>;
}

/// WMS image source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WmsSource {
    /// WMS endpoint, e.g. "http://host/geoserver/sembrando/wms"
    pub url: String,
    pub params: WmsLayerParams,
}

impl WmsSource {
    pub fn new(url: impl Into<String>, params: WmsLayerParams) -> Self {
        Self {
            url: url.into(),
            params,
        }
    }
}

impl FeatureInfoSource for WmsSource {
    fn feature_info_url(
        &self,
        coordinate: Coordinate,
        resolution: f64,
        projection: &CrsCode,
        options: &QueryOptions,
    ) -> WmsResult<String> {
        let layers = self.params.layer_names();
        let mut request = GetFeatureInfoRequest::at_coordinate(
            coordinate.x,
            coordinate.y,
            resolution,
            projection.clone(),
            layers.clone(),
            self.params.version,
        )?
        .with_query_layers(layers)
        .with_info_format(options.format)
        .with_feature_count(options.feature_count);

        for (key, value) in self.params.to_query_pairs() {
            request = request.with_param(key, value);
        }

        request.to_url(&self.url)
    }
}

/// XYZ tile source. Tiles carry no attributes, so it cannot be queried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileSource {
    /// URL template with `{z}`, `{x}` and `{y}` placeholders
    pub url_template: String,
}

/// Where a layer's imagery comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSource {
    Wms(WmsSource),
    Tile(TileSource),
}

impl LayerSource {
    /// The source's feature-info capability, if it has one.
    pub fn feature_info(&self) -> Option<&dyn FeatureInfoSource> {
        match self {
            LayerSource::Wms(source) => Some(source),
            LayerSource::Tile(_) => None,
        }
    }
}

/// A layer rendered on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapLayer {
    pub id: LayerId,
    pub name: String,
    pub title: Option<String>,
    pub visible: bool,
    pub source: LayerSource,
}

impl MapLayer {
    pub fn new(id: impl Into<String>, name: impl Into<String>, source: LayerSource) -> Self {
        Self {
            id: LayerId::new(id),
            name: name.into(),
            title: None,
            visible: true,
            source,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Name, falling back to the title and then to "unknown".
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else {
            self.title
                .as_deref()
                .filter(|t| !t.is_empty())
                .unwrap_or("unknown")
        }
    }

    pub fn is_queryable(&self) -> bool {
        self.source.feature_info().is_some()
    }

    /// Visible and backed by a queryable source.
    pub fn is_queryable_visible(&self) -> bool {
        self.visible && self.is_queryable()
    }
}

/// A change to a `LayerCollection`.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerEvent {
    Added(LayerId),
    Removed(LayerId),
    VisibilityChanged { id: LayerId, visible: bool },
}

type Listener = Box<dyn Fn(&LayerEvent, &[MapLayer]) + Send + Sync>;

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Ordered layer set with change notification.
///
/// Listeners run synchronously after each change and see the updated
/// layers. A listener must not drop its own `Subscription`.
#[derive(Default)]
pub struct LayerCollection {
    layers: Vec<MapLayer>,
    registry: Arc<Mutex<ListenerRegistry>>,
}

impl fmt::Debug for LayerCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerCollection")
            .field("layers", &self.layers)
            .field("listeners", &self.registry().listeners.len())
            .finish()
    }
}

impl LayerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_layers(layers: Vec<MapLayer>) -> Self {
        Self {
            layers,
            registry: Arc::default(),
        }
    }

    pub fn layers(&self) -> &[MapLayer] {
        &self.layers
    }

    pub fn iter(&self) -> impl Iterator<Item = &MapLayer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, id: &LayerId) -> Option<&MapLayer> {
        self.layers.iter().find(|l| &l.id == id)
    }

    /// Visible layers whose source supports feature info, in map order.
    pub fn visible_queryable(&self) -> impl Iterator<Item = &MapLayer> {
        self.layers.iter().filter(|l| l.is_queryable_visible())
    }

    pub fn has_visible_queryable(&self) -> bool {
        self.visible_queryable().next().is_some()
    }

    /// Append a layer, replacing any layer with the same id.
    pub fn add(&mut self, layer: MapLayer) {
        let id = layer.id.clone();
        match self.layers.iter_mut().find(|l| l.id == id) {
            Some(existing) => *existing = layer,
            None => self.layers.push(layer),
        }
        self.notify(LayerEvent::Added(id));
    }

    pub fn remove(&mut self, id: &LayerId) -> Option<MapLayer> {
        let index = self.layers.iter().position(|l| &l.id == id)?;
        let removed = self.layers.remove(index);
        self.notify(LayerEvent::Removed(removed.id.clone()));
        Some(removed)
    }

    /// Change a layer's visibility. Returns `false` for unknown ids.
    ///
    /// Listeners only hear about actual changes.
    pub fn set_visible(&mut self, id: &LayerId, visible: bool) -> bool {
        let Some(layer) = self.layers.iter_mut().find(|l| &l.id == id) else {
            return false;
        };
        if layer.visible != visible {
            layer.visible = visible;
            self.notify(LayerEvent::VisibilityChanged {
                id: id.clone(),
                visible,
            });
        }
        true
    }

    /// Register a change listener. It stays registered until the returned
    /// handle is unsubscribed or dropped.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&LayerEvent, &[MapLayer]) + Send + Sync + 'static,
    {
        let mut registry = self.registry();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Box::new(listener)));

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry().listeners.len()
    }

    fn notify(&self, event: LayerEvent) {
        let registry = self.registry();
        debug!(event = ?event, listeners = registry.listeners.len(), "Layer collection changed");
        for (_, listener) in &registry.listeners {
            listener(&event, &self.layers);
        }
    }

    fn registry(&self) -> MutexGuard<'_, ListenerRegistry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Handle for a `LayerCollection` listener.
#[must_use = "the listener is removed when the subscription is dropped"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<ListenerRegistry>>,
}

impl Subscription {
    /// Remove the listener now.
    pub fn unsubscribe(self) {}

    /// Whether the collection this subscription belongs to still exists.
    pub fn is_active(&self) -> bool {
        self.registry.strong_count() > 0
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock().unwrap_or_else(|e| e.into_inner());
            registry.listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Current view state plus the rendered layers.
#[derive(Debug)]
pub struct MapView {
    /// Map units per pixel; `None` until the view has been sized
    pub resolution: Option<f64>,
    pub projection: CrsCode,
    pub layers: LayerCollection,
}

impl MapView {
    pub fn new(projection: CrsCode) -> Self {
        Self {
            resolution: None,
            projection,
            layers: LayerCollection::new(),
        }
    }

    /// View at the configured projection and initial zoom.
    pub fn from_defaults(defaults: &MapDefaults) -> WmsResult<Self> {
        let projection = CrsCode::from_wms_string(&defaults.projection)
            .map_err(|e| WmsError::InvalidCrs(format!("{}: {}", defaults.projection, e)))?;
        let mut view = Self::new(projection);
        view.set_zoom(defaults.zoom);
        Ok(view)
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = Some(resolution);
        self
    }

    pub fn with_layers(mut self, layers: LayerCollection) -> Self {
        self.layers = layers;
        self
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.resolution = resolution_for_zoom(&self.projection, zoom);
    }

    /// Convert a WGS84 position into the view projection.
    pub fn coordinate_from_lon_lat(&self, lon: f64, lat: f64) -> WmsResult<Coordinate> {
        match self.projection {
            CrsCode::Epsg3857 => {
                let (x, y) = wgs84_to_mercator(lon, lat);
                Ok(Coordinate::new(x, y))
            }
            CrsCode::Epsg4326 | CrsCode::Epsg4269 => Ok(Coordinate::new(lon, lat)),
            CrsCode::Custom(ref code) => Err(WmsError::InvalidCrs(format!(
                "no WGS84 transform for {}",
                code
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use test_utils::{assert_approx_eq, assert_coords_approx_eq};

    fn wms_layer(id: &str, visible: bool) -> MapLayer {
        MapLayer::new(
            id,
            format!("sembrando:{}", id),
            LayerSource::Wms(WmsSource::new(
                "http://localhost:8082/geoserver/sembrando/wms",
                WmsLayerParams::new(format!("sembrando:{}", id)),
            )),
        )
        .with_visible(visible)
    }

    fn tile_layer(id: &str) -> MapLayer {
        MapLayer::new(
            id,
            id,
            LayerSource::Tile(TileSource {
                url_template: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            }),
        )
    }

    #[test]
    fn test_only_wms_sources_are_queryable() {
        assert!(wms_layer("rios", true).is_queryable());
        assert!(!tile_layer("osm").is_queryable());
        assert!(!wms_layer("rios", false).is_queryable_visible());
    }

    #[test]
    fn test_feature_info_url() {
        let source = WmsSource::new(
            "http://localhost:8082/geoserver/sembrando/wms",
            WmsLayerParams::new("sembrando:rios"),
        );
        let url = source
            .feature_info_url(
                Coordinate::new(-11009497.0, 2284767.0),
                152.87,
                &CrsCode::Epsg3857,
                &QueryOptions::default(),
            )
            .unwrap();

        assert!(url.starts_with("http://localhost:8082/geoserver/sembrando/wms?"));
        assert!(url.contains("REQUEST=GetFeatureInfo"));
        assert!(url.contains("QUERY_LAYERS=sembrando%3Arios"));
        assert!(url.contains("INFO_FORMAT=application%2Fjson"));
        assert!(url.contains("FEATURE_COUNT=10"));
        assert!(url.contains("X=50"));
        assert!(url.contains("Y=50"));
        assert!(url.contains("SRS=EPSG%3A3857"));
        assert!(url.contains("TILED=true"));
    }

    #[test]
    fn test_resolution_for_zoom() {
        let r0 = resolution_for_zoom(&CrsCode::Epsg3857, 0.0).unwrap();
        assert_approx_eq!(r0, 156543.03392804097, 1e-6);
        let r9 = resolution_for_zoom(&CrsCode::Epsg3857, 9.0).unwrap();
        assert_approx_eq!(r9, r0 / 512.0, 1e-9);
        assert!(resolution_for_zoom(&CrsCode::Custom("EPSG:32614".into()), 3.0).is_none());
    }

    #[test]
    fn test_view_from_defaults() {
        let view = MapView::from_defaults(&MapDefaults::default()).unwrap();
        assert_eq!(view.projection, CrsCode::Epsg3857);
        assert!(view.resolution.unwrap() > 305.0 && view.resolution.unwrap() < 306.0);

        let center = view.coordinate_from_lon_lat(-98.9, 20.1).unwrap();
        assert_coords_approx_eq!((center.x, center.y), (-11009497.64, 2284881.07), 1.0);

        let geographic = MapView::new(CrsCode::Epsg4326);
        let center = geographic.coordinate_from_lon_lat(-98.9, 20.1).unwrap();
        assert_coords_approx_eq!((center.x, center.y), (-98.9, 20.1), 1e-12);
    }

    #[test]
    fn test_collection_updates() {
        let mut layers = LayerCollection::new();
        layers.add(wms_layer("rios", false));
        layers.add(tile_layer("osm"));
        assert!(!layers.has_visible_queryable());

        assert!(layers.set_visible(&LayerId::from("rios"), true));
        assert!(layers.has_visible_queryable());
        assert!(!layers.set_visible(&LayerId::from("nope"), true));

        layers.add(wms_layer("rios", false));
        assert_eq!(layers.len(), 2);
        assert!(!layers.has_visible_queryable());

        assert!(layers.remove(&LayerId::from("osm")).is_some());
        assert!(layers.remove(&LayerId::from("osm")).is_none());
    }

    #[test]
    fn test_subscription_lifecycle() {
        let mut layers = LayerCollection::from_layers(vec![wms_layer("rios", true)]);
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let subscription = layers.subscribe(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(layers.listener_count(), 1);

        layers.set_visible(&LayerId::from("rios"), false);
        // No change, no event
        layers.set_visible(&LayerId::from("rios"), false);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        subscription.unsubscribe();
        assert_eq!(layers.listener_count(), 0);
        layers.set_visible(&LayerId::from("rios"), true);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_outlives_collection() {
        let layers = LayerCollection::new();
        let subscription = layers.subscribe(|_, _| {});
        assert!(subscription.is_active());
        drop(layers);
        assert!(!subscription.is_active());
    }
}
