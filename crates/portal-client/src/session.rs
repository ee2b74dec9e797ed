//! Feature-info state for an interactive map.
//!
//! A `FeatureInfoSession` owns what a result panel shows: the last result,
//! the selected feature, the error message and whether the panel is open.
//! Each query moves it through idle → loading → success-with-features,
//! success-empty or failure.
//!
//! Panel policy: the panel opens only for a result with features. The two
//! aggregate outcomes "no queryable layers" and "no features found" close
//! it; any other failure keeps it open so the message can be shown.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};
use tracing::debug;
use wms_common::LayerId;
use wms_protocol::FeatureRecord;

use crate::feature_info::{FailureKind, FeatureInfoClient, FeatureQueryResult};
use crate::map::{Coordinate, LayerCollection, MapLayer, MapView, Subscription};

/// Error shown when a click carries no usable coordinate.
pub const MISSING_INPUT_MESSAGE: &str = "Map or coordinate not provided";

/// Error shown for a result with neither features nor an error message.
pub const NO_INFORMATION_MESSAGE: &str = "No information available at this location";

/// Snapshot of the session state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureInfoState {
    pub loading: bool,
    pub feature_info: Option<FeatureQueryResult>,
    pub error: Option<String>,
    pub selected_feature: Option<FeatureRecord>,
    pub show_panel: bool,
    pub click_coordinate: Option<Coordinate>,
    pub active_layer: Option<LayerId>,
}

impl FeatureInfoState {
    pub fn has_feature_info(&self) -> bool {
        self.feature_info
            .as_ref()
            .is_some_and(|result| !result.features.is_empty())
    }

    /// Attributes of the selected feature, empty when nothing is selected.
    pub fn feature_properties(&self) -> Map<String, Value> {
        self.selected_feature
            .as_ref()
            .and_then(FeatureRecord::properties)
            .cloned()
            .unwrap_or_default()
    }

    fn apply(&mut self, result: FeatureQueryResult) {
        if result.has_features() {
            self.selected_feature = result.features.first().cloned();
            self.show_panel = true;
        } else {
            self.selected_feature = None;
            match (&result.error, result.error_kind) {
                (Some(message), kind) => {
                    self.error = Some(message.clone());
                    self.show_panel = !kind.is_some_and(|k| k.is_nothing_to_show());
                }
                (None, _) => {
                    self.error = Some(NO_INFORMATION_MESSAGE.to_string());
                    self.show_panel = false;
                }
            }
        }
        self.feature_info = Some(result);
        self.loading = false;
    }

    fn clear_result(&mut self) {
        self.show_panel = false;
        self.selected_feature = None;
        self.feature_info = None;
    }
}

#[derive(Default)]
struct Inner {
    state: FeatureInfoState,
    /// Bumped on every query; results from older queries are dropped
    generation: u64,
}

/// Shared, cloneable feature-info state plus the client that fills it.
#[derive(Clone)]
pub struct FeatureInfoSession {
    client: FeatureInfoClient,
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for FeatureInfoSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureInfoSession")
            .field("state", &self.state())
            .finish()
    }
}

impl FeatureInfoSession {
    pub fn new(client: FeatureInfoClient) -> Self {
        Self {
            client,
            inner: Arc::default(),
        }
    }

    pub fn state(&self) -> FeatureInfoState {
        self.lock().state.clone()
    }

    /// Query `layer`, or every visible queryable layer when `None`, at
    /// `coordinate` and update the state with the outcome.
    ///
    /// Returns the state after the update. If another query started while
    /// this one was running, its result is discarded and the state is left
    /// to the newer query.
    pub async fn fetch_feature_info(
        &self,
        view: &MapView,
        coordinate: Option<Coordinate>,
        layer: Option<&LayerId>,
    ) -> FeatureInfoState {
        let Some(coordinate) = coordinate.filter(Coordinate::is_finite) else {
            let mut inner = self.lock();
            inner.state.error = Some(MISSING_INPUT_MESSAGE.to_string());
            return inner.state.clone();
        };

        let generation = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.state.loading = true;
            inner.state.error = None;
            inner.state.click_coordinate = Some(coordinate);
            if let Some(id) = layer {
                inner.state.active_layer = Some(id.clone());
            }
            inner.generation
        };

        let result = match layer {
            Some(id) => match view.layers.get(id) {
                Some(target) => {
                    self.client
                        .query_layer(view, coordinate, target, self.client.defaults())
                        .await
                }
                None => FeatureQueryResult::failed(
                    None,
                    FailureKind::MissingInput,
                    format!("Layer '{}' is not on the map", id),
                ),
            },
            None => self.client.query_all(view, coordinate, None).await,
        };

        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(generation, current = inner.generation, "Discarding superseded feature info");
            return inner.state.clone();
        }

        if layer.is_none() && result.success {
            if let Some(id) = &result.layer_id {
                inner.state.active_layer = Some(id.clone());
            }
        }
        inner.state.apply(result);
        inner.state.clone()
    }

    /// Hide the panel. The last result stays available.
    pub fn close_panel(&self) {
        self.lock().state.show_panel = false;
    }

    pub fn select_feature(&self, feature: FeatureRecord) {
        self.lock().state.selected_feature = Some(feature);
    }

    /// Close the panel and clear the result whenever `layers` is left with
    /// no visible queryable layer. The check also runs once immediately.
    pub fn watch_layers(&self, layers: &LayerCollection) -> Subscription {
        let inner = Arc::clone(&self.inner);
        let check = move |layers: &[MapLayer]| {
            if !layers.iter().any(MapLayer::is_queryable_visible) {
                debug!("No visible queryable layers left, closing feature info panel");
                inner
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .state
                    .clear_result();
            }
        };

        check(layers.layers());
        layers.subscribe(move |_, layers| check(layers))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_info::{QueryOptions, NO_FEATURES_FOUND_MESSAGE, NO_QUERYABLE_LAYERS_MESSAGE};
    use crate::http::{HttpFetch, HttpResponse};
    use crate::map::{LayerSource, WmsSource};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;
    use wms_common::{CrsCode, WmsResult};
    use wms_protocol::WmsLayerParams;

    struct FixedFetch(u16, String);

    #[async_trait]
    impl HttpFetch for FixedFetch {
        async fn get(&self, _url: &str) -> WmsResult<HttpResponse> {
            Ok(HttpResponse::new(self.0, self.1.clone()))
        }
    }

    /// Holds the first request until `release` is called; later requests
    /// answer at once.
    struct GatedFetch {
        gate: Notify,
        calls: AtomicUsize,
    }

    impl GatedFetch {
        fn release(&self) {
            self.gate.notify_one();
        }
    }

    #[async_trait]
    impl HttpFetch for GatedFetch {
        async fn get(&self, _url: &str) -> WmsResult<HttpResponse> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.gate.notified().await;
                let body = json!({"features": [{"id": "rios.1", "properties": {"nombre": "Tula"}}]});
                return Ok(HttpResponse::new(200, body.to_string()));
            }
            let body = json!({"features": [{"id": "rios.2", "properties": {"nombre": "Amajac"}}]});
            Ok(HttpResponse::new(200, body.to_string()))
        }
    }

    fn session(status: u16, body: Value) -> FeatureInfoSession {
        let http = Arc::new(FixedFetch(status, body.to_string()));
        FeatureInfoSession::new(FeatureInfoClient::new(http, QueryOptions::default()))
    }

    fn view_with(visible: bool) -> MapView {
        let layer = MapLayer::new(
            "rios",
            "sembrando:rios",
            LayerSource::Wms(WmsSource::new(
                "http://localhost:8082/geoserver/sembrando/wms",
                WmsLayerParams::new("sembrando:rios"),
            )),
        )
        .with_visible(visible);
        MapView::new(CrsCode::Epsg3857)
            .with_resolution(152.87)
            .with_layers(LayerCollection::from_layers(vec![layer]))
    }

    fn click() -> Option<Coordinate> {
        Some(Coordinate::new(-11009497.6, 2284767.3))
    }

    fn two_features() -> Value {
        json!({"features": [
            {"id": "rios.1", "properties": {"nombre": "Tula"}},
            {"id": "rios.2", "properties": {"nombre": "Amajac"}}
        ]})
    }

    #[tokio::test]
    async fn test_success_opens_panel() {
        let session = session(200, two_features());

        let state = session.fetch_feature_info(&view_with(true), click(), None).await;

        assert!(!state.loading);
        assert!(state.show_panel);
        assert!(state.has_feature_info());
        assert_eq!(state.error, None);
        assert_eq!(state.active_layer, Some(LayerId::from("rios")));
        assert_eq!(state.click_coordinate, click());
        assert_eq!(state.feature_properties()["nombre"], json!("Tula"));
    }

    #[tokio::test]
    async fn test_select_and_close() {
        let session = session(200, two_features());
        let state = session.fetch_feature_info(&view_with(true), click(), None).await;

        let second = state.feature_info.unwrap().features[1].clone();
        session.select_feature(second);
        assert_eq!(session.state().feature_properties()["nombre"], json!("Amajac"));

        session.close_panel();
        let state = session.state();
        assert!(!state.show_panel);
        assert!(state.has_feature_info());
    }

    #[tokio::test]
    async fn test_distinguished_failures_close_panel() {
        let session = session(200, two_features());
        let state = session.fetch_feature_info(&view_with(false), click(), None).await;
        assert!(!state.show_panel);
        assert_eq!(state.error.as_deref(), Some(NO_QUERYABLE_LAYERS_MESSAGE));

        let session = self::session(200, json!({"features": []}));
        let state = session.fetch_feature_info(&view_with(true), click(), None).await;
        assert!(!state.show_panel);
        assert_eq!(state.error.as_deref(), Some(NO_FEATURES_FOUND_MESSAGE));
        assert!(!state.has_feature_info());
    }

    #[tokio::test]
    async fn test_other_failures_keep_panel_open() {
        let session = session(500, json!({}));
        let rios = LayerId::from("rios");

        let state = session
            .fetch_feature_info(&view_with(true), click(), Some(&rios))
            .await;

        assert!(state.show_panel);
        assert_eq!(state.active_layer, Some(rios));
        assert!(state.error.unwrap().contains("500"));
        assert!(state.selected_feature.is_none());
    }

    #[tokio::test]
    async fn test_empty_success_reports_no_information() {
        let session = session(200, json!({"features": []}));
        let rios = LayerId::from("rios");

        let state = session
            .fetch_feature_info(&view_with(true), click(), Some(&rios))
            .await;

        assert!(!state.show_panel);
        assert_eq!(state.error.as_deref(), Some(NO_INFORMATION_MESSAGE));
    }

    #[tokio::test]
    async fn test_missing_coordinate() {
        let session = session(200, two_features());
        let state = session.fetch_feature_info(&view_with(true), None, None).await;
        assert_eq!(state.error.as_deref(), Some(MISSING_INPUT_MESSAGE));
        assert!(!state.loading);
        assert!(state.feature_info.is_none());
    }

    #[tokio::test]
    async fn test_superseded_click_is_discarded() {
        let http = Arc::new(GatedFetch {
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let session = FeatureInfoSession::new(FeatureInfoClient::new(
            http.clone(),
            QueryOptions::default(),
        ));
        let view = view_with(true);
        let second_click = Coordinate::new(-11000000.0, 2280000.0);

        let first = session.fetch_feature_info(&view, click(), None);
        tokio::pin!(first);
        assert!(futures::poll!(&mut first).is_pending());
        assert!(session.state().loading);

        let fresh = session
            .fetch_feature_info(&view, Some(second_click), None)
            .await;
        assert_eq!(fresh.feature_properties()["nombre"], json!("Amajac"));

        http.release();
        let stale = first.await;

        assert_eq!(http.calls.load(Ordering::SeqCst), 2);
        assert_eq!(stale, fresh);
        let state = session.state();
        assert_eq!(state.click_coordinate, Some(second_click));
        assert_eq!(state.feature_properties()["nombre"], json!("Amajac"));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_unsized_view_keeps_panel_open() {
        let session = session(200, two_features());
        let mut view = view_with(true);
        view.resolution = None;

        let state = session.fetch_feature_info(&view, click(), None).await;

        assert!(state.show_panel);
        assert!(!state.loading);
        assert!(state.error.unwrap().contains("no resolution"));
        assert_eq!(
            state.feature_info.and_then(|result| result.error_kind),
            Some(FailureKind::MissingInput)
        );
    }

    #[tokio::test]
    async fn test_watch_layers_clears_when_last_layer_hidden() {
        let session = session(200, two_features());
        let mut view = view_with(true);
        let subscription = session.watch_layers(&view.layers);

        session.fetch_feature_info(&view, click(), None).await;
        assert!(session.state().show_panel);

        view.layers.set_visible(&LayerId::from("rios"), false);
        let state = session.state();
        assert!(!state.show_panel);
        assert!(state.feature_info.is_none());
        assert!(state.selected_feature.is_none());

        drop(subscription);
        assert_eq!(view.layers.listener_count(), 0);
    }
}
