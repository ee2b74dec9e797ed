//! Client-side logic of the geoportal.
//!
//! Discovers workspace layers through GetCapabilities, answers map clicks
//! with GetFeatureInfo queries and keeps the layer catalog and the
//! feature-info panel state.
//!
//! ```ignore
//! let config = PortalConfig::from_env()?;
//! let http: Arc<dyn HttpFetch> = Arc::new(ReqwestFetch::from_config(&config)?);
//!
//! let catalog = LayerCatalog::from_config(&config);
//! let view = MapView::from_defaults(&config.map)?.with_layers(catalog.to_layer_collection());
//!
//! let client = FeatureInfoClient::from_config(http, &config);
//! let result = client.query_all(&view, click, None).await;
//! ```

pub mod capabilities;
pub mod catalog;
pub mod config;
pub mod feature_info;
pub mod http;
pub mod map;
pub mod session;

pub use capabilities::CapabilitiesClient;
pub use catalog::{CatalogLayer, LayerCatalog, LayerGroup};
pub use config::{CatalogConfig, CatalogEntry, MapDefaults, PortalConfig};
pub use feature_info::{
    FailureKind, FeatureInfoClient, FeatureQueryResult, QueryOptions, NO_FEATURES_FOUND_MESSAGE,
    NO_QUERYABLE_LAYERS_MESSAGE,
};
pub use http::{HttpFetch, HttpResponse, ReqwestFetch};
pub use map::{
    resolution_for_zoom, Coordinate, FeatureInfoSource, LayerCollection, LayerEvent, LayerSource,
    MapLayer, MapView, Subscription, TileSource, WmsSource,
};
pub use session::{FeatureInfoSession, FeatureInfoState};
