//! End-to-end tests against a local HTTP server speaking enough WMS.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use portal_client::{
    CapabilitiesClient, FeatureInfoClient, FeatureInfoSession, HttpFetch, LayerCatalog, LayerGroup,
    MapView, PortalConfig, QueryOptions, ReqwestFetch,
};
use test_utils::{empty_feature_collection, single_feature_body, CAPABILITIES_1_1_1};
use wms_common::LayerId;

async fn wms_handler(Query(params): Query<HashMap<String, String>>) -> (StatusCode, String) {
    let param = |name: &str| {
        params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .unwrap_or("")
    };

    match param("REQUEST") {
        "GetCapabilities" => (StatusCode::OK, CAPABILITIES_1_1_1.to_string()),
        "GetFeatureInfo" => match param("QUERY_LAYERS") {
            "sembrando:territorios_28" => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "java.lang.NullPointerException".to_string(),
            ),
            "sembrando:rios" => (StatusCode::OK, single_feature_body("rios")),
            _ => (StatusCode::OK, empty_feature_collection().to_string()),
        },
        _ => (StatusCode::BAD_REQUEST, String::new()),
    }
}

/// Serve the mock WMS on an ephemeral port.
async fn spawn_server() -> SocketAddr {
    let app = Router::new().route("/geoserver/sembrando/wms", get(wms_handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config_for(addr: SocketAddr) -> PortalConfig {
    PortalConfig {
        base_url: format!("http://{}/geoserver", addr),
        request_timeout_secs: 5,
        ..PortalConfig::default()
    }
}

fn http_for(config: &PortalConfig) -> Arc<dyn HttpFetch> {
    Arc::new(ReqwestFetch::from_config(config).unwrap())
}

// ============================================================================
// Capabilities
// ============================================================================

#[tokio::test]
async fn test_fetch_capabilities_over_http() {
    let config = config_for(spawn_server().await);
    let client = CapabilitiesClient::from_config(http_for(&config), &config);

    let layers = client.try_fetch_layers().await.unwrap();

    assert_eq!(layers.len(), 3);
    assert!(layers[0].legend_url.starts_with(&config.base_url));
}

#[tokio::test]
async fn test_unreachable_server_yields_no_layers() {
    let config = PortalConfig {
        // Port 9 (discard) is closed on test machines
        base_url: "http://127.0.0.1:9/geoserver".to_string(),
        request_timeout_secs: 2,
        ..PortalConfig::default()
    };
    let client = CapabilitiesClient::from_config(http_for(&config), &config);

    assert!(client.fetch_layers().await.is_empty());
    assert!(client.try_fetch_layers().await.is_err());
}

// ============================================================================
// Feature info
// ============================================================================

#[tokio::test]
async fn test_server_error_is_absorbed_by_aggregate() {
    let config = config_for(spawn_server().await);
    let http = http_for(&config);

    let mut catalog = LayerCatalog::from_config(&config);
    catalog.set_visible(&LayerId::from("territorios_28"), true);
    catalog.set_visible(&LayerId::from("rios"), true);

    let view = MapView::from_defaults(&config.map)
        .unwrap()
        .with_layers(catalog.to_layer_collection());
    let click = view.coordinate_from_lon_lat(-98.73, 20.12).unwrap();
    let client = FeatureInfoClient::from_config(http, &config);

    let failed = client
        .query_layer(
            &view,
            click,
            view.layers.get(&LayerId::from("territorios_28")).unwrap(),
            &QueryOptions::default(),
        )
        .await;
    assert!(!failed.success);
    assert!(failed.error.unwrap().contains("500"));

    let mut aggregate = client.query_all(&view, click, None).await;
    let mut rios = client
        .query_layer(
            &view,
            click,
            view.layers.get(&LayerId::from("rios")).unwrap(),
            &QueryOptions::default(),
        )
        .await;

    aggregate.timestamp = Default::default();
    rios.timestamp = Default::default();
    assert_eq!(aggregate, rios);
    assert_eq!(aggregate.features.len(), 1);
}

#[tokio::test]
async fn test_discovered_layer_through_session() {
    let config = config_for(spawn_server().await);
    let http = http_for(&config);

    let discovered = CapabilitiesClient::from_config(http.clone(), &config)
        .fetch_layers()
        .await;
    let rios = discovered.iter().find(|l| l.id.as_str() == "rios").unwrap();

    let mut catalog = LayerCatalog::from_config(&config);
    catalog.add_dynamic_layer(rios);
    assert_eq!(catalog.group(LayerGroup::Dynamic).len(), 1);

    let view = MapView::from_defaults(&config.map)
        .unwrap()
        .with_layers(catalog.to_layer_collection());
    let session = FeatureInfoSession::new(FeatureInfoClient::from_config(http, &config));
    let _subscription = session.watch_layers(&view.layers);

    let click = view.coordinate_from_lon_lat(-98.9, 20.1).ok();
    let state = session.fetch_feature_info(&view, click, None).await;

    assert!(state.show_panel);
    assert!(state.has_feature_info());
    assert_eq!(state.feature_properties()["nombre"], "rios feature");
    let active = state.active_layer.unwrap();
    assert!(active.as_str().starts_with("dynamic-"));
}
