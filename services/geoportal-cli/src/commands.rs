//! Command implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chart_analysis::{analyze_data, rows_from_json, rows_from_str};
use portal_client::{
    CapabilitiesClient, FeatureInfoClient, FeatureInfoSession, HttpFetch, LayerCatalog,
    MapView, PortalConfig, ReqwestFetch,
};
use tracing::{debug, info};
use wms_common::LayerId;
use wms_protocol::legend_url;

use crate::output;

pub fn load_config(path: Option<&Path>) -> Result<PortalConfig> {
    match path {
        Some(path) => PortalConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => PortalConfig::from_env().context("Invalid configuration in environment"),
    }
}

fn http_client(config: &PortalConfig) -> Result<Arc<dyn HttpFetch>> {
    let http = ReqwestFetch::from_config(config).context("Failed to build HTTP client")?;
    Ok(Arc::new(http))
}

/// `workspace:name` for a short name; qualified names are kept.
pub fn qualify(name: &str, workspace: &str) -> String {
    if name.contains(':') {
        name.to_string()
    } else {
        format!("{}:{}", workspace, name)
    }
}

pub async fn layers(config: &PortalConfig, json: bool) -> Result<()> {
    let client = CapabilitiesClient::from_config(http_client(config)?, config);
    let layers = client
        .try_fetch_layers()
        .await
        .with_context(|| format!("Failed to fetch capabilities from {}", client.url()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&layers)?);
    } else {
        print!("{}", output::layers_table(&layers));
    }
    Ok(())
}

pub fn catalog(config: &PortalConfig) -> Result<()> {
    println!("{}", output::endpoints(config));
    print!("{}", output::catalog_listing(&LayerCatalog::from_config(config)));
    Ok(())
}

pub struct QueryArgs {
    pub lon: f64,
    pub lat: f64,
    pub zoom: Option<f64>,
    pub layers: Vec<String>,
    pub json: bool,
    pub charts: bool,
}

pub async fn query(config: &PortalConfig, args: QueryArgs) -> Result<()> {
    let http = http_client(config)?;
    let mut catalog = LayerCatalog::from_config(config);

    if args.layers.is_empty() {
        let ids: Vec<LayerId> = catalog.iter().map(|layer| layer.id.clone()).collect();
        for id in &ids {
            catalog.set_visible(id, true);
        }
    } else {
        let capabilities = CapabilitiesClient::from_config(http.clone(), config);
        select_layers(&mut catalog, &args.layers, &config.workspace, &capabilities).await?;
    }

    let mut view = MapView::from_defaults(&config.map)?.with_layers(catalog.to_layer_collection());
    if let Some(zoom) = args.zoom {
        if !(config.map.min_zoom..=config.map.max_zoom).contains(&zoom) {
            bail!(
                "zoom {} outside {}..={}",
                zoom,
                config.map.min_zoom,
                config.map.max_zoom
            );
        }
        view.set_zoom(zoom);
    }

    let coordinate = view
        .coordinate_from_lon_lat(args.lon, args.lat)
        .context("Failed to project the query position")?;
    info!(
        lon = args.lon,
        lat = args.lat,
        layers = view.layers.visible_queryable().count(),
        "Querying feature info"
    );

    let session = FeatureInfoSession::new(FeatureInfoClient::from_config(http, config));
    let state = session.fetch_feature_info(&view, Some(coordinate), None).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&state.feature_info)?);
    } else {
        print!("{}", output::feature_info_summary(&state));
    }

    if args.charts {
        let data = state
            .feature_info
            .as_ref()
            .filter(|result| result.has_features())
            .and_then(|result| result.data.clone());
        match data {
            Some(data) => {
                let rows = rows_from_json(data).context("Feature info is not a table")?;
                print!("{}", output::chart_summary(&analyze_data(&rows)));
            }
            None => debug!("No features to chart"),
        }
    }

    Ok(())
}

/// Make the named layers visible. Names missing from the catalog are looked
/// up in the capabilities document and added as dynamic layers.
async fn select_layers(
    catalog: &mut LayerCatalog,
    names: &[String],
    workspace: &str,
    capabilities: &CapabilitiesClient,
) -> Result<()> {
    let mut discovered = None;

    for name in names {
        let full_name = qualify(name, workspace);

        if let Some(id) = catalog.find_by_name(&full_name).map(|l| l.id.clone()) {
            catalog.set_visible(&id, true);
            continue;
        }

        if discovered.is_none() {
            let layers = capabilities
                .try_fetch_layers()
                .await
                .context("Failed to fetch capabilities")?;
            discovered = Some(layers);
        }

        let descriptor = discovered
            .iter()
            .flatten()
            .find(|layer| layer.name == full_name);
        match descriptor {
            Some(descriptor) => {
                catalog.add_dynamic_layer(descriptor);
            }
            None => bail!("Layer '{}' is not published in workspace '{}'", name, workspace),
        }
    }

    Ok(())
}

pub fn legend(config: &PortalConfig, name: &str) -> Result<()> {
    println!("{}", legend_url(&config.base_url, &qualify(name, &config.workspace)));
    Ok(())
}

pub fn analyze(file: &Path, summary: bool) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let rows = rows_from_str(&contents)
        .with_context(|| format!("Failed to parse table from {}", file.display()))?;
    info!(rows = rows.len(), file = %file.display(), "Analyzing table");

    let configs = analyze_data(&rows);
    if summary {
        print!("{}", output::chart_summary(&configs));
    } else {
        println!("{}", serde_json::to_string_pretty(&configs)?);
    }
    Ok(())
}
