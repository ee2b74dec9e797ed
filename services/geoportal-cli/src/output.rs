//! Plain-text rendering of command results.

use std::fmt::Write;

use chart_analysis::{ChartConfig, DatasetValues};
use portal_client::{FeatureInfoState, LayerCatalog, LayerGroup, PortalConfig};
use serde_json::Value;
use wms_common::LayerDescriptor;

/// One line per layer: id, title and bounding box when known.
pub fn layers_table(layers: &[LayerDescriptor]) -> String {
    if layers.is_empty() {
        return "No layers published\n".to_string();
    }

    let width = layers.iter().map(|l| l.id.as_str().len()).max().unwrap_or(0);
    let mut out = String::new();
    for layer in layers {
        let _ = write!(out, "{:<width$}  {}", layer.id.as_str(), layer.title, width = width);
        if let Some(bbox) = &layer.bounding_box {
            let _ = write!(
                out,
                "  [{:.4}, {:.4}, {:.4}, {:.4}] {}",
                bbox.bbox.min_x,
                bbox.bbox.min_y,
                bbox.bbox.max_x,
                bbox.bbox.max_y,
                bbox.crs.as_deref().unwrap_or("-")
            );
        }
        out.push('\n');
    }
    out
}

/// Service endpoints the catalog layers are served from.
pub fn endpoints(config: &PortalConfig) -> String {
    format!("WMS  {}\nWFS  {}\n", config.wms_url(), config.wfs_url())
}

pub fn catalog_listing(catalog: &LayerCatalog) -> String {
    let mut out = String::new();
    for group in LayerGroup::ALL {
        let layers = catalog.group(group);
        if layers.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{}:", group.as_str());
        for layer in layers {
            let _ = writeln!(out, "  {} ({})", layer.title, layer.name);
            if !layer.description.is_empty() {
                let _ = writeln!(out, "    {}", layer.description);
            }
        }
    }
    out
}

/// Summary of a feature-info query: the answering layer and the attributes
/// of the selected feature, or the error.
pub fn feature_info_summary(state: &FeatureInfoState) -> String {
    let mut out = String::new();

    if let Some(coordinate) = &state.click_coordinate {
        let _ = writeln!(out, "Clicked at {}", coordinate);
    }

    match &state.feature_info {
        Some(result) if result.has_features() => {
            let _ = writeln!(
                out,
                "{}: {} feature(s)",
                result.layer_name,
                result.features.len()
            );
            for (key, value) in state.feature_properties() {
                let _ = writeln!(out, "  {} = {}", key, display_value(&value));
            }
        }
        _ => {
            if let Some(error) = &state.error {
                let _ = writeln!(out, "{}", error);
            }
        }
    }

    out
}

pub fn chart_summary(configs: &[ChartConfig]) -> String {
    if configs.is_empty() {
        return "No charts for this table\n".to_string();
    }

    let mut out = String::new();
    for config in configs {
        let items = config
            .data
            .datasets
            .first()
            .map(|dataset| match &dataset.data {
                DatasetValues::Counts(counts) => counts.len(),
                DatasetValues::BoxPlots(stats) => stats.len(),
                DatasetValues::Points(points) => points.len(),
            })
            .unwrap_or(0);
        let kind = serde_json::to_value(config.kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let _ = writeln!(out, "{:<8} {} ({} items)", kind, config.title, items);
    }
    out
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
