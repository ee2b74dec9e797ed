//! Grouped layer catalog.
//!
//! The catalog is what a layer manager lists: configured layers in the
//! `principal` and `extras` groups plus layers the user added at runtime
//! from the capabilities list, which go to the `dynamic` group.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;
use wms_common::{LayerDescriptor, LayerId};
use wms_protocol::{legend_url, WmsLayerParams};

use crate::config::{CatalogEntry, PortalConfig};
use crate::map::{LayerCollection, LayerSource, MapLayer, WmsSource};

const DYNAMIC_LAYER_DESCRIPTION: &str = "Dynamic GeoServer layer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerGroup {
    Principal,
    Extras,
    Dynamic,
}

impl LayerGroup {
    pub const ALL: [LayerGroup; 3] = [LayerGroup::Principal, LayerGroup::Extras, LayerGroup::Dynamic];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerGroup::Principal => "principal",
            LayerGroup::Extras => "extras",
            LayerGroup::Dynamic => "dynamic",
        }
    }
}

/// One togglable layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogLayer {
    pub id: LayerId,
    /// Fully-qualified layer name
    pub name: String,
    pub title: String,
    pub description: String,
    pub visible: bool,
    /// WMS endpoint the layer is drawn from
    pub url: String,
    pub params: WmsLayerParams,
    pub legend_url: Option<String>,
}

impl CatalogLayer {
    pub fn to_map_layer(&self) -> MapLayer {
        MapLayer {
            id: self.id.clone(),
            name: self.name.clone(),
            title: Some(self.title.clone()),
            visible: self.visible,
            source: LayerSource::Wms(WmsSource::new(self.url.clone(), self.params.clone())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayerCatalog {
    base_url: String,
    wms_url: String,
    principal: Vec<CatalogLayer>,
    extras: Vec<CatalogLayer>,
    dynamic: Vec<CatalogLayer>,
}

impl LayerCatalog {
    /// Catalog preloaded with the configured groups; `dynamic` starts empty.
    pub fn from_config(config: &PortalConfig) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let wms_url = config.wms_url();

        let build = |entries: &[CatalogEntry]| -> Vec<CatalogLayer> {
            entries
                .iter()
                .map(|entry| configured_layer(entry, &base_url, &wms_url))
                .collect()
        };

        let principal = build(&config.catalog.principal);
        let extras = build(&config.catalog.extras);
        debug!(principal = principal.len(), extras = extras.len(), "Built layer catalog");

        Self {
            base_url,
            wms_url,
            principal,
            extras,
            dynamic: Vec::new(),
        }
    }

    pub fn group(&self, group: LayerGroup) -> &[CatalogLayer] {
        match group {
            LayerGroup::Principal => &self.principal,
            LayerGroup::Extras => &self.extras,
            LayerGroup::Dynamic => &self.dynamic,
        }
    }

    /// All layers, group by group.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogLayer> {
        self.principal
            .iter()
            .chain(self.extras.iter())
            .chain(self.dynamic.iter())
    }

    pub fn find(&self, id: &LayerId) -> Option<&CatalogLayer> {
        self.iter().find(|layer| &layer.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&CatalogLayer> {
        self.iter().find(|layer| layer.name == name)
    }

    /// Add a discovered layer to the dynamic group, visible.
    ///
    /// Returns `None` when a dynamic layer with the same name already
    /// exists; the catalog is left unchanged in that case.
    pub fn add_dynamic_layer(&mut self, descriptor: &LayerDescriptor) -> Option<&CatalogLayer> {
        if self.dynamic.iter().any(|layer| layer.name == descriptor.name) {
            debug!(layer = %descriptor.name, "Dynamic layer already present");
            return None;
        }

        let title = if descriptor.title.is_empty() {
            descriptor.name.clone()
        } else {
            descriptor.title.clone()
        };
        let description = if descriptor.description.is_empty() {
            DYNAMIC_LAYER_DESCRIPTION.to_string()
        } else {
            descriptor.description.clone()
        };
        let legend = if descriptor.legend_url.is_empty() {
            legend_url(&self.base_url, &descriptor.name)
        } else {
            descriptor.legend_url.clone()
        };

        let layer = CatalogLayer {
            id: LayerId::new(format!("dynamic-{}", Uuid::new_v4())),
            name: descriptor.name.clone(),
            title,
            description,
            visible: true,
            url: self.wms_url.clone(),
            params: WmsLayerParams::new(descriptor.name.clone()),
            legend_url: Some(legend),
        };

        info!(layer = %layer.name, id = %layer.id, "Added dynamic layer");
        self.dynamic.push(layer);
        self.dynamic.last()
    }

    /// Remove dynamic layers named `name`. Returns whether any was removed.
    pub fn remove_dynamic_layer(&mut self, name: &str) -> bool {
        let before = self.dynamic.len();
        self.dynamic.retain(|layer| layer.name != name);
        let removed = self.dynamic.len() != before;
        if removed {
            info!(layer = %name, "Removed dynamic layer");
        }
        removed
    }

    /// Show or hide a layer in any group. Returns `false` for unknown ids.
    pub fn set_visible(&mut self, id: &LayerId, visible: bool) -> bool {
        let layer = self
            .principal
            .iter_mut()
            .chain(self.extras.iter_mut())
            .chain(self.dynamic.iter_mut())
            .find(|layer| &layer.id == id);

        match layer {
            Some(layer) => {
                layer.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Map layers for every catalog entry, in catalog order.
    pub fn to_map_layers(&self) -> Vec<MapLayer> {
        self.iter().map(CatalogLayer::to_map_layer).collect()
    }

    pub fn to_layer_collection(&self) -> LayerCollection {
        LayerCollection::from_layers(self.to_map_layers())
    }
}

fn configured_layer(entry: &CatalogEntry, base_url: &str, wms_url: &str) -> CatalogLayer {
    let (_, short_name) = LayerId::parse(&entry.name);
    let mut params = WmsLayerParams::new(entry.name.clone());
    if let Some(style) = &entry.style {
        params = params.with_style(style.clone());
    }

    CatalogLayer {
        id: LayerId::new(short_name),
        name: entry.name.clone(),
        title: entry.title.clone(),
        description: entry.description.clone(),
        visible: entry.visible,
        url: wms_url.to_string(),
        params,
        legend_url: Some(legend_url(base_url, &entry.name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, title: &str) -> LayerDescriptor {
        LayerDescriptor {
            id: LayerId::new(LayerId::parse(name).1),
            name: name.to_string(),
            title: title.to_string(),
            description: String::new(),
            bounding_box: None,
            styles: Vec::new(),
            legend_url: String::new(),
        }
    }

    #[test]
    fn test_default_groups() {
        let catalog = LayerCatalog::from_config(&PortalConfig::default());

        let principal: Vec<&str> = catalog
            .group(LayerGroup::Principal)
            .iter()
            .map(|l| l.title.as_str())
            .collect();
        assert_eq!(principal, vec!["Territorios", "Unidades de riego"]);
        assert_eq!(catalog.group(LayerGroup::Extras).len(), 2);
        assert!(catalog.group(LayerGroup::Dynamic).is_empty());

        let rios = catalog.find(&LayerId::from("rios")).unwrap();
        assert_eq!(rios.name, "sembrando:rios");
        assert_eq!(rios.url, "http://31.97.8.51:8082/geoserver/sembrando/wms");
        assert!(!rios.visible);
        assert!(rios.params.tiled);
    }

    #[test]
    fn test_add_dynamic_layer_dedupes_by_name() {
        let mut catalog = LayerCatalog::from_config(&PortalConfig::default());

        let added = catalog
            .add_dynamic_layer(&descriptor("sembrando:parcelas", "Parcelas"))
            .cloned()
            .unwrap();
        assert!(added.visible);
        assert!(added.id.as_str().starts_with("dynamic-"));
        assert_eq!(added.params.layers, "sembrando:parcelas");
        assert_eq!(added.description, DYNAMIC_LAYER_DESCRIPTION);
        assert!(added.legend_url.unwrap().ends_with("LAYER=sembrando:parcelas"));

        assert!(catalog
            .add_dynamic_layer(&descriptor("sembrando:parcelas", "Otra"))
            .is_none());
        assert_eq!(catalog.group(LayerGroup::Dynamic).len(), 1);
        assert_eq!(catalog.group(LayerGroup::Dynamic)[0].title, "Parcelas");

        let untitled = catalog
            .add_dynamic_layer(&descriptor("sembrando:pozos", ""))
            .unwrap();
        assert_eq!(untitled.title, "sembrando:pozos");
    }

    #[test]
    fn test_remove_dynamic_layer() {
        let mut catalog = LayerCatalog::from_config(&PortalConfig::default());
        catalog.add_dynamic_layer(&descriptor("sembrando:parcelas", "Parcelas"));

        assert!(catalog.remove_dynamic_layer("sembrando:parcelas"));
        assert!(!catalog.remove_dynamic_layer("sembrando:parcelas"));
        // Configured layers are not dynamic
        assert!(!catalog.remove_dynamic_layer("sembrando:rios"));
        assert!(catalog.find_by_name("sembrando:rios").is_some());
    }

    #[test]
    fn test_visibility_flows_into_map_layers() {
        let mut catalog = LayerCatalog::from_config(&PortalConfig::default());
        assert!(catalog.set_visible(&LayerId::from("territorios_28"), true));
        assert!(!catalog.set_visible(&LayerId::from("nope"), true));

        let layers = catalog.to_layer_collection();
        assert_eq!(layers.len(), 4);
        let visible: Vec<&str> = layers.visible_queryable().map(|l| l.name.as_str()).collect();
        assert_eq!(visible, vec!["sembrando:territorios_28"]);
    }
}
