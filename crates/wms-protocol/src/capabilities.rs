//! WMS GetCapabilities parsing.
//!
//! Extracts a flat list of named layers from a capabilities document.
//! Group layers (no `Name`) are skipped, but their children are still
//! visited, and only layers inside the configured workspace are kept.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;
use wms_common::bbox::BboxParseError;
use wms_common::{
    BoundingBox, LayerBoundingBox, LayerDescriptor, LayerId, LayerStyle, WmsError, WmsResult,
};

use crate::exceptions::parse_service_exception;

/// Server settings needed to turn capability entries into descriptors.
#[derive(Debug, Clone)]
pub struct CapabilitiesOptions {
    /// Server base URL, e.g. "http://host:8082/geoserver"
    pub base_url: String,
    /// Workspace whose layers are kept
    pub workspace: String,
}

impl CapabilitiesOptions {
    pub fn new(base_url: impl Into<String>, workspace: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            workspace: workspace.into(),
        }
    }

    fn prefix(&self) -> String {
        format!("{}:", self.workspace)
    }
}

/// URL of the workspace-scoped GetCapabilities document.
pub fn capabilities_url(base_url: &str, workspace: &str) -> String {
    format!(
        "{}/{}/wms?service=WMS&version=1.1.1&request=GetCapabilities",
        base_url.trim_end_matches('/'),
        workspace
    )
}

/// GetLegendGraphic URL for a fully-qualified layer name. No request is made.
pub fn legend_url(base_url: &str, layer_name: &str) -> String {
    format!(
        "{}/wms?REQUEST=GetLegendGraphic&VERSION=1.0.0&FORMAT=image/png&WIDTH=20&HEIGHT=20&LAYER={}",
        base_url.trim_end_matches('/'),
        layer_name
    )
}

const LAYER: &[u8] = b"Layer";
const STYLE: &[u8] = b"Style";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Title,
    Abstract,
}

#[derive(Default)]
struct StyleNode {
    name: Option<String>,
    title: Option<String>,
}

#[derive(Default)]
struct LayerNode {
    /// Position of this layer in document order
    slot: usize,
    name: Option<String>,
    title: Option<String>,
    abstract_text: Option<String>,
    bbox_seen: bool,
    bounding_box: Option<LayerBoundingBox>,
    styles: Vec<LayerStyle>,
}

impl LayerNode {
    fn set(&mut self, field: Field, text: String) {
        match field {
            Field::Name => self.name = Some(text),
            Field::Title => self.title = Some(text),
            Field::Abstract => self.abstract_text = Some(text),
        }
    }

    /// Only the first `BoundingBox` of a layer is considered.
    fn take_bounding_box(&mut self, element: &BytesStart<'_>) {
        if self.bbox_seen {
            return;
        }
        self.bbox_seen = true;

        match read_bounding_box(element) {
            Ok(bbox) => self.bounding_box = Some(bbox),
            Err(e) => debug!(error = %e, "Ignoring unusable BoundingBox"),
        }
    }

    fn into_descriptor(self, options: &CapabilitiesOptions) -> Option<LayerDescriptor> {
        let (name, title) = match (self.name, self.title) {
            (Some(name), Some(title)) => (name, title),
            _ => return None,
        };

        let id = name.strip_prefix(&options.prefix())?.to_string();

        Some(LayerDescriptor {
            id: LayerId::new(id),
            legend_url: legend_url(&options.base_url, &name),
            name,
            title,
            description: self.abstract_text.unwrap_or_default(),
            bounding_box: self.bounding_box,
            styles: self.styles,
        })
    }
}

fn read_bounding_box(element: &BytesStart<'_>) -> Result<LayerBoundingBox, BboxParseError> {
    let mut min_x = None;
    let mut min_y = None;
    let mut max_x = None;
    let mut max_y = None;
    let mut crs = None;
    let mut srs = None;

    for attr in element.attributes().flatten() {
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => continue,
        };
        match attr.key.as_ref() {
            b"minx" => min_x = Some(value),
            b"miny" => min_y = Some(value),
            b"maxx" => max_x = Some(value),
            b"maxy" => max_y = Some(value),
            b"CRS" => crs = Some(value),
            b"SRS" => srs = Some(value),
            _ => {}
        }
    }

    let bbox = BoundingBox::from_extrema(
        &min_x.ok_or(BboxParseError::MissingExtent("minx"))?,
        &min_y.ok_or(BboxParseError::MissingExtent("miny"))?,
        &max_x.ok_or(BboxParseError::MissingExtent("maxx"))?,
        &max_y.ok_or(BboxParseError::MissingExtent("maxy"))?,
    )?;

    Ok(LayerBoundingBox {
        bbox,
        crs: crs.or(srs),
    })
}

/// Parse a GetCapabilities document into layer descriptors.
///
/// Descriptors come back in document order. A `ServiceExceptionReport`
/// is returned as `WmsError::ServiceException`.
pub fn parse_capabilities(
    xml: &str,
    options: &CapabilitiesOptions,
) -> WmsResult<Vec<LayerDescriptor>> {
    if let Some(exception) = parse_service_exception(xml) {
        return Err(exception.into());
    }

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    // Local names of currently open elements
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut open_layers: Vec<LayerNode> = Vec::new();
    let mut open_style: Option<StyleNode> = None;
    let mut capture: Option<(Field, String)> = None;
    let mut slots: Vec<Option<LayerDescriptor>> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let local = e.local_name().as_ref().to_vec();
                let parent = path.last().map(|p| p.as_slice());

                match local.as_slice() {
                    b"Layer" => {
                        slots.push(None);
                        open_layers.push(LayerNode {
                            slot: slots.len() - 1,
                            ..Default::default()
                        });
                    }
                    b"Style" if parent == Some(LAYER) => {
                        open_style = Some(StyleNode::default());
                    }
                    b"Name" | b"Title" | b"Abstract" => {
                        let field = match local.as_slice() {
                            b"Name" => Field::Name,
                            b"Title" => Field::Title,
                            _ => Field::Abstract,
                        };
                        let wanted = parent == Some(LAYER)
                            || (parent == Some(STYLE) && field != Field::Abstract);
                        if wanted {
                            capture = Some((field, String::new()));
                        }
                    }
                    b"BoundingBox" if parent == Some(LAYER) => {
                        if let Some(layer) = open_layers.last_mut() {
                            layer.take_bounding_box(&e);
                        }
                    }
                    _ => {}
                }

                path.push(local);
            }
            Ok(Event::Empty(e)) => {
                let parent = path.last().map(|p| p.as_slice());
                if e.local_name().as_ref() == b"BoundingBox" && parent == Some(LAYER) {
                    if let Some(layer) = open_layers.last_mut() {
                        layer.take_bounding_box(&e);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let Some((_, text)) = capture.as_mut() {
                    let unescaped = t
                        .unescape()
                        .map_err(|e| WmsError::XmlParse(e.to_string()))?;
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some((_, text)) = capture.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                path.pop();
                let parent = path.last().map(|p| p.as_slice());

                match e.local_name().as_ref() {
                    b"Name" | b"Title" | b"Abstract" => {
                        if let Some((field, text)) = capture.take() {
                            if parent == Some(STYLE) {
                                if let Some(style) = open_style.as_mut() {
                                    match field {
                                        Field::Name => style.name = Some(text),
                                        Field::Title => style.title = Some(text),
                                        Field::Abstract => {}
                                    }
                                }
                            } else if let Some(layer) = open_layers.last_mut() {
                                layer.set(field, text);
                            }
                        }
                    }
                    b"Style" => {
                        if let Some(style) = open_style.take() {
                            if let (Some(name), Some(title), Some(layer)) =
                                (style.name, style.title, open_layers.last_mut())
                            {
                                layer.styles.push(LayerStyle { name, title });
                            }
                        }
                    }
                    b"Layer" => {
                        if let Some(node) = open_layers.pop() {
                            let slot = node.slot;
                            slots[slot] = node.into_descriptor(options);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(WmsError::XmlParse(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    let layers: Vec<LayerDescriptor> = slots.into_iter().flatten().collect();
    debug!(count = layers.len(), workspace = %options.workspace, "Parsed capabilities");
    Ok(layers)
}
