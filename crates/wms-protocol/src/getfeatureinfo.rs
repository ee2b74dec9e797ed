//! WMS GetFeatureInfo requests and responses.
//!
//! Requests are built the way browser map clients do it: a virtual
//! 101x101 pixel image is centred on the clicked map coordinate at the
//! current view resolution, and the click becomes the image's centre pixel.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;
use wms_common::{BoundingBox, CrsCode, WmsError, WmsResult};

use crate::exceptions::parse_service_exception;
use crate::getmap::WmsVersion;

/// Width and height of the virtual image a GetFeatureInfo request refers to.
pub const FEATURE_INFO_IMAGE_SIZE: u32 = 101;

/// Supported GetFeatureInfo response formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub enum InfoFormat {
    /// application/json - GeoJSON feature collection
    #[serde(rename = "application/json")]
    #[default]
    Json,
    /// text/html - Human-readable HTML for popups
    #[serde(rename = "text/html")]
    Html,
    /// text/xml - OGC-compliant XML
    #[serde(rename = "text/xml")]
    Xml,
    /// text/plain - Simple text format
    #[serde(rename = "text/plain")]
    Text,
}

impl InfoFormat {
    /// Parse from MIME type string
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "application/json" | "json" => Some(InfoFormat::Json),
            "text/html" | "html" => Some(InfoFormat::Html),
            "text/xml" | "xml" => Some(InfoFormat::Xml),
            "text/plain" | "text" => Some(InfoFormat::Text),
            _ => None,
        }
    }

    /// Get MIME type string
    pub fn to_mime(&self) -> &'static str {
        match self {
            InfoFormat::Json => "application/json",
            InfoFormat::Html => "text/html",
            InfoFormat::Xml => "text/xml",
            InfoFormat::Text => "text/plain",
        }
    }
}

/// GetFeatureInfo request parameters.
#[derive(Debug, Clone)]
pub struct GetFeatureInfoRequest {
    pub version: WmsVersion,
    /// Layers to display (same as GetMap)
    pub layers: Vec<String>,
    /// Layers to query for information
    pub query_layers: Vec<String>,
    /// Coordinate reference system of `bbox`
    pub crs: CrsCode,
    /// Extent of the virtual image, always stored x/y
    pub bbox: BoundingBox,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Pixel column (X coordinate, 0-based from left)
    pub i: u32,
    /// Pixel row (Y coordinate, 0-based from top)
    pub j: u32,
    /// Response format
    pub info_format: InfoFormat,
    /// Maximum number of features to return
    pub feature_count: Option<u32>,
    /// Extra layer parameters (TILED, FORMAT, ...) sent along unchanged
    pub extra_params: Vec<(String, String)>,
}

impl GetFeatureInfoRequest {
    /// Request for the map coordinate `(x, y)` seen at `resolution`
    /// map units per pixel.
    pub fn at_coordinate(
        x: f64,
        y: f64,
        resolution: f64,
        crs: CrsCode,
        layers: Vec<String>,
        version: WmsVersion,
    ) -> WmsResult<Self> {
        if !x.is_finite() || !y.is_finite() {
            return Err(WmsError::InvalidParameter {
                param: "coordinate".to_string(),
                message: format!("({}, {}) is not a finite map coordinate", x, y),
            });
        }
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(WmsError::InvalidParameter {
                param: "resolution".to_string(),
                message: format!("{} is not a positive resolution", resolution),
            });
        }
        if layers.is_empty() {
            return Err(WmsError::MissingParameter("QUERY_LAYERS".to_string()));
        }

        let size = FEATURE_INFO_IMAGE_SIZE;
        let half = resolution * size as f64 / 2.0;
        let bbox = BoundingBox::around(x, y, half, half);

        let i = ((x - bbox.min_x) / resolution).floor() as u32;
        let j = ((bbox.max_y - y) / resolution).floor() as u32;

        Ok(Self {
            version,
            query_layers: layers.clone(),
            layers,
            crs,
            bbox,
            width: size,
            height: size,
            i,
            j,
            info_format: InfoFormat::default(),
            feature_count: None,
            extra_params: Vec::new(),
        })
    }

    pub fn with_info_format(mut self, format: InfoFormat) -> Self {
        self.info_format = format;
        self
    }

    pub fn with_feature_count(mut self, count: u32) -> Self {
        self.feature_count = Some(count);
        self
    }

    pub fn with_query_layers(mut self, query_layers: Vec<String>) -> Self {
        self.query_layers = query_layers;
        self
    }

    /// Add a vendor/layer parameter. Request geometry cannot be overridden.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.push((key.into(), value.into()));
        self
    }

    /// Map coordinate at the centre of the queried pixel.
    pub fn pixel_center(&self) -> (f64, f64) {
        pixel_to_geographic(
            self.i,
            self.j,
            self.width,
            self.height,
            [self.bbox.min_x, self.bbox.min_y, self.bbox.max_x, self.bbox.max_y],
        )
    }

    /// Query-string pairs for this request; later keys replace earlier ones.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = Vec::new();

        set_param(&mut pairs, "SERVICE", "WMS");
        set_param(&mut pairs, "VERSION", self.version.as_str());
        set_param(&mut pairs, "REQUEST", "GetFeatureInfo");
        set_param(&mut pairs, "FORMAT", "image/png");
        set_param(&mut pairs, "TRANSPARENT", "true");
        set_param(&mut pairs, "STYLES", "");

        for (key, value) in &self.extra_params {
            set_param(&mut pairs, key, value);
        }

        set_param(&mut pairs, "REQUEST", "GetFeatureInfo");
        set_param(&mut pairs, "VERSION", self.version.as_str());
        set_param(&mut pairs, "LAYERS", &self.layers.join(","));
        set_param(&mut pairs, "QUERY_LAYERS", &self.query_layers.join(","));
        set_param(&mut pairs, "INFO_FORMAT", self.info_format.to_mime());
        if let Some(count) = self.feature_count {
            set_param(&mut pairs, "FEATURE_COUNT", &count.to_string());
        }

        set_param(&mut pairs, "WIDTH", &self.width.to_string());
        set_param(&mut pairs, "HEIGHT", &self.height.to_string());
        let order = self.version.axis_order(&self.crs);
        set_param(&mut pairs, "BBOX", &self.bbox.to_wms_param(order));
        set_param(&mut pairs, self.version.crs_param(), &self.crs.to_string());
        let (i_param, j_param) = self.version.pixel_params();
        set_param(&mut pairs, i_param, &self.i.to_string());
        set_param(&mut pairs, j_param, &self.j.to_string());

        pairs
    }

    /// Full request URL against a WMS endpoint.
    pub fn to_url(&self, endpoint: &str) -> WmsResult<String> {
        let mut url = Url::parse(endpoint).map_err(|e| WmsError::InvalidParameter {
            param: "url".to_string(),
            message: format!("{}: {}", endpoint, e),
        })?;

        url.query_pairs_mut().extend_pairs(self.to_query_pairs());
        Ok(url.to_string())
    }
}

/// Insert or replace a parameter, comparing keys case-insensitively.
fn set_param(pairs: &mut Vec<(String, String)>, key: &str, value: &str) {
    match pairs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
        Some(existing) => existing.1 = value.to_string(),
        None => pairs.push((key.to_uppercase(), value.to_string())),
    }
}

/// One feature as returned by the server. No schema is enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecord(pub Value);

impl FeatureRecord {
    /// Feature id, e.g. "rios.42".
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    /// Attribute map, if the feature carries one.
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.0.get("properties").and_then(Value::as_object)
    }

    pub fn geometry(&self) -> Option<&Value> {
        self.0.get("geometry").filter(|g| !g.is_null())
    }
}

/// Decoded GetFeatureInfo response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureInfoResponse {
    /// Raw payload; non-JSON formats are kept as a JSON string
    pub data: Value,
    /// Copy of the payload's `features` array, empty when absent
    pub features: Vec<FeatureRecord>,
}

impl FeatureInfoResponse {
    /// Decode a response body of the requested format.
    ///
    /// An OGC exception report in place of JSON is surfaced as
    /// `WmsError::ServiceException`.
    pub fn from_body(body: &str, format: InfoFormat) -> WmsResult<Self> {
        if format != InfoFormat::Json {
            return Ok(Self {
                data: Value::String(body.to_string()),
                features: Vec::new(),
            });
        }

        let data: Value = match serde_json::from_str(body) {
            Ok(data) => data,
            Err(e) => {
                if let Some(exception) = parse_service_exception(body) {
                    return Err(exception.into());
                }
                return Err(e.into());
            }
        };

        let features = data
            .get("features")
            .and_then(Value::as_array)
            .map(|features| features.iter().cloned().map(FeatureRecord).collect())
            .unwrap_or_default();

        Ok(Self { data, features })
    }
}

/// Convert pixel coordinates to map coordinates
///
/// # Arguments
/// - `i`: Pixel column (0-based from left)
/// - `j`: Pixel row (0-based from top)
/// - `width`: Map width in pixels
/// - `height`: Map height in pixels
/// - `bbox`: Bounding box [min_x, min_y, max_x, max_y]
///
/// # Returns
/// (x, y) of the pixel centre
pub fn pixel_to_geographic(i: u32, j: u32, width: u32, height: u32, bbox: [f64; 4]) -> (f64, f64) {
    let [min_x, min_y, max_x, max_y] = bbox;

    // Calculate pixel center position (0.5 offset for pixel center)
    let x_ratio = (i as f64 + 0.5) / width as f64;
    let y_ratio = (j as f64 + 0.5) / height as f64;

    let x = min_x + x_ratio * (max_x - min_x);
    let y = max_y - y_ratio * (max_y - min_y); // Y is inverted (top=max, bottom=min)

    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_pixel_to_geographic() {
        // Center of 256x256 map with bbox [-180, -90, 180, 90]
        let (lon, lat) = pixel_to_geographic(128, 128, 256, 256, [-180.0, -90.0, 180.0, 90.0]);
        assert!((lon - 0.0).abs() < 1.0);
        assert!((lat - 0.0).abs() < 1.0);
    }

    #[test]
    fn test_info_format_parsing() {
        assert_eq!(
            InfoFormat::from_mime("application/json"),
            Some(InfoFormat::Json)
        );
        assert_eq!(InfoFormat::from_mime("text/html"), Some(InfoFormat::Html));
        assert_eq!(InfoFormat::from_mime("TEXT/HTML"), Some(InfoFormat::Html));
        assert_eq!(InfoFormat::from_mime("image/png"), None);
        assert_eq!(InfoFormat::default(), InfoFormat::Json);
    }

    #[test]
    fn test_click_is_center_pixel() {
        let request = GetFeatureInfoRequest::at_coordinate(
            -11009497.6,
            2284466.2,
            152.87,
            CrsCode::Epsg3857,
            vec!["sembrando:rios".to_string()],
            WmsVersion::V1_1_1,
        )
        .unwrap();

        assert_eq!(request.i, 50);
        assert_eq!(request.j, 50);
        assert_eq!(request.width, FEATURE_INFO_IMAGE_SIZE);

        let (x, y) = request.pixel_center();
        assert!((x - (-11009497.6)).abs() <= 152.87);
        assert!((y - 2284466.2).abs() <= 152.87);
    }

    #[test]
    fn test_query_pairs_wms_111() {
        let request = GetFeatureInfoRequest::at_coordinate(
            0.0,
            0.0,
            1.0,
            CrsCode::Epsg3857,
            vec!["sembrando:rios".to_string()],
            WmsVersion::V1_1_1,
        )
        .unwrap()
        .with_feature_count(10)
        .with_param("TILED", "true")
        .with_param("VERSION", "1.3.0");

        let pairs = request.to_query_pairs();
        assert_eq!(param(&pairs, "REQUEST"), Some("GetFeatureInfo"));
        // Version comes from the request, not from extra params
        assert_eq!(param(&pairs, "VERSION"), Some("1.1.1"));
        assert_eq!(param(&pairs, "QUERY_LAYERS"), Some("sembrando:rios"));
        assert_eq!(param(&pairs, "INFO_FORMAT"), Some("application/json"));
        assert_eq!(param(&pairs, "FEATURE_COUNT"), Some("10"));
        assert_eq!(param(&pairs, "TILED"), Some("true"));
        assert_eq!(param(&pairs, "SRS"), Some("EPSG:3857"));
        assert_eq!(param(&pairs, "BBOX"), Some("-50.5,-50.5,50.5,50.5"));
        assert_eq!(param(&pairs, "X"), Some("50"));
        assert_eq!(param(&pairs, "Y"), Some("50"));
        assert_eq!(param(&pairs, "I"), None);
    }

    #[test]
    fn test_query_pairs_wms_130_geographic_swaps_bbox() {
        let request = GetFeatureInfoRequest::at_coordinate(
            -98.0,
            20.0,
            0.01,
            CrsCode::Epsg4326,
            vec!["ws:a".to_string()],
            WmsVersion::V1_3_0,
        )
        .unwrap();

        let pairs = request.to_query_pairs();
        assert_eq!(param(&pairs, "CRS"), Some("EPSG:4326"));
        let first: f64 = param(&pairs, "BBOX")
            .unwrap()
            .split(',')
            .next()
            .unwrap()
            .parse()
            .unwrap();
        // Latitude first for EPSG:4326 in 1.3.0
        assert!((first - 19.495).abs() < 1e-9);
        assert_eq!(param(&pairs, "I"), Some("50"));
    }

    #[test]
    fn test_rejects_bad_resolution() {
        let result = GetFeatureInfoRequest::at_coordinate(
            0.0,
            0.0,
            0.0,
            CrsCode::Epsg3857,
            vec!["ws:a".to_string()],
            WmsVersion::V1_1_1,
        );
        assert!(matches!(result, Err(WmsError::InvalidParameter { .. })));
    }

    #[test]
    fn test_to_url() {
        let request = GetFeatureInfoRequest::at_coordinate(
            0.0,
            0.0,
            1.0,
            CrsCode::Epsg3857,
            vec!["sembrando:rios".to_string()],
            WmsVersion::V1_1_1,
        )
        .unwrap();
        let url = request.to_url("http://localhost:8082/geoserver/sembrando/wms").unwrap();
        assert!(url.starts_with("http://localhost:8082/geoserver/sembrando/wms?SERVICE=WMS"));
        assert!(url.contains("QUERY_LAYERS=sembrando%3Arios"));
        assert!(request.to_url("not a url").is_err());
    }

    #[test]
    fn test_response_features_verbatim() {
        let body = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","id":"rios.1","geometry":null,"properties":{"nombre":"Tula","orden":2}}
        ],"totalFeatures":"unknown"}"#;

        let response = FeatureInfoResponse::from_body(body, InfoFormat::Json).unwrap();
        assert_eq!(response.features.len(), 1);
        assert_eq!(response.features[0].id(), Some("rios.1"));
        assert!(response.features[0].geometry().is_none());
        assert_eq!(response.features[0].0, response.data["features"][0]);
        assert_eq!(response.features[0].properties().unwrap()["orden"], 2);
    }

    #[test]
    fn test_response_without_features_field() {
        let response = FeatureInfoResponse::from_body(r#"{"type":"FeatureCollection"}"#, InfoFormat::Json)
            .unwrap();
        assert!(response.features.is_empty());
    }

    #[test]
    fn test_response_exception_report() {
        let body = r#"<ServiceExceptionReport><ServiceException code="LayerNotQueryable">no</ServiceException></ServiceExceptionReport>"#;
        let err = FeatureInfoResponse::from_body(body, InfoFormat::Json).unwrap_err();
        assert!(matches!(err, WmsError::ServiceException { ref code, .. } if code == "LayerNotQueryable"));
    }

    #[test]
    fn test_response_html_kept_raw() {
        let response = FeatureInfoResponse::from_body("<table></table>", InfoFormat::Html).unwrap();
        assert_eq!(response.data, Value::String("<table></table>".to_string()));
        assert!(response.features.is_empty());
    }
}
