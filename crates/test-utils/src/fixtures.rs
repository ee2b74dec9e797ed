//! Common test fixtures for geoportal tests.
//!
//! Capabilities documents and GetFeatureInfo payloads shaped like the ones
//! a GeoServer instance with a `sembrando` workspace returns.

use serde_json::{json, Value};

/// Workspace used by all fixtures.
pub const WORKSPACE: &str = "sembrando";

/// Base URL used by all fixtures.
pub const BASE_URL: &str = "http://localhost:8082/geoserver";

/// WMS 1.1.1 capabilities with a root group, a nested group, three
/// workspace layers and one layer from another workspace.
pub const CAPABILITIES_1_1_1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMT_MS_Capabilities version="1.1.1" updateSequence="412">
  <Service>
    <Name>OGC:WMS</Name>
    <Title>GeoServer Web Map Service</Title>
    <Abstract>A compliant implementation of WMS</Abstract>
  </Service>
  <Capability>
    <Request>
      <GetFeatureInfo>
        <Format>application/json</Format>
        <Format>text/html</Format>
      </GetFeatureInfo>
    </Request>
    <Layer>
      <Title>GeoServer Web Map Service</Title>
      <Abstract>Root layer</Abstract>
      <SRS>EPSG:4326</SRS>
      <SRS>EPSG:3857</SRS>
      <LatLonBoundingBox minx="-118.4" miny="14.5" maxx="-86.7" maxy="32.7"/>
      <Layer queryable="1" opaque="0">
        <Name>sembrando:territorios_28</Name>
        <Title>Territorios</Title>
        <Abstract>Capa de territorios sembrando datos</Abstract>
        <KeywordList>
          <Keyword>features</Keyword>
        </KeywordList>
        <SRS>EPSG:4326</SRS>
        <LatLonBoundingBox minx="-99.9" miny="19.6" maxx="-97.9" maxy="21.4"/>
        <BoundingBox SRS="EPSG:4326" minx="-99.9" miny="19.6" maxx="-97.9" maxy="21.4"/>
        <BoundingBox SRS="EPSG:3857" minx="-11120000" miny="2235000" maxx="-10897000" maxy="2438000"/>
        <Style>
          <Name>polygon</Name>
          <Title>Default Polygon</Title>
          <Abstract>Grey polygon with black outline</Abstract>
          <LegendURL width="20" height="20">
            <Format>image/png</Format>
            <OnlineResource xmlns:xlink="http://www.w3.org/1999/xlink" xlink:type="simple" xlink:href="http://localhost:8082/geoserver/sembrando/ows?service=WMS&amp;request=GetLegendGraphic"/>
          </LegendURL>
        </Style>
        <Style>
          <Name>territorios_outline</Name>
          <Title>Outline only</Title>
        </Style>
      </Layer>
      <Layer>
        <Title>Hidrología</Title>
        <Layer queryable="1">
          <Name>sembrando:rios</Name>
          <Title>Ríos</Title>
          <Abstract>Red hidrológica principal</Abstract>
          <BoundingBox SRS="EPSG:4326" minx="-99.5" miny="19.8" maxx="-98.1" maxy="21.2"/>
        </Layer>
        <Layer queryable="1">
          <Name>sembrando:unidades_riego</Name>
          <Title>Unidades de riego</Title>
        </Layer>
      </Layer>
      <Layer queryable="1">
        <Name>topp:states</Name>
        <Title>USA Population</Title>
      </Layer>
    </Layer>
  </Capability>
</WMT_MS_Capabilities>
"#;

/// WMS 1.3.0 capabilities using `CRS` attributes and a namespace.
pub const CAPABILITIES_1_3_0: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms">
  <Capability>
    <Layer>
      <Title>Root</Title>
      <Layer queryable="1">
        <Name>sembrando:municipios_hidalgo</Name>
        <Title>Municipios &amp; límites</Title>
        <Abstract><![CDATA[Límites municipales <Hidalgo>]]></Abstract>
        <CRS>EPSG:4326</CRS>
        <EX_GeographicBoundingBox>
          <westBoundLongitude>-99.9</westBoundLongitude>
          <eastBoundLongitude>-97.9</eastBoundLongitude>
          <southBoundLatitude>19.6</southBoundLatitude>
          <northBoundLatitude>21.4</northBoundLatitude>
        </EX_GeographicBoundingBox>
        <BoundingBox CRS="EPSG:4326" minx="19.6" miny="-99.9" maxx="21.4" maxy="-97.9"/>
      </Layer>
    </Layer>
  </Capability>
</WMS_Capabilities>
"#;

/// An OGC exception report as sent instead of a capabilities document.
pub const SERVICE_EXCEPTION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ServiceExceptionReport version="1.1.1">
  <ServiceException code="InvalidParameterValue" locator="service">
    No service: ( madeUp )
  </ServiceException>
</ServiceExceptionReport>
"#;

/// A GeoJSON feature with the given id and properties.
pub fn feature(id: &str, properties: Value) -> Value {
    json!({
        "type": "Feature",
        "id": id,
        "geometry": {
            "type": "Point",
            "coordinates": [-98.9, 20.1]
        },
        "geometry_name": "geom",
        "properties": properties
    })
}

/// A GetFeatureInfo JSON body wrapping the given features.
pub fn feature_collection(features: Vec<Value>) -> Value {
    let count = features.len();
    json!({
        "type": "FeatureCollection",
        "features": features,
        "totalFeatures": "unknown",
        "numberReturned": count,
        "timeStamp": "2026-10-19T12:00:00.000Z",
        "crs": null
    })
}

/// A GetFeatureInfo JSON body with no features.
pub fn empty_feature_collection() -> Value {
    feature_collection(Vec::new())
}

/// A single-feature body for layer `layer`, as a string.
pub fn single_feature_body(layer: &str) -> String {
    feature_collection(vec![feature(
        &format!("{}.1", layer),
        json!({ "nombre": format!("{} feature", layer), "superficie": 12.5 }),
    )])
    .to_string()
}
