//! OGC WMS protocol support for the geoportal client.
//!
//! Supports:
//! - WMS 1.1.1 and WMS 1.3.0 GetCapabilities documents
//! - GetFeatureInfo request construction and response decoding
//! - GetMap layer parameters and GetLegendGraphic URLs

pub mod capabilities;
pub mod exceptions;
pub mod getfeatureinfo;
pub mod getmap;

pub use capabilities::{capabilities_url, legend_url, parse_capabilities, CapabilitiesOptions};
pub use exceptions::{parse_service_exception, ServiceException};
pub use getfeatureinfo::{
    pixel_to_geographic, FeatureInfoResponse, FeatureRecord, GetFeatureInfoRequest, InfoFormat,
    FEATURE_INFO_IMAGE_SIZE,
};
pub use getmap::{WmsLayerParams, WmsVersion};
