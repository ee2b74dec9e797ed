//! Common types and utilities shared across the geoportal crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod layer;

pub use bbox::{BoundingBox, LayerBoundingBox};
pub use crs::{mercator_to_wgs84, wgs84_to_mercator, AxisOrder, CrsCode};
pub use error::{WmsError, WmsResult};
pub use layer::{LayerDescriptor, LayerId, LayerStyle};
