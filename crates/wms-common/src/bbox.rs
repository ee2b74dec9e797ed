//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

use crate::crs::AxisOrder;

/// A geographic or projected bounding box.
///
/// For geographic CRS (EPSG:4326), coordinates are in degrees.
/// For projected CRS (EPSG:3857, etc.), coordinates are in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Box of the given half extents centred on `(x, y)`.
    pub fn around(x: f64, y: f64, half_width: f64, half_height: f64) -> Self {
        Self::new(x - half_width, y - half_height, x + half_width, y + half_height)
    }

    /// Build from the four textual extrema of a capabilities `BoundingBox`.
    pub fn from_extrema(
        min_x: &str,
        min_y: &str,
        max_x: &str,
        max_y: &str,
    ) -> Result<Self, BboxParseError> {
        let parse = |s: &str| -> Result<f64, BboxParseError> {
            s.trim()
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(s.to_string()))
        };

        Ok(Self {
            min_x: parse(min_x)?,
            min_y: parse(min_y)?,
            max_x: parse(max_x)?,
            max_y: parse(max_y)?,
        })
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Centre point `(x, y)`.
    pub fn center(&self) -> (f64, f64) {
        (
            self.min_x + self.width() / 2.0,
            self.min_y + self.height() / 2.0,
        )
    }

    /// Check if a point is contained within this bbox.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Format as a WMS `BBOX` parameter value in the given axis order.
    pub fn to_wms_param(&self, order: AxisOrder) -> String {
        match order {
            AxisOrder::XY => format!("{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y),
            AxisOrder::LatLon => {
                format!("{},{},{},{}", self.min_y, self.min_x, self.max_y, self.max_x)
            }
        }
    }
}

/// Bounding box advertised for a layer in a capabilities document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerBoundingBox {
    #[serde(flatten)]
    pub bbox: BoundingBox,
    /// `CRS` (WMS 1.3.0) or `SRS` (WMS 1.1.1) attribute, when present.
    pub crs: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Missing bounding box extent: {0}")]
    MissingExtent(&'static str),

    #[error("Invalid number in BBOX: {0}")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extrema() {
        let bbox = BoundingBox::from_extrema("-99.5", "19.5", "-98.0", " 21.4 ").unwrap();
        assert_eq!(bbox.min_x, -99.5);
        assert_eq!(bbox.max_y, 21.4);
        assert!(BoundingBox::from_extrema("x", "0", "1", "1").is_err());
    }

    #[test]
    fn test_wms_param_axis_order() {
        let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(bbox.to_wms_param(AxisOrder::XY), "1,2,3,4");
        assert_eq!(bbox.to_wms_param(AxisOrder::LatLon), "2,1,4,3");
    }
}
