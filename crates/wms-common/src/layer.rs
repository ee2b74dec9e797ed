//! Layer descriptors produced from a server's capabilities document.

use serde::{Deserialize, Serialize};

use crate::LayerBoundingBox;

/// Unique identifier for a layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Split a workspace-qualified name like "sembrando:rios".
    pub fn parse(s: &str) -> (Option<&str>, &str) {
        match s.split_once(':') {
            Some((workspace, name)) => (Some(workspace), name),
            None => (None, s),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A queryable layer advertised by the map server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    /// Layer name with the workspace prefix removed
    pub id: LayerId,

    /// Fully-qualified server name ("workspace:layer")
    pub name: String,

    /// Human-readable title
    pub title: String,

    /// Layer abstract, empty when the server gives none
    pub description: String,

    pub bounding_box: Option<LayerBoundingBox>,

    /// Available styles in document order
    pub styles: Vec<LayerStyle>,

    /// GetLegendGraphic URL for this layer
    pub legend_url: String,
}

impl LayerDescriptor {
    /// Get the default style for this layer.
    pub fn default_style(&self) -> Option<&LayerStyle> {
        self.styles.first()
    }

    /// Find a style by name.
    pub fn get_style(&self, name: &str) -> Option<&LayerStyle> {
        self.styles.iter().find(|s| s.name == name)
    }
}

/// Style advertised for a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerStyle {
    /// Style name (used in GetMap requests)
    pub name: String,

    /// Human-readable title
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qualified_name() {
        assert_eq!(
            LayerId::parse("sembrando:rios"),
            (Some("sembrando"), "rios")
        );
        assert_eq!(LayerId::parse("rios"), (None, "rios"));
    }
}
