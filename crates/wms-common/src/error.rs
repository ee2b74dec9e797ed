//! Error types for the geoportal WMS client.

use thiserror::Error;

/// Result type alias using WmsError.
pub type WmsResult<T> = Result<T, WmsError>;

/// Primary error type for WMS client operations.
#[derive(Debug, Error)]
pub enum WmsError {
    // === Request construction ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Invalid CRS: {0}")]
    InvalidCrs(String),

    // === Transport ===
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Unexpected response status: {}", status_line(.status, .reason))]
    HttpStatus { status: u16, reason: String },

    #[error("Request timeout")]
    Timeout,

    // === Response decoding ===
    #[error("Invalid response body: {0}")]
    InvalidResponse(String),

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("Service exception ({code}): {message}")]
    ServiceException { code: String, message: String },

    // === Configuration ===
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WmsError {
    /// Build an `HttpStatus` error from a numeric status code.
    pub fn http_status(status: u16, reason: Option<&str>) -> Self {
        WmsError::HttpStatus {
            status,
            reason: reason.map(str::trim).unwrap_or_default().to_string(),
        }
    }
}

fn status_line(status: &u16, reason: &str) -> String {
    if reason.is_empty() {
        status.to_string()
    } else {
        format!("{} {}", status, reason)
    }
}

impl From<serde_json::Error> for WmsError {
    fn from(err: serde_json::Error) -> Self {
        WmsError::InvalidResponse(format!("JSON error: {}", err))
    }
}
