//! Error types for attribute-table analysis.

use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Input is neither an array of rows nor a feature collection.
    #[error("expected an array of objects or a FeatureCollection, got {0}")]
    NotATable(String),

    /// A row of the table is not a JSON object.
    #[error("row {index} is not an object")]
    RowNotObject { index: usize },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
