//! Charts for layer attribute tables.
//!
//! Given the rows of a layer (from a feature-info response or an exported
//! table), classifies each column and proposes chart.js-shaped chart
//! configurations.

pub mod analysis;
pub mod chart;
pub mod column;
pub mod error;
pub mod palette;

pub use analysis::{analyze_data, rows_from_json, rows_from_str, Row};
pub use chart::{
    BoxPlotStats, ChartConfig, ChartData, ChartKind, Colors, Dataset, DatasetValues, Histogram,
    ScatterPoint,
};
pub use column::{format_column_name, infer_column_type, parse_number, ColumnType};
pub use error::{AnalysisError, AnalysisResult};
