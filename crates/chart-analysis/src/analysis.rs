//! Attribute-table analysis.
//!
//! Picks a chart for every informative column and a few scatter plots
//! relating numeric columns:
//!
//! - more than 15 distinct numeric values: histogram, plus a box plot from
//!   5 values on
//! - 1 to 15 distinct values: frequency counts as a pie (up to 6
//!   categories) or a bar chart
//! - the first two pairs of numeric columns: scatter, from 5 complete rows

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::chart::{
    BoxPlotStats, ChartConfig, ChartData, ChartKind, Colors, Dataset, DatasetValues, Histogram,
    ScatterPoint,
};
use crate::column::{
    format_column_name, infer_column_type, is_technical_column, parse_number, ColumnType,
};
use crate::error::{AnalysisError, AnalysisResult};
use crate::palette::{
    border_color, generate_colors, BOXPLOT_FILL, HISTOGRAM_BORDER, HISTOGRAM_FILL, SCATTER_FILL,
    SERIES_BORDER,
};

/// One attribute-table row.
pub type Row = Map<String, Value>;

const MAX_CATEGORIES: usize = 15;
const MAX_PIE_SLICES: usize = 6;
const MIN_BOXPLOT_VALUES: usize = 5;
const MIN_SCATTER_POINTS: usize = 5;
const MAX_SCATTER_PAIRS: usize = 2;

/// Chart configurations for `rows`. Columns are those of the first row.
pub fn analyze_data(rows: &[Row]) -> Vec<ChartConfig> {
    let Some(first) = rows.first() else {
        warn!("No data to analyze");
        return Vec::new();
    };

    let columns: Vec<&str> = first.keys().map(String::as_str).collect();
    debug!(rows = rows.len(), columns = columns.len(), "Analyzing attribute table");

    let mut configs = Vec::new();
    for column in columns.iter().filter(|c| !is_technical_column(c)) {
        configs.extend(column_charts(rows, column));
    }
    configs.extend(scatter_charts(rows, &columns));

    debug!(charts = configs.len(), "Attribute table analyzed");
    configs
}

/// Parse a table from JSON: an array of row objects, or a GeoJSON
/// `FeatureCollection` whose feature properties become the rows.
pub fn rows_from_json(value: Value) -> AnalysisResult<Vec<Row>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut object)
            if object.get("type").and_then(Value::as_str) == Some("FeatureCollection") =>
        {
            match object.remove("features") {
                Some(Value::Array(features)) => features
                    .into_iter()
                    .map(|feature| match feature {
                        Value::Object(mut feature) => match feature.remove("properties") {
                            Some(properties @ Value::Object(_)) => properties,
                            _ => Value::Object(feature),
                        },
                        other => other,
                    })
                    .collect(),
                _ => {
                    return Err(AnalysisError::NotATable(
                        "FeatureCollection without a features array".to_string(),
                    ))
                }
            }
        }
        other => return Err(AnalysisError::NotATable(json_kind(&other).to_string())),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(row) => Ok(row),
            _ => Err(AnalysisError::RowNotObject { index }),
        })
        .collect()
}

pub fn rows_from_str(json: &str) -> AnalysisResult<Vec<Row>> {
    rows_from_json(serde_json::from_str(json)?)
}

fn column_charts(rows: &[Row], column: &str) -> Vec<ChartConfig> {
    let present: Vec<&Value> = rows
        .iter()
        .filter_map(|row| row.get(column))
        .filter(|value| !value.is_null())
        .collect();

    let mut seen = HashSet::new();
    let distinct: Vec<&Value> = present
        .iter()
        .copied()
        .filter(|value| seen.insert(value.to_string()))
        .collect();

    let is_date = infer_column_type(present.iter().copied()) == ColumnType::Date;
    let all_numeric = distinct.iter().all(|value| parse_number(value).is_some());

    if distinct.len() > MAX_CATEGORIES && all_numeric && !is_date {
        let numbers: Vec<f64> = present.iter().filter_map(|v| parse_number(v)).collect();
        numeric_charts(column, &numbers)
    } else if !distinct.is_empty() && distinct.len() <= MAX_CATEGORIES {
        vec![category_chart(column, &present)]
    } else {
        debug!(column, distinct = distinct.len(), "Column not charted");
        Vec::new()
    }
}

fn numeric_charts(column: &str, numbers: &[f64]) -> Vec<ChartConfig> {
    let name = format_column_name(column);
    let mut configs = Vec::new();

    if let Some(histogram) = Histogram::from_values(numbers) {
        configs.push(ChartConfig {
            kind: ChartKind::Bar,
            title: format!("Distribution of {}", name),
            data: ChartData {
                labels: histogram.labels,
                datasets: vec![Dataset {
                    label: Some(name.clone()),
                    data: DatasetValues::Counts(histogram.counts),
                    background_color: Colors::Single(HISTOGRAM_FILL.to_string()),
                    border_color: Colors::Single(HISTOGRAM_BORDER.to_string()),
                    border_width: 1,
                    point_radius: None,
                }],
            },
        });
    }

    if numbers.len() >= MIN_BOXPLOT_VALUES {
        if let Some(stats) = BoxPlotStats::from_values(numbers) {
            configs.push(ChartConfig {
                kind: ChartKind::Boxplot,
                title: format!("Statistics of {}", name),
                data: ChartData {
                    labels: vec![name],
                    datasets: vec![Dataset {
                        label: Some("Values".to_string()),
                        data: DatasetValues::BoxPlots(vec![stats]),
                        background_color: Colors::Single(BOXPLOT_FILL.to_string()),
                        border_color: Colors::Single(SERIES_BORDER.to_string()),
                        border_width: 1,
                        point_radius: None,
                    }],
                },
            });
        }
    }

    configs
}

/// Frequency chart. Categories are ordered by count, most frequent first;
/// ties keep first-seen order.
fn category_chart(column: &str, values: &[&Value]) -> ChartConfig {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, u64> = HashMap::new();
    for value in values {
        let label = category_label(value);
        let count = counts.entry(label.clone()).or_insert(0);
        if *count == 0 {
            order.push(label);
        }
        *count += 1;
    }

    let mut categories: Vec<(String, u64)> = order
        .into_iter()
        .map(|label| {
            let count = counts.get(&label).copied().unwrap_or_default();
            (label, count)
        })
        .collect();
    categories.sort_by(|a, b| b.1.cmp(&a.1));

    let colors = generate_colors(categories.len());
    let borders = colors.iter().map(|c| border_color(c)).collect();
    let name = format_column_name(column);
    let (labels, data): (Vec<String>, Vec<u64>) = categories.into_iter().unzip();

    let (kind, label) = if labels.len() <= MAX_PIE_SLICES {
        (ChartKind::Pie, None)
    } else {
        (ChartKind::Bar, Some(name.clone()))
    };

    ChartConfig {
        kind,
        title: format!("Distribution of {}", name),
        data: ChartData {
            labels,
            datasets: vec![Dataset {
                label,
                data: DatasetValues::Counts(data),
                background_color: Colors::PerItem(colors),
                border_color: Colors::PerItem(borders),
                border_width: 1,
                point_radius: None,
            }],
        },
    }
}

fn scatter_charts(rows: &[Row], columns: &[&str]) -> Vec<ChartConfig> {
    let numeric: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|column| !is_technical_column(column))
        .filter(|column| {
            let values = rows.iter().filter_map(|row| row.get(*column));
            infer_column_type(values.clone()) != ColumnType::Date
                && values.filter_map(parse_number).next().is_some()
        })
        .collect();

    let pairs = numeric
        .iter()
        .enumerate()
        .flat_map(|(i, x)| numeric[i + 1..].iter().map(move |y| (*x, *y)))
        .take(MAX_SCATTER_PAIRS);

    let mut configs = Vec::new();
    for (x_column, y_column) in pairs {
        let points: Vec<ScatterPoint> = rows
            .iter()
            .filter_map(|row| {
                let x = row.get(x_column).and_then(parse_number)?;
                let y = row.get(y_column).and_then(parse_number)?;
                Some(ScatterPoint { x, y })
            })
            .collect();

        if points.len() < MIN_SCATTER_POINTS {
            debug!(x = x_column, y = y_column, points = points.len(), "Too few points for scatter");
            continue;
        }

        configs.push(ChartConfig {
            kind: ChartKind::Scatter,
            title: format!(
                "Relationship between {} and {}",
                format_column_name(x_column),
                format_column_name(y_column)
            ),
            data: ChartData {
                labels: Vec::new(),
                datasets: vec![Dataset {
                    label: Some("Data".to_string()),
                    data: DatasetValues::Points(points),
                    background_color: Colors::Single(SCATTER_FILL.to_string()),
                    border_color: Colors::Single(SERIES_BORDER.to_string()),
                    border_width: 1,
                    point_radius: Some(4),
                }],
            },
        });
    }

    configs
}

/// Category label as shown on a chart axis. Integral numbers drop the
/// trailing `.0`.
fn category_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
