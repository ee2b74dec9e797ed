//! Chart configurations.
//!
//! Serialized shape follows chart.js: `{type, title, data: {labels,
//! datasets}}` with camelCase dataset keys, so configs can be handed to a
//! renderer unchanged.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
    Boxplot,
    Scatter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub title: String,
    pub data: ChartData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub data: DatasetValues,
    pub background_color: Colors,
    pub border_color: Colors,
    pub border_width: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_radius: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatasetValues {
    Counts(Vec<u64>),
    BoxPlots(Vec<BoxPlotStats>),
    Points(Vec<ScatterPoint>),
}

/// One colour for the whole series, or one per item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Colors {
    Single(String),
    PerItem(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
}

/// Five-number summary with whiskers clipped to 1.5·IQR.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxPlotStats {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl BoxPlotStats {
    /// Quartiles are taken at index `floor(n·p)` of the sorted values.
    /// Returns `None` for an empty slice.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();

        let at = |p: f64| sorted[((n as f64 * p).floor() as usize).min(n - 1)];
        let (q1, median, q3) = (at(0.25), at(0.5), at(0.75));

        let iqr = q3 - q1;
        let lower_fence = q1 - 1.5 * iqr;
        let upper_fence = q3 + 1.5 * iqr;

        let min = sorted
            .iter()
            .copied()
            .find(|v| *v >= lower_fence)
            .unwrap_or(sorted[0]);
        let max = sorted
            .iter()
            .rev()
            .copied()
            .find(|v| *v <= upper_fence)
            .unwrap_or(sorted[n - 1]);

        Some(Self {
            min,
            q1,
            median,
            q3,
            max,
        })
    }
}

/// Equal-width bins over `[min, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub labels: Vec<String>,
    pub counts: Vec<u64>,
}

impl Histogram {
    /// `min(10, ceil(sqrt(n)))` bins; the maximum lands in the last bin.
    /// A zero range puts every value in the first bin.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let bin_count = ((values.len() as f64).sqrt().ceil() as usize).clamp(1, 10);
        let bin_size = (max - min) / bin_count as f64;

        let mut counts = vec![0u64; bin_count];
        for value in values {
            let index = if bin_size > 0.0 {
                (((value - min) / bin_size).floor() as usize).min(bin_count - 1)
            } else {
                0
            };
            counts[index] += 1;
        }

        let labels = (0..bin_count)
            .map(|i| {
                let lower = min + i as f64 * bin_size;
                format!("{:.1} - {:.1}", lower, lower + bin_size)
            })
            .collect();

        Some(Self { labels, counts })
    }
}
