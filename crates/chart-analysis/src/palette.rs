//! Chart colours.

use rand::Rng;

/// Base palette, translucent fills.
pub const BASE_COLORS: [&str; 10] = [
    "rgba(255, 99, 132, 0.7)",
    "rgba(54, 162, 235, 0.7)",
    "rgba(255, 206, 86, 0.7)",
    "rgba(75, 192, 192, 0.7)",
    "rgba(153, 102, 255, 0.7)",
    "rgba(255, 159, 64, 0.7)",
    "rgba(199, 199, 199, 0.7)",
    "rgba(83, 102, 255, 0.7)",
    "rgba(255, 99, 255, 0.7)",
    "rgba(0, 162, 150, 0.7)",
];

pub const HISTOGRAM_FILL: &str = "rgba(75, 192, 192, 0.7)";
pub const HISTOGRAM_BORDER: &str = "rgba(75, 192, 192, 1)";
pub const BOXPLOT_FILL: &str = "rgba(54, 162, 235, 0.5)";
pub const SCATTER_FILL: &str = "rgba(54, 162, 235, 0.7)";
pub const SERIES_BORDER: &str = "rgba(54, 162, 235, 1)";

/// `count` fill colours: the base palette first, then random colours.
pub fn generate_colors(count: usize) -> Vec<String> {
    generate_colors_with(count, &mut rand::thread_rng())
}

pub fn generate_colors_with<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<String> {
    let mut colors: Vec<String> = BASE_COLORS
        .iter()
        .take(count)
        .map(|c| c.to_string())
        .collect();

    while colors.len() < count {
        let (r, g, b): (u8, u8, u8) = (
            rng.gen_range(0..255),
            rng.gen_range(0..255),
            rng.gen_range(0..255),
        );
        colors.push(format!("rgba({}, {}, {}, 0.7)", r, g, b));
    }

    colors
}

/// Opaque border matching a translucent fill.
pub fn border_color(fill: &str) -> String {
    fill.replacen("0.7", "1", 1)
}
