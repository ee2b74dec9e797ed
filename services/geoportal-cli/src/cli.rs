//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "geoportal")]
#[command(about = "Browse and query the layers of a GeoServer workspace", long_about = None)]
pub struct Cli {
    /// YAML configuration file; the environment is used when absent
    #[arg(short, long, env = "GEOPORTAL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,

    /// Log output format (logs go to stderr)
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the layers the workspace publishes (GetCapabilities)
    Layers {
        /// Print the layer descriptors as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the configured layer catalog
    Catalog,

    /// Query feature info at a WGS84 position
    Query {
        /// Longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Map zoom level (default: configured initial zoom)
        #[arg(long)]
        zoom: Option<f64>,

        /// Layer to query, short or fully-qualified name; repeatable.
        /// Every catalog layer is queried when omitted
        #[arg(short, long = "layer")]
        layers: Vec<String>,

        /// Print the raw result as JSON
        #[arg(long)]
        json: bool,

        /// Also propose charts for the returned features
        #[arg(long)]
        charts: bool,
    },

    /// Print the legend image URL of a layer
    Legend {
        /// Short or fully-qualified layer name
        name: String,
    },

    /// Propose charts for an attribute table (JSON rows or FeatureCollection)
    Analyze {
        /// Path to the JSON file
        file: PathBuf,

        /// Print one line per chart instead of the chart configurations
        #[arg(long)]
        summary: bool,
    },
}
