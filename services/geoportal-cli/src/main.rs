//! Geoportal command-line client.
//!
//! Lists the layers of a GeoServer workspace, answers feature-info queries
//! at a position, prints legend URLs and proposes charts for attribute
//! tables.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use cli::{Cli, Commands, LogFormat};
use commands::QueryArgs;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    // Table analysis needs no server configuration
    if let Commands::Analyze { file, summary } = &cli.command {
        return commands::analyze(file, *summary);
    }

    let config = commands::load_config(cli.config.as_deref())?;
    debug!(base_url = %config.base_url, workspace = %config.workspace, "Configuration loaded");

    match cli.command {
        Commands::Layers { json } => commands::layers(&config, json).await,
        Commands::Catalog => commands::catalog(&config),
        Commands::Query {
            lon,
            lat,
            zoom,
            layers,
            json,
            charts,
        } => {
            let args = QueryArgs {
                lon,
                lat,
                zoom,
                layers,
                json,
                charts,
            };
            commands::query(&config, args).await
        }
        Commands::Legend { name } => commands::legend(&config, &name),
        Commands::Analyze { file, summary } => commands::analyze(&file, summary),
    }
}

fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
