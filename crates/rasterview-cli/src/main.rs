mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rasterview", about = "Pan, zoom and rotate large rasters through a level pyramid")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show raster size and pyramid level geometry
    Info(commands::info::InfoArgs),
    /// Render a view of a raster to PNG
    Render(commands::render::RenderArgs),
    /// Show scrollbar state for a view, optionally after moving a scrollbar
    Scroll(commands::scroll::ScrollArgs),
    /// Print or save the default viewer config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Render(args) => commands::render::run(args),
        Commands::Scroll(args) => commands::scroll::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
