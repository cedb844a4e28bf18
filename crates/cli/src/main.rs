//! Themeloom CLI: the main entry point.
//!
//! Commands:
//! - `theme`   Generate illustration themes
//! - `post`    Write captions for a finished artwork
//! - `models`  List local GGUF models
//! - `config`  Print or write the default configuration
//! - `doctor`  Diagnose configuration health

use clap::{Parser, Subcommand};

mod commands;

use commands::post::PostArgs;
use commands::theme::ThemeArgs;

#[derive(Parser)]
#[command(
    name = "themeloom",
    about = "Themeloom: illustration themes and multilingual captions",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate illustration themes
    Theme(ThemeArgs),

    /// Write captions for a finished artwork
    Post(PostArgs),

    /// List local GGUF models
    Models {
        /// Directory to scan instead of the configured one
        #[arg(short, long)]
        dir: Option<std::path::PathBuf>,
    },

    /// Print the default configuration, or write it with --init
    Config {
        /// Write the default config file if none exists
        #[arg(long)]
        init: bool,
    },

    /// Diagnose configuration health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON on stdout stays pipeable
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Theme(args) => commands::theme::run(args).await?,
        Commands::Post(args) => commands::post::run(args).await?,
        Commands::Models { dir } => commands::models::run(dir).await?,
        Commands::Config { init } => commands::config_cmd::run(init).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
