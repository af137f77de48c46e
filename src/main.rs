// Entrypoint for the `goupc` CLI.
// - Keeps `main` small: set up logging, parse arguments, open the config
//   store once and hand it to the matching `ui` function.
// - Returns `anyhow::Result` so unexpected failures (unreadable config,
//   unwritable files) are reported with context; expected failures are
//   printed by `ui` and turned into a non-zero exit code.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use goupc::{config::ConfigStore, ui};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "goupc", version)]
#[command(about = "Go-UPC Barcode Lookup CLI - look up products by UPC, EAN, or ISBN barcode")]
struct Cli {
    /// Log request details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage CLI configuration (API key, etc.)
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Look up a product by barcode (UPC / EAN / ISBN)
    Lookup {
        code: String,
        /// Output raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Look up multiple barcodes (space-separated)
    Batch {
        #[arg(required = true)]
        codes: Vec<String>,
        /// Output raw JSON array
        #[arg(long)]
        json: bool,
    },

    /// Show API information and usage tips
    Info,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Set a configuration value
    Set(SetArgs),
    /// Show current configuration
    Show,
    /// Clear all stored configuration
    Clear,
}

#[derive(Debug, Args)]
struct SetArgs {
    /// Your Go-UPC API key
    #[arg(long)]
    api_key: Option<String>,

    /// Read the API key from a hidden prompt instead
    #[arg(long, conflicts_with = "api_key")]
    prompt: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("GOUPC_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut store = ConfigStore::open().context("Failed to open configuration")?;

    match cli.command {
        Commands::Config(ConfigCommand::Set(args)) => {
            ui::config_set(&mut store, args.api_key, args.prompt)
        }
        Commands::Config(ConfigCommand::Show) => Ok(ui::config_show(&store)),
        Commands::Config(ConfigCommand::Clear) => ui::config_clear(&mut store),
        Commands::Lookup { code, json } => ui::lookup(&store, &code, json),
        Commands::Batch { codes, json } => ui::batch(&store, &codes, json),
        Commands::Info => Ok(ui::info(&store)),
    }
}
