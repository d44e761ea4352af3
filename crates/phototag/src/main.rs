//! PhotoTag CLI - semantic tags and near-duplicate groups for a photo library.
//!
//! PhotoTag reads photos and prints structured data: tags with confidences,
//! duplicate groups, and a library report for the backup step. It never
//! modifies the photos it reads.
//!
//! # Usage
//!
//! ```bash
//! # Tag a single photo
//! phototag tag dog.jpg --confidence
//!
//! # Group near-duplicates without loading the model
//! phototag duplicates ./photos/ --max-distance 8
//!
//! # Tag and group a whole library, writing a report
//! phototag organize ./photos/ --output report.jsonl --format jsonl
//!
//! # View configuration
//! phototag config show
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use phototag_core::Config;

mod cli;
mod logging;

/// PhotoTag - semantic tags and near-duplicate groups for a photo library.
#[derive(Parser, Debug)]
#[command(name = "phototag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true, env = "PHOTOTAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Tag a single photo
    Tag(cli::tag::TagArgs),

    /// Group visually similar photos by perceptual fingerprint
    Duplicates(cli::duplicates::DuplicatesArgs),

    /// Tag every photo in a directory and group near-duplicates
    Organize(cli::organize::OrganizeArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

/// Load the `--config` file, or the file at `default_path` when it exists.
///
/// Only a missing default file means defaults; a file that exists but does
/// not parse or validate is an error.
fn load_config(explicit: Option<&Path>, default_path: &Path) -> anyhow::Result<Config> {
    let path = match explicit {
        Some(path) => path,
        None if !default_path.exists() => return Ok(Config::default()),
        None => default_path,
    };
    Config::load_from(path).with_context(|| format!("Invalid config file {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref(), &Config::default_path())?;
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("PhotoTag v{}", phototag_core::VERSION);

    match cli.command {
        Commands::Tag(args) => cli::tag::execute(args, config).await,
        Commands::Duplicates(args) => cli::duplicates::execute(args, config).await,
        Commands::Organize(args) => cli::organize::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, config, cli.config).await,
    }
}
