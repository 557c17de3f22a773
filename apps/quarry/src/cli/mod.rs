//! # Quarry CLI Module
//!
//! This module implements the CLI interface for Quarry.
//!
//! ## Available Commands
//!
//! - `run` - Run a query and import its result into a graph
//! - `inspect` - Show metrics of a saved graph

mod commands;

use crate::config::{Config, OutputFormat, RunSettings};
use clap::{ArgGroup, Args, Parser, Subcommand};
use quarry_core::QuarryError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Quarry - import query results into graphs
///
/// Runs a CONSTRUCT-style query against a SPARQL endpoint or a local
/// N-Triples file and builds a graph from the returned triples.
#[derive(Parser, Debug)]
#[command(name = "quarry")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner and progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file [default: quarry.toml, if present]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a query and import its result into a graph
    Run(RunArgs),

    /// Show metrics of a saved graph (binary snapshot or JSON)
    Inspect {
        /// Path to the graph file
        snapshot: PathBuf,
    },
}

/// Arguments of the `run` command. Unset flags fall back to the config file.
#[derive(Args, Debug, Clone, Default)]
#[command(group(ArgGroup::new("query_input").args(["query", "query_file"])))]
#[command(group(ArgGroup::new("source_kind").args(["endpoint", "store"])))]
pub struct RunArgs {
    /// Query text
    #[arg(long)]
    pub query: Option<String>,

    /// Read the query text from a file
    #[arg(short = 'f', long)]
    pub query_file: Option<PathBuf>,

    /// SPARQL endpoint URL
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Local N-Triples file to query instead of an endpoint
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    /// Link-following depth (0 disables it)
    #[arg(short, long)]
    pub depth: Option<u32>,

    /// Save the raw query result to this path
    #[arg(long)]
    pub save: Option<String>,

    /// Post-processing: identity, prune-isolated, min-degree:N (comma-separated to chain)
    #[arg(short, long)]
    pub post: Option<String>,

    /// Write the resulting graph to this path
    #[arg(short = 'o', long)]
    pub graph_out: Option<PathBuf>,

    /// Graph output format
    #[arg(short = 't', long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Dereference http(s) resources while expanding (needs --depth > 0)
    #[arg(long, overrides_with = "no_follow")]
    pub follow: bool,

    /// Never dereference, even if the config file enables it
    #[arg(long, overrides_with = "follow")]
    pub no_follow: bool,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), QuarryError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Run(args) => {
            let config = Config::discover(cli.config.as_deref())?;
            let settings = RunSettings::resolve(&args, &config)?;
            cmd_run(settings, json_mode, cli.quiet).await
        }
        Commands::Inspect { snapshot } => cmd_inspect(&snapshot, json_mode),
    }
}
