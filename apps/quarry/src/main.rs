//! # Quarry
//!
//! Command-line front end of the Quarry import engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  apps/quarry (THE BINARY)                  │
//! │                                                           │
//! │  ┌──────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │  │   CLI    │   │ Remote (HTTP)│   │ Progress (bar)   │  │
//! │  │  (clap)  │   │  (reqwest)   │   │  (indicatif)     │  │
//! │  └────┬─────┘   └──────┬───────┘   └────────┬─────────┘  │
//! │       └────────────────┼────────────────────┘            │
//! │                        ▼                                  │
//! │                ┌───────────────┐                          │
//! │                │  quarry-core  │                          │
//! │                │  (THE LOGIC)  │                          │
//! │                └───────────────┘                          │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Import from a SPARQL endpoint, following links one level deep
//! quarry run -e https://dbpedia.org/sparql -f query.rq -d 1 --follow -o graph.qrry
//!
//! # Import from a local N-Triples file and prune isolated nodes
//! quarry run -s data.nt --query "?s ?p ?o" -p prune-isolated
//!
//! # Inspect a saved graph
//! quarry inspect graph.qrry
//! ```

use clap::Parser;
use quarry::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // QUARRY_LOG_FORMAT=json enables machine-parseable output. Logs go to
    // stderr so stdout only carries the command's own output.
    let log_format = std::env::var("QUARRY_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "quarry=debug,quarry_core=debug"
    } else {
        "quarry=info,quarry_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    eprintln!(
        r#"
   ____
  / __ \__  ______ _______________  __
 / / / / / / / __ `/ ___/ ___/ / / /
/ /_/ / /_/ / /_/ / /  / /  / /_/ /
\___\_\__,_/\__,_/_/  /_/   \__, /
                           /____/
  Query -> Graph v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
