//! # Configuration
//!
//! `quarry.toml` holds defaults for the `run` command. Every key is optional
//! and command-line flags always win.
//!
//! ```toml
//! [source]
//! endpoint = "https://example.org/sparql"
//! timeout_secs = 30
//!
//! [task]
//! depth = 1
//! save = "result.nt"
//! post = "prune-isolated"
//! follow = true
//!
//! [output]
//! graph = "graph.qrry"
//! format = "snapshot"
//! ```

use crate::cli::RunArgs;
use quarry_core::QuarryError;
use quarry_core::postprocess;
use quarry_core::primitives::MAX_DEPTH_LEVEL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "quarry.toml";

/// Default HTTP timeout for remote sources.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// FILE FORMAT
// =============================================================================

/// Graph output format.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Binary snapshot (header + postcard)
    #[default]
    Snapshot,
    /// Pretty-printed JSON
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub endpoint: Option<String>,
    pub store: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            store: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaskConfig {
    pub depth: u32,
    pub save: Option<String>,
    pub post: Option<String>,
    pub follow: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub graph: Option<PathBuf>,
    pub format: OutputFormat,
}

/// Contents of `quarry.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub source: SourceConfig,
    pub task: TaskConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Parse and validate TOML text.
    pub fn from_toml(text: &str) -> Result<Self, QuarryError> {
        let config: Config = toml::from_str(text)
            .map_err(|e| QuarryError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, QuarryError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            QuarryError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Load `explicit` if given (it must exist), else `quarry.toml` if present,
    /// else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, QuarryError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.is_file() {
            tracing::debug!("Using {}", DEFAULT_CONFIG_PATH);
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<(), QuarryError> {
        if self.source.endpoint.is_some() && self.source.store.is_some() {
            return Err(QuarryError::Config(
                "source.endpoint and source.store are mutually exclusive".to_string(),
            ));
        }
        if self.source.timeout_secs == 0 {
            return Err(QuarryError::Config(
                "source.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if let Some(endpoint) = &self.source.endpoint {
            validate_endpoint(endpoint)?;
        }
        if let Some(post) = &self.task.post {
            postprocess::by_name(post)?;
        }
        Ok(())
    }
}

fn validate_endpoint(url: &str) -> Result<(), QuarryError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(QuarryError::Config(format!(
            "Endpoint must be an http(s) URL, got '{}'",
            url
        )))
    }
}

// =============================================================================
// RESOLVED SETTINGS
// =============================================================================

/// Where the query runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// SPARQL protocol endpoint.
    Endpoint(String),
    /// Local N-Triples file answered by a pattern store.
    Store(PathBuf),
}

/// Everything `run` needs, after merging flags over the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub query: String,
    pub source: Source,
    pub depth: u32,
    pub save: Option<String>,
    pub post: String,
    pub follow: bool,
    pub graph_out: Option<PathBuf>,
    pub format: OutputFormat,
    pub timeout: Duration,
}

impl RunSettings {
    pub fn resolve(args: &RunArgs, config: &Config) -> Result<Self, QuarryError> {
        let query = match (&args.query, &args.query_file) {
            (Some(query), _) => query.clone(),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                QuarryError::IoError(format!("Cannot read query file {}: {}", path.display(), e))
            })?,
            (None, None) => {
                return Err(QuarryError::Config(
                    "A query is required: use --query or --query-file".to_string(),
                ));
            }
        };
        if query.trim().is_empty() {
            return Err(QuarryError::Config("The query is empty".to_string()));
        }

        let source = match (&args.endpoint, &args.store) {
            (Some(url), _) => Source::Endpoint(url.clone()),
            (None, Some(path)) => Source::Store(path.clone()),
            (None, None) => match (&config.source.endpoint, &config.source.store) {
                (Some(url), _) => Source::Endpoint(url.clone()),
                (None, Some(path)) => Source::Store(path.clone()),
                (None, None) => {
                    return Err(QuarryError::Config(
                        "A source is required: use --endpoint or --store".to_string(),
                    ));
                }
            },
        };
        if let Source::Endpoint(url) = &source {
            validate_endpoint(url)?;
        }

        let depth = args.depth.unwrap_or(config.task.depth);
        if depth > MAX_DEPTH_LEVEL {
            tracing::warn!("Depth {} exceeds {}, it will be clamped", depth, MAX_DEPTH_LEVEL);
        }

        let post = args
            .post
            .clone()
            .or_else(|| config.task.post.clone())
            .unwrap_or_else(|| "identity".to_string());
        postprocess::by_name(&post)?;

        Ok(Self {
            query,
            source,
            depth,
            save: args.save.clone().or_else(|| config.task.save.clone()),
            post,
            follow: !args.no_follow && (args.follow || config.task.follow),
            graph_out: args.graph_out.clone().or_else(|| config.output.graph.clone()),
            format: args.format.unwrap_or(config.output.format),
            timeout: Duration::from_secs(config.source.timeout_secs),
        })
    }
}
