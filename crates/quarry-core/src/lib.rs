//! # quarry-core
//!
//! Turns the result of a query into an in-memory graph.
//!
//! The centre of the crate is [`ImportTask`], a cancellable unit of work that:
//! 1. runs a query through a [`QueryEngine`]
//! 2. parses the N-Triples result into a [`GraphModel`] with a [`GraphBuilder`]
//! 3. optionally saves the raw result through a [`ResultSink`]
//! 4. hands the graph to a [`PostProcessor`]
//!
//! and reports `start`/`tick`/`finish` to an optional [`ProgressChannel`].
//!
//! ## Architectural Constraints
//!
//! - No async and no network I/O: remote engines live in the app layer and
//!   plug in through the traits above
//! - Deterministic: `BTreeMap`/`BTreeSet` only, no floats
//! - Failures in the first three stages are logged and absorbed; only a
//!   post-processing failure escapes [`ImportTask::run`]

// =============================================================================
// MODULES
// =============================================================================

pub mod builder;
pub mod formats;
pub mod graph;
pub mod metrics;
pub mod ntriples;
pub mod postprocess;
pub mod primitives;
pub mod progress;
pub mod query;
pub mod sink;
pub mod task;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    GraphError, Literal, Node, NodeId, ParseError, PersistenceError, PostProcessError,
    QuarryError, QueryError, TaskError, Term, Triple,
};

// =============================================================================
// RE-EXPORTS: Import Pipeline
// =============================================================================

pub use builder::{Dereferencer, GraphBuilder, NTriplesBuilder};
pub use graph::{Graph, GraphModel, SerializableGraph};
pub use ntriples::parse_document;
pub use postprocess::{Chain, Identity, MinDegree, PostProcessor, PruneIsolated};
pub use progress::{FinishGuard, ProgressChannel};
pub use query::{PatternStore, QueryEngine};
pub use sink::{FileSink, ResultSink};
pub use task::{CancellationToken, ImportTask, RunReport, Stage, StageOutcome, TaskState};

// =============================================================================
// RE-EXPORTS: Formats and Metrics
// =============================================================================

pub use formats::{
    PersistenceHeader, graph_from_bytes, graph_from_json, graph_to_bytes, graph_to_json,
};
pub use metrics::GraphMetrics;
