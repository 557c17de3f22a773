//! # Error Types
//!
//! One error enum per import stage, plus the graph model's own errors and the
//! top-level error used by the application layer.
//!
//! Stages 1-3 of an import absorb their errors (logged, never re-raised).
//! Only [`PostProcessError`] escapes [`crate::ImportTask::run`], wrapped in
//! [`TaskError`].

use crate::NodeId;
use thiserror::Error;

/// Errors raised by a [`crate::GraphModel`].
#[derive(Debug, Error)]
pub enum GraphError {
    /// The requested node was not found in the graph.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// A literal was offered where a resource node is required.
    #[error("Literal cannot become a graph node: {0}")]
    LiteralNode(String),

    /// Stored graph data contradicts itself.
    #[error("Inconsistent graph data: {0}")]
    Inconsistent(String),
}

/// Stage 1: the query engine could not produce a result.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The task was run without a query engine.
    #[error("No query engine configured")]
    NoEngine,

    /// The query text could not be understood by the engine.
    #[error("Malformed query: {0}")]
    Malformed(String),

    /// The data source could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The data source answered with a non-success status.
    #[error("Endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The result exceeds `MAX_RESULT_BYTES`.
    #[error("Result of {size} bytes exceeds maximum allowed {max} bytes")]
    TooLarge { size: usize, max: usize },
}

/// Stage 2: the graph builder rejected its input.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A statement could not be parsed.
    #[error("Line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// The input stream could not be read.
    #[error("Cannot read input: {0}")]
    Io(#[from] std::io::Error),

    /// The graph model refused a mutation.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Stage 3: the raw result could not be saved.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Cannot write result to '{destination}': {source}")]
    Io {
        destination: String,
        #[source]
        source: std::io::Error,
    },
}

/// Stage 4: the post-processing strategy failed.
#[derive(Debug, Error)]
pub enum PostProcessError {
    /// The graph model refused a mutation.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The strategy reported a failure of its own.
    #[error("Post-processor '{name}' failed: {message}")]
    Failed { name: String, message: String },

    /// No strategy is registered under this name.
    #[error("Unknown post-processor: {0}")]
    Unknown(String),
}

/// Errors observable by the caller of [`crate::ImportTask::run`].
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Post-processing failed: {0}")]
    PostProcess(#[from] PostProcessError),

    /// `run` was called on a task that already finished.
    #[error("Task has already run")]
    AlreadyRun,
}

/// Top-level error for the application layer.
#[derive(Debug, Error)]
pub enum QuarryError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    PostProcess(#[from] PostProcessError),

    #[error(transparent)]
    Task(#[from] TaskError),

    /// Invalid configuration file or command-line combination.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}
