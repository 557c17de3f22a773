//! # Import Task
//!
//! `ImportTask` drives one import end to end, in a fixed order:
//!
//! 1. **Query**: run the query through the [`QueryEngine`] and keep the raw result
//! 2. **Parse**: feed the raw result (or an empty stream) to the [`GraphBuilder`]
//! 3. **Persist**: save the raw result through the [`ResultSink`] if a
//!    destination is set
//! 4. **Post-process**: hand the graph to the [`PostProcessor`]
//!
//! Failures in stages 1-3 are logged and recorded in the [`RunReport`]; the
//! next stage still runs. A post-processing failure is returned from
//! [`ImportTask::run`]. In every case the progress channel sees `finish`
//! exactly once.
//!
//! ## Cancellation
//!
//! [`CancellationToken`] is advisory. It is consulted at stage boundaries only:
//! a stage in flight completes, stages not yet begun are skipped.

use crate::builder::{GraphBuilder, NTriplesBuilder};
use crate::graph::GraphModel;
use crate::postprocess::{Identity, PostProcessor};
use crate::primitives::DEFAULT_ESTIMATED_SECONDS;
use crate::progress::{FinishGuard, ProgressChannel};
use crate::query::QueryEngine;
use crate::sink::{FileSink, ResultSink};
use crate::{QueryError, TaskError};
use serde::Serialize;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// =============================================================================
// CANCELLATION
// =============================================================================

/// Shared cancellation flag.
///
/// Clones observe the same flag, so a token can be handed to another thread
/// (a signal handler, a UI) while the task runs.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// =============================================================================
// STAGES AND OUTCOMES
// =============================================================================

/// Lifecycle of a task. There is no way back from `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskState {
    Created,
    Configured,
    Running,
    Finished,
}

/// The four stages of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Stage {
    Query,
    Parse,
    Persist,
    PostProcess,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 4] = [Stage::Query, Stage::Parse, Stage::Persist, Stage::PostProcess];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Query => "query",
            Stage::Parse => "parse",
            Stage::Persist => "persist",
            Stage::PostProcess => "post-process",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happened to one stage.
///
/// The `count` of a completed stage is stage-specific: result bytes for the
/// query, triples for the parse, bytes written for the persist stage, and
/// nodes left after post-processing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum StageOutcome {
    /// Not reached yet.
    #[default]
    Pending,
    Done {
        count: usize,
    },
    /// Nothing to do (no destination, or no result to save).
    Skipped,
    Failed {
        message: String,
    },
    /// Cancellation was requested before the stage began.
    Cancelled,
}

impl StageOutcome {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, StageOutcome::Failed { .. })
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageOutcome::Pending => f.write_str("pending"),
            StageOutcome::Done { count } => write!(f, "done ({count})"),
            StageOutcome::Skipped => f.write_str("skipped"),
            StageOutcome::Failed { message } => write!(f, "failed: {message}"),
            StageOutcome::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Outcome of every stage of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub query: StageOutcome,
    pub parse: StageOutcome,
    pub persist: StageOutcome,
    pub post_process: StageOutcome,
}

impl RunReport {
    #[must_use]
    pub fn outcome(&self, stage: Stage) -> &StageOutcome {
        match stage {
            Stage::Query => &self.query,
            Stage::Parse => &self.parse,
            Stage::Persist => &self.persist,
            Stage::PostProcess => &self.post_process,
        }
    }

    fn outcome_mut(&mut self, stage: Stage) -> &mut StageOutcome {
        match stage {
            Stage::Query => &mut self.query,
            Stage::Parse => &mut self.parse,
            Stage::Persist => &mut self.persist,
            Stage::PostProcess => &mut self.post_process,
        }
    }

    /// Stages with their outcomes, in execution order.
    pub fn stages(&self) -> impl Iterator<Item = (Stage, &StageOutcome)> {
        Stage::ALL.into_iter().map(move |stage| (stage, self.outcome(stage)))
    }

    /// Number of triples the parse stage applied (0 unless it completed).
    #[must_use]
    pub fn elements(&self) -> usize {
        match self.parse {
            StageOutcome::Done { count } => count,
            _ => 0,
        }
    }

    /// Number of failed stages.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.stages().filter(|(_, outcome)| outcome.is_failed()).count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (stage, outcome)) in self.stages().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{stage}: {outcome}")?;
        }
        Ok(())
    }
}

// =============================================================================
// IMPORT TASK
// =============================================================================

/// One import of a query result into a graph model.
///
/// The task borrows the model mutably for its whole lifetime, so nothing else
/// can touch the graph until the task is dropped.
pub struct ImportTask<'g> {
    model: &'g mut dyn GraphModel,
    query: String,
    level: u32,
    engine: Option<Box<dyn QueryEngine>>,
    builder: Box<dyn GraphBuilder>,
    sink: Box<dyn ResultSink>,
    destination: Option<String>,
    post_processor: Box<dyn PostProcessor>,
    progress: Option<Box<dyn ProgressChannel>>,
    cancellation: CancellationToken,
    raw_result: Option<String>,
    report: RunReport,
    state: TaskState,
}

impl<'g> ImportTask<'g> {
    /// Create a task importing the result of `query` into `model`.
    ///
    /// Defaults: no query engine, [`NTriplesBuilder`] without link following,
    /// [`FileSink`] with no destination, [`Identity`] post-processing, no
    /// progress channel.
    pub fn new(model: &'g mut dyn GraphModel, query: impl Into<String>, level: u32) -> Self {
        Self {
            model,
            query: query.into(),
            level,
            engine: None,
            builder: Box::new(NTriplesBuilder::new()),
            sink: Box::new(FileSink),
            destination: None,
            post_processor: Box::new(Identity),
            progress: None,
            cancellation: CancellationToken::new(),
            raw_result: None,
            report: RunReport::default(),
            state: TaskState::Created,
        }
    }

    /// Share `token` with this task instead of its private one.
    #[must_use]
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    /// Returns false (and logs) once the task has run.
    fn configurable(&mut self, setting: &str) -> bool {
        match self.state {
            TaskState::Created | TaskState::Configured => {
                self.state = TaskState::Configured;
                true
            }
            TaskState::Running | TaskState::Finished => {
                tracing::warn!("Ignoring {} on a task that has already run", setting);
                false
            }
        }
    }

    pub fn set_query_engine(&mut self, engine: Box<dyn QueryEngine>) {
        if self.configurable("query engine") {
            self.engine = Some(engine);
        }
    }

    pub fn set_graph_builder(&mut self, builder: Box<dyn GraphBuilder>) {
        if self.configurable("graph builder") {
            self.builder = builder;
        }
    }

    pub fn set_sink(&mut self, sink: Box<dyn ResultSink>) {
        if self.configurable("result sink") {
            self.sink = sink;
        }
    }

    /// Where to save the raw result. An empty destination disables saving.
    pub fn set_save_result(&mut self, destination: impl Into<String>) {
        if self.configurable("save destination") {
            let destination = destination.into();
            self.destination = (!destination.is_empty()).then_some(destination);
        }
    }

    /// Replace the post-processing strategy. The last call wins.
    pub fn set_post_processor(&mut self, processor: Box<dyn PostProcessor>) {
        if self.configurable("post-processor") {
            self.post_processor = processor;
        }
    }

    pub fn set_progress_channel(&mut self, channel: Box<dyn ProgressChannel>) {
        if self.configurable("progress channel") {
            self.progress = Some(channel);
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn progress_channel(&self) -> Option<&dyn ProgressChannel> {
        self.progress.as_deref()
    }

    /// A clone of the token this task checks between stages.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Request cancellation. Stages not yet begun will be skipped.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// The raw query result, if the query stage produced one.
    #[must_use]
    pub fn raw_result(&self) -> Option<&str> {
        self.raw_result.as_deref()
    }

    #[must_use]
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state
    }

    // -------------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------------

    /// Run the import on the calling thread.
    ///
    /// Only a post-processing failure is returned as an error. A task runs
    /// once: later calls fail with [`TaskError::AlreadyRun`] and emit no
    /// progress. This holds even when a collaborator panicked: the panic is
    /// resumed after the task is marked finished and its channel restored.
    pub fn run(&mut self) -> Result<(), TaskError> {
        if matches!(self.state, TaskState::Running | TaskState::Finished) {
            tracing::warn!("Import task already ran");
            return Err(TaskError::AlreadyRun);
        }

        self.state = TaskState::Running;
        let mut progress = FinishGuard::new(self.progress.take());
        progress.start(DEFAULT_ESTIMATED_SECONDS);
        tracing::info!("Begin import (depth level {})", self.level);

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run_stages(&mut progress)));

        self.progress = progress.release();
        self.state = TaskState::Finished;

        match result {
            Ok(result) => {
                tracing::info!("End import: {}", self.report);
                result
            }
            Err(payload) => {
                tracing::error!("Import aborted by a panic: {}", self.report);
                panic::resume_unwind(payload)
            }
        }
    }

    fn run_stages(&mut self, progress: &mut FinishGuard) -> Result<(), TaskError> {
        for stage in [Stage::Query, Stage::Parse, Stage::Persist] {
            progress.tick();
            let outcome = if self.proceed(stage) {
                match stage {
                    Stage::Query => self.execute_query(),
                    Stage::Parse => self.parse_result(),
                    _ => self.persist_result(),
                }
            } else {
                StageOutcome::Cancelled
            };
            *self.report.outcome_mut(stage) = outcome;
        }

        progress.tick();
        if !self.proceed(Stage::PostProcess) {
            self.report.post_process = StageOutcome::Cancelled;
            return Ok(());
        }

        tracing::info!("Post-processing with '{}'", self.post_processor.name());
        match self.post_processor.run(&mut *self.model) {
            Ok(()) => {
                self.report.post_process = StageOutcome::Done {
                    count: self.model.node_count(),
                };
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Post-processing failed: {}", e);
                self.report.post_process = StageOutcome::Failed {
                    message: e.to_string(),
                };
                Err(TaskError::PostProcess(e))
            }
        }
    }

    fn proceed(&self, stage: Stage) -> bool {
        if self.cancellation.is_cancelled() {
            tracing::info!("Import cancelled, skipping {} stage", stage);
            return false;
        }
        tracing::info!("Begin {} stage", stage);
        true
    }

    fn execute_query(&mut self) -> StageOutcome {
        let result = match &self.engine {
            Some(engine) => engine.execute(&self.query),
            None => Err(QueryError::NoEngine),
        };

        match result {
            Ok(raw) => {
                let count = raw.len();
                self.raw_result = Some(raw);
                StageOutcome::Done { count }
            }
            Err(e) => {
                tracing::info!("Query stage failed: {}", e);
                self.raw_result = None;
                StageOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    fn parse_result(&mut self) -> StageOutcome {
        let mut stream = self.raw_result.as_deref().unwrap_or_default().as_bytes();

        match self.builder.parse(&mut stream, &mut *self.model, self.level) {
            Ok(count) => {
                tracing::info!("Parsed {} triples", count);
                StageOutcome::Done { count }
            }
            Err(e) => {
                tracing::info!("Parse stage failed: {}", e);
                StageOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    fn persist_result(&mut self) -> StageOutcome {
        let Some(destination) = self.destination.as_deref() else {
            return StageOutcome::Skipped;
        };
        let Some(raw) = self.raw_result.as_deref() else {
            tracing::info!("No query result to save to '{}'", destination);
            return StageOutcome::Skipped;
        };

        match self.sink.save(destination, raw) {
            Ok(()) => StageOutcome::Done { count: raw.len() },
            Err(e) => {
                tracing::info!("Persist stage failed: {}", e);
                StageOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
