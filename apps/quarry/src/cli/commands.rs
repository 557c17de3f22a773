//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::{OutputFormat, RunSettings, Source};
use crate::progress::BarProgress;
use crate::remote::{HttpDereferencer, HttpEndpoint};
use quarry_core::formats::MAX_SNAPSHOT_SIZE;
use quarry_core::primitives::MAGIC_BYTES;
use quarry_core::{
    CancellationToken, Graph, GraphBuilder, GraphMetrics, ImportTask, NTriplesBuilder,
    PatternStore, ProgressChannel, QuarryError, QueryEngine, RunReport, TaskError,
    graph_from_bytes, graph_from_json, graph_to_bytes, graph_to_json, postprocess,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a local N-Triples store (100 MB).
const MAX_STORE_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), QuarryError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| QuarryError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(QuarryError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and make sure it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, QuarryError> {
    let canonical = path.canonicalize().map_err(|e| {
        QuarryError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(QuarryError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Canonicalize the parent directory of an output path.
fn validate_output_path(path: &Path) -> Result<PathBuf, QuarryError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let canonical_parent = parent.canonicalize().map_err(|e| {
        QuarryError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(QuarryError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| QuarryError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// IMPORT
// =============================================================================

/// Result of one import: the graph is returned even when post-processing
/// failed.
pub struct ImportOutcome {
    pub graph: Graph,
    pub report: RunReport,
    pub failure: Option<TaskError>,
}

fn build_engine(settings: &RunSettings) -> Result<Box<dyn QueryEngine>, QuarryError> {
    match &settings.source {
        Source::Endpoint(url) => {
            tracing::info!("Querying {}", url);
            Ok(Box::new(HttpEndpoint::new(url.as_str(), settings.timeout)?))
        }
        Source::Store(path) => {
            validate_file_size(path, MAX_STORE_FILE_SIZE)?;
            let text = std::fs::read_to_string(path).map_err(|e| {
                QuarryError::IoError(format!("Cannot read store {}: {}", path.display(), e))
            })?;
            let store = PatternStore::load(&text)?;
            tracing::info!("Loaded {} triples from {}", store.len(), path.display());
            Ok(Box::new(store))
        }
    }
}

fn build_builder(settings: &RunSettings) -> Result<Box<dyn GraphBuilder>, QuarryError> {
    if settings.follow && settings.depth > 0 {
        let dereferencer = HttpDereferencer::new(settings.timeout)?;
        return Ok(Box::new(NTriplesBuilder::with_dereferencer(Box::new(
            dereferencer,
        ))));
    }
    if settings.follow {
        tracing::warn!("--follow has no effect at depth 0");
    }
    Ok(Box::new(NTriplesBuilder::new()))
}

/// Run one import synchronously.
///
/// Builds blocking HTTP clients for remote sources, so call it from a
/// blocking worker, not from async code.
pub fn import(
    settings: &RunSettings,
    progress: Box<dyn ProgressChannel>,
    token: CancellationToken,
) -> Result<ImportOutcome, QuarryError> {
    let engine = build_engine(settings)?;
    let builder = build_builder(settings)?;
    let post = postprocess::by_name(&settings.post)?;

    let mut graph = Graph::new();
    let (report, failure) = {
        let mut task = ImportTask::new(&mut graph, settings.query.as_str(), settings.depth)
            .with_cancellation_token(token);
        task.set_query_engine(engine);
        task.set_graph_builder(builder);
        if let Some(save) = &settings.save {
            task.set_save_result(save.as_str());
        }
        task.set_post_processor(post);
        task.set_progress_channel(progress);

        let failure = task.run().err();
        (task.report().clone(), failure)
    };

    Ok(ImportOutcome {
        graph,
        report,
        failure,
    })
}

// =============================================================================
// GRAPH FILES
// =============================================================================

/// Write a graph in the requested format.
pub fn write_graph(graph: &Graph, path: &Path, format: OutputFormat) -> Result<(), QuarryError> {
    let path = validate_output_path(path)?;
    let data = match format {
        OutputFormat::Snapshot => graph_to_bytes(graph)?,
        OutputFormat::Json => graph_to_json(graph)?.into_bytes(),
    };

    std::fs::write(&path, &data)
        .map_err(|e| QuarryError::IoError(format!("Cannot write {}: {}", path.display(), e)))?;
    tracing::info!("Wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}

/// Load a graph from a binary snapshot or its JSON rendering.
pub fn load_graph(path: &Path) -> Result<Graph, QuarryError> {
    let path = validate_file_path(path)?;
    validate_file_size(&path, MAX_SNAPSHOT_SIZE as u64)?;

    let data = std::fs::read(&path)
        .map_err(|e| QuarryError::IoError(format!("Cannot read {}: {}", path.display(), e)))?;

    if data.starts_with(MAGIC_BYTES) {
        return graph_from_bytes(&data);
    }

    let text = std::str::from_utf8(&data).map_err(|_| {
        QuarryError::SerializationError(format!(
            "{} is neither a snapshot nor JSON",
            path.display()
        ))
    })?;
    graph_from_json(text)
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Run the import on a blocking worker; Ctrl-C cancels between stages.
pub async fn cmd_run(settings: RunSettings, json_mode: bool, quiet: bool) -> Result<(), QuarryError> {
    let token = CancellationToken::new();

    let watcher = token.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current stage");
            watcher.cancel();
        }
    });

    let worker_settings = settings.clone();
    let hidden = quiet || json_mode;
    let outcome = tokio::task::spawn_blocking(move || {
        import(
            &worker_settings,
            Box::new(BarProgress::for_terminal(hidden)),
            token,
        )
    })
    .await
    .map_err(|e| QuarryError::IoError(format!("Import worker failed: {}", e)))??;
    interrupt.abort();

    if let Some(path) = &settings.graph_out {
        write_graph(&outcome.graph, path, settings.format)?;
    }

    print_summary(&settings, &outcome, json_mode);

    match outcome.failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn source_label(source: &Source) -> String {
    match source {
        Source::Endpoint(url) => url.clone(),
        Source::Store(path) => path.display().to_string(),
    }
}

fn print_summary(settings: &RunSettings, outcome: &ImportOutcome, json_mode: bool) {
    let metrics = GraphMetrics::from_model(&outcome.graph);

    if json_mode {
        let output = serde_json::json!({
            "source": source_label(&settings.source),
            "depth": settings.depth,
            "post": settings.post,
            "elements": outcome.report.elements(),
            "stages": &outcome.report,
            "metrics": metrics,
            "graph_out": settings.graph_out.as_ref().map(|p| p.display().to_string()),
            "error": outcome.failure.as_ref().map(ToString::to_string),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return;
    }

    println!("Quarry Import");
    println!("=============");
    println!("Source: {}", source_label(&settings.source));
    println!("Depth:  {}", settings.depth);
    println!("Post:   {}", settings.post);
    println!();
    for (stage, stage_outcome) in outcome.report.stages() {
        println!("  {:<13} {}", stage.name(), stage_outcome);
    }
    println!();
    print_metrics(&metrics);
}

fn print_metrics(metrics: &GraphMetrics) {
    println!("Nodes:       {}", metrics.node_count);
    println!("Edges:       {}", metrics.edge_count);
    println!("Attributes:  {}", metrics.attribute_count);
    println!("Isolated:    {}", metrics.isolated_count);
    println!("Max Degree:  {}", metrics.max_degree);
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// Show metrics of a saved graph.
pub fn cmd_inspect(path: &Path, json_mode: bool) -> Result<(), QuarryError> {
    let graph = load_graph(path)?;
    let metrics = GraphMetrics::from_model(&graph);

    if json_mode {
        let output = serde_json::json!({
            "file": path.to_string_lossy(),
            "metrics": metrics,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Quarry Graph");
    println!("============");
    println!("File: {}", path.display());
    println!();
    print_metrics(&metrics);

    Ok(())
}
