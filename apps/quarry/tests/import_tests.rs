//! End-to-end import from a local store, without the network.

#![allow(clippy::unwrap_used, clippy::panic)]

use quarry::cli::{import, load_graph, write_graph};
use quarry::config::{OutputFormat, RunSettings, Source};
use quarry::progress::BarProgress;
use quarry_core::{CancellationToken, GraphModel, StageOutcome, Term};
use std::path::Path;
use std::time::Duration;

const DATA: &str = "\
<http://ex/alice> <http://ex/knows> <http://ex/bob> .
<http://ex/bob> <http://ex/knows> <http://ex/carol> .
<http://ex/alice> <http://ex/name> \"Alice\" .
<http://ex/erin> <http://ex/name> \"Erin\" .
";

fn settings(store: &Path) -> RunSettings {
    RunSettings {
        query: "CONSTRUCT WHERE { ?s ?p ?o }".to_string(),
        source: Source::Store(store.to_path_buf()),
        depth: 0,
        save: None,
        post: "identity".to_string(),
        follow: false,
        graph_out: None,
        format: OutputFormat::Snapshot,
        timeout: Duration::from_secs(5),
    }
}

fn write_store(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("data.nt");
    std::fs::write(&path, DATA).unwrap();
    path
}

#[test]
fn test_import_from_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_store(dir.path());

    let outcome = import(
        &settings(&store),
        Box::new(BarProgress::hidden()),
        CancellationToken::new(),
    )
    .unwrap();

    assert!(outcome.failure.is_none());
    assert_eq!(outcome.report.elements(), 4);
    assert_eq!(outcome.graph.node_count(), 4);
    assert_eq!(outcome.graph.edge_count(), 2);
}

#[test]
fn test_import_saves_raw_result_and_prunes() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_store(dir.path());
    let raw_path = dir.path().join("raw.nt");

    let mut settings = settings(&store);
    settings.save = Some(raw_path.to_str().unwrap().to_string());
    settings.post = "prune-isolated".to_string();

    let outcome = import(
        &settings,
        Box::new(BarProgress::hidden()),
        CancellationToken::new(),
    )
    .unwrap();

    let raw = std::fs::read_to_string(&raw_path).unwrap();
    assert_eq!(raw.lines().count(), 4);
    assert!(matches!(outcome.report.persist, StageOutcome::Done { .. }));
    assert!(
        outcome
            .graph
            .get_node_by_term(&Term::iri("http://ex/erin"))
            .is_none()
    );
}

#[test]
fn test_cancelled_import_returns_empty_graph() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_store(dir.path());
    let token = CancellationToken::new();
    token.cancel();

    let outcome = import(&settings(&store), Box::new(BarProgress::hidden()), token).unwrap();

    assert_eq!(outcome.report.query, StageOutcome::Cancelled);
    assert!(outcome.graph.is_empty());
}

#[test]
fn test_query_without_matches_builds_empty_graph() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_store(dir.path());
    let mut settings = settings(&store);
    settings.query = "?s <http://ex/missing> ?o".to_string();

    let outcome = import(
        &settings,
        Box::new(BarProgress::hidden()),
        CancellationToken::new(),
    )
    .unwrap();

    assert!(outcome.failure.is_none());
    assert_eq!(outcome.report.query, StageOutcome::Done { count: 0 });
    assert_eq!(outcome.report.elements(), 0);
    assert!(outcome.graph.is_empty());
}

#[test]
fn test_missing_store_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = import(
        &settings(&dir.path().join("absent.nt")),
        Box::new(BarProgress::hidden()),
        CancellationToken::new(),
    );
    assert!(result.is_err());
}

#[test]
fn test_graph_files_roundtrip_in_both_formats() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_store(dir.path());
    let outcome = import(
        &settings(&store),
        Box::new(BarProgress::hidden()),
        CancellationToken::new(),
    )
    .unwrap();

    for (name, format) in [
        ("graph.qrry", OutputFormat::Snapshot),
        ("graph.json", OutputFormat::Json),
    ] {
        let path = dir.path().join(name);
        write_graph(&outcome.graph, &path, format).unwrap();

        let loaded = load_graph(&path).unwrap();
        assert_eq!(loaded.node_count(), outcome.graph.node_count());
        assert_eq!(loaded.edge_count(), outcome.graph.edge_count());
    }
}

#[test]
fn test_load_graph_rejects_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.bin");
    std::fs::write(&path, [0xffu8, 0x00, 0x12]).unwrap();

    assert!(load_graph(&path).is_err());
}
