//! # Import Task Scenarios
//!
//! End-to-end behaviour of `ImportTask`, grouped in tiers:
//! - S0: Lifecycle and progress
//! - S1: Stage isolation
//! - S2: Persistence
//! - S3: Cancellation
//! - S4: Full pipeline with the built-in collaborators

use quarry_core::{
    CancellationToken, Graph, GraphBuilder, GraphModel, ImportTask, NTriplesBuilder, ParseError,
    PostProcessError, PostProcessor, ProgressChannel, QueryEngine, QueryError, ResultSink,
    RunReport, SerializableGraph, StageOutcome, TaskError, TaskState, Term,
};
use std::io::Read;
use std::sync::{Arc, Mutex};

// =============================================================================
// SPIES
// =============================================================================

/// Ordered log shared by every spy of one test.
#[derive(Clone, Default)]
struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    fn push(&self, event: impl Into<String>) {
        self.0.lock().expect("lock").push(event.into());
    }

    fn list(&self) -> Vec<String> {
        self.0.lock().expect("lock").clone()
    }

    fn count(&self, event: &str) -> usize {
        self.list().iter().filter(|e| e.as_str() == event).count()
    }
}

struct SpyProgress(Events);

impl ProgressChannel for SpyProgress {
    fn start(&mut self, estimated_seconds: u64) {
        self.0.push(format!("start:{estimated_seconds}"));
    }
    fn tick(&mut self) {
        self.0.push("tick");
    }
    fn finish(&mut self) {
        self.0.push("finish");
    }
}

struct ScriptedEngine {
    result: Option<&'static str>,
    events: Events,
}

impl QueryEngine for ScriptedEngine {
    fn execute(&self, query: &str) -> Result<String, QueryError> {
        self.events.push(format!("query:{query}"));
        self.result
            .map(str::to_string)
            .ok_or_else(|| QueryError::Transport("endpoint unreachable".to_string()))
    }
}

/// Records its input; adds one node per non-empty line.
struct SpyBuilder {
    events: Events,
    fail_after: Option<usize>,
}

impl GraphBuilder for SpyBuilder {
    fn parse(
        &self,
        stream: &mut dyn Read,
        model: &mut dyn GraphModel,
        level: u32,
    ) -> Result<usize, ParseError> {
        let mut text = String::new();
        stream.read_to_string(&mut text)?;
        self.events.push(format!("parse:{level}:{text}"));

        let mut count = 0;
        for (index, line) in text.lines().filter(|l| !l.is_empty()).enumerate() {
            if self.fail_after == Some(index) {
                return Err(ParseError::Syntax {
                    line: index + 1,
                    message: "rejected".to_string(),
                });
            }
            model.insert_node(Term::iri(line))?;
            count += 1;
        }
        Ok(count)
    }
}

struct SpySink {
    events: Events,
    fail: bool,
}

impl ResultSink for SpySink {
    fn save(&self, destination: &str, raw: &str) -> Result<(), quarry_core::PersistenceError> {
        self.events.push(format!("save:{destination}:{raw}"));
        if self.fail {
            return Err(quarry_core::PersistenceError::Io {
                destination: destination.to_string(),
                source: std::io::Error::other("disk full"),
            });
        }
        Ok(())
    }
}

struct SpyPost {
    events: Events,
    fail: bool,
}

impl PostProcessor for SpyPost {
    fn name(&self) -> &str {
        "spy"
    }

    fn run(&mut self, model: &mut dyn GraphModel) -> Result<(), PostProcessError> {
        self.events.push(format!("post:{}", model.node_count()));
        if self.fail {
            return Err(PostProcessError::Failed {
                name: "spy".to_string(),
                message: "layout diverged".to_string(),
            });
        }
        Ok(())
    }
}

/// Collaborator switches for one run.
#[derive(Default)]
struct Setup {
    result: Option<&'static str>,
    parse_fail_after: Option<usize>,
    destination: Option<&'static str>,
    sink_fails: bool,
    post_fails: bool,
}

struct Outcome {
    run: Result<(), TaskError>,
    report: RunReport,
    raw_result: Option<String>,
    events: Vec<String>,
}

fn run_with(graph: &mut Graph, setup: Setup) -> Outcome {
    let events = Events::default();
    let mut task = ImportTask::new(graph, "CONSTRUCT WHERE { ?s ?p ?o }", 0);

    task.set_progress_channel(Box::new(SpyProgress(events.clone())));
    task.set_query_engine(Box::new(ScriptedEngine {
        result: setup.result,
        events: events.clone(),
    }));
    task.set_graph_builder(Box::new(SpyBuilder {
        events: events.clone(),
        fail_after: setup.parse_fail_after,
    }));
    task.set_sink(Box::new(SpySink {
        events: events.clone(),
        fail: setup.sink_fails,
    }));
    if let Some(destination) = setup.destination {
        task.set_save_result(destination);
    }
    task.set_post_processor(Box::new(SpyPost {
        events: events.clone(),
        fail: setup.post_fails,
    }));

    let run = task.run();
    Outcome {
        run,
        report: task.report().clone(),
        raw_result: task.raw_result().map(str::to_string),
        events: events.list(),
    }
}

fn saves(events: &[String]) -> usize {
    events.iter().filter(|e| e.starts_with("save:")).count()
}

fn finishes(events: &[String]) -> usize {
    events.iter().filter(|e| e.as_str() == "finish").count()
}

// =============================================================================
// TIER S0: LIFECYCLE AND PROGRESS
// =============================================================================

mod s0_lifecycle {
    use super::*;

    /// S0.1: Progress brackets the stages: start, one tick per stage, finish.
    #[test]
    fn progress_sequence_is_fixed() {
        let mut graph = Graph::new();
        let outcome = run_with(
            &mut graph,
            Setup {
                result: Some("a\nb"),
                destination: Some("out.nt"),
                ..Setup::default()
            },
        );

        assert_eq!(
            outcome.events,
            vec![
                "start:5",
                "tick",
                "query:CONSTRUCT WHERE { ?s ?p ?o }",
                "tick",
                "parse:0:a\nb",
                "tick",
                "save:out.nt:a\nb",
                "tick",
                "post:2",
                "finish",
            ]
        );
    }

    /// S0.2: A task runs once; the second call emits nothing.
    #[test]
    fn second_run_is_rejected_silently() {
        let mut graph = Graph::new();
        let events = Events::default();
        let mut task = ImportTask::new(&mut graph, "q", 0);
        task.set_progress_channel(Box::new(SpyProgress(events.clone())));

        task.run().expect("first run");
        let before = events.list().len();

        assert!(matches!(task.run(), Err(TaskError::AlreadyRun)));
        assert_eq!(events.list().len(), before);
        assert_eq!(events.count("finish"), 1);
    }

    /// S0.3: Setters after the run are ignored.
    #[test]
    fn setters_after_run_are_ignored() {
        let mut graph = Graph::new();
        let mut task = ImportTask::new(&mut graph, "q", 0);
        task.run().expect("run");

        task.set_save_result("late.nt");
        task.set_post_processor(Box::new(SpyPost {
            events: Events::default(),
            fail: true,
        }));

        assert_eq!(task.destination(), None);
        assert_eq!(task.state(), TaskState::Finished);
    }

    /// S0.4: The progress channel is handed back after the run.
    #[test]
    fn progress_channel_survives_run() {
        let mut graph = Graph::new();
        let mut task = ImportTask::new(&mut graph, "q", 0);
        assert!(task.progress_channel().is_none());

        task.set_progress_channel(Box::new(SpyProgress(Events::default())));
        task.run().expect("run");

        assert!(task.progress_channel().is_some());
    }

    /// S0.5: Without a channel every progress call is a no-op.
    #[test]
    fn no_channel_no_problem() {
        let mut graph = Graph::new();
        let mut task = ImportTask::new(&mut graph, "q", 3);
        task.run().expect("run");
        assert_eq!(task.level(), 3);
        assert_eq!(task.query(), "q");
    }

    /// S0.7: A panicking post-processor still finishes the task.
    #[test]
    fn panic_in_post_processing_finishes_task() {
        struct Exploding;

        impl PostProcessor for Exploding {
            fn name(&self) -> &str {
                "exploding"
            }

            fn run(&mut self, _model: &mut dyn GraphModel) -> Result<(), PostProcessError> {
                std::panic::resume_unwind(Box::new("layout blew up"))
            }
        }

        let mut graph = Graph::new();
        let events = Events::default();
        let mut task = ImportTask::new(&mut graph, "q", 0);
        task.set_progress_channel(Box::new(SpyProgress(events.clone())));
        task.set_query_engine(Box::new(ScriptedEngine {
            result: Some(""),
            events: events.clone(),
        }));
        task.set_post_processor(Box::new(Exploding));

        let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| task.run()));
        assert!(first.is_err());

        assert_eq!(task.state(), TaskState::Finished);
        assert!(task.progress_channel().is_some());
        assert_eq!(events.count("finish"), 1);

        assert!(matches!(task.run(), Err(TaskError::AlreadyRun)));
        assert_eq!(events.count("query:q"), 1);
        assert_eq!(events.count("finish"), 1);
    }

    /// S0.6: Last post-processor set wins.
    #[test]
    fn last_post_processor_wins() {
        let mut graph = Graph::new();
        let events = Events::default();
        let mut task = ImportTask::new(&mut graph, "q", 0);
        task.set_post_processor(Box::new(SpyPost {
            events: events.clone(),
            fail: true,
        }));
        task.set_post_processor(Box::new(SpyPost {
            events: events.clone(),
            fail: false,
        }));

        task.run().expect("second strategy succeeds");
        assert_eq!(events.list(), vec!["post:0"]);
    }
}

// =============================================================================
// TIER S1: STAGE ISOLATION
// =============================================================================

mod s1_isolation {
    use super::*;

    /// S1.1: Two-line result, no destination.
    #[test]
    fn two_line_result_builds_two_elements() {
        let mut graph = Graph::new();
        let outcome = run_with(
            &mut graph,
            Setup {
                result: Some("triple1\ntriple2"),
                ..Setup::default()
            },
        );

        assert!(outcome.run.is_ok());
        assert_eq!(outcome.report.elements(), 2);
        assert_eq!(
            outcome
                .events
                .iter()
                .filter(|e| e.starts_with("parse:"))
                .collect::<Vec<_>>(),
            vec!["parse:0:triple1\ntriple2"]
        );
        assert_eq!(saves(&outcome.events), 0);
        assert_eq!(finishes(&outcome.events), 1);
        assert_eq!(graph.node_count(), 2);
    }

    /// S1.1b: With the default strategy the graph is exactly what parsing built.
    #[test]
    fn default_post_processor_keeps_parsed_graph() {
        let raw = "\
<http://ex/alice> <http://ex/knows> <http://ex/bob> .
<http://ex/bob> <http://ex/knows> _:c .
<http://ex/alice> <http://ex/name> \"Alice\" .
<http://ex/erin> <http://ex/name> \"Erin\" .
";
        let events = Events::default();
        let mut graph = Graph::new();
        let mut task = ImportTask::new(&mut graph, "q", 0);
        task.set_query_engine(Box::new(ScriptedEngine {
            result: Some(raw),
            events: events.clone(),
        }));
        task.set_sink(Box::new(SpySink {
            events: events.clone(),
            fail: false,
        }));
        task.run().expect("run");
        let report = task.report().clone();
        drop(task);

        let mut expected = Graph::new();
        NTriplesBuilder::new()
            .parse(&mut raw.as_bytes(), &mut expected, 0)
            .expect("parse");

        assert_eq!(SerializableGraph::from(&graph), SerializableGraph::from(&expected));
        assert_eq!(report.parse, StageOutcome::Done { count: 4 });
        assert_eq!(
            report.post_process,
            StageOutcome::Done {
                count: expected.node_count()
            }
        );
        assert_eq!(saves(&events.list()), 0);
    }

    /// S1.2: A failed query leaves no result; parsing sees an empty stream.
    #[test]
    fn query_failure_parses_empty_stream() {
        let mut graph = Graph::new();
        let outcome = run_with(
            &mut graph,
            Setup {
                result: None,
                destination: Some("out.txt"),
                ..Setup::default()
            },
        );

        assert!(outcome.run.is_ok());
        assert!(outcome.report.query.is_failed());
        assert_eq!(outcome.report.parse, StageOutcome::Done { count: 0 });
        assert!(outcome.raw_result.is_none());
        assert!(outcome.events.contains(&"parse:0:".to_string()));

        // No result to save: the sink is never called.
        assert_eq!(saves(&outcome.events), 0);
        assert_eq!(outcome.report.persist, StageOutcome::Skipped);
        assert!(outcome.events.contains(&"post:0".to_string()));
        assert_eq!(finishes(&outcome.events), 1);
    }

    /// S1.3: A parse failure keeps the partial graph and later stages run.
    #[test]
    fn parse_failure_keeps_partial_graph() {
        let mut graph = Graph::new();
        let outcome = run_with(
            &mut graph,
            Setup {
                result: Some("a\nb\nc"),
                parse_fail_after: Some(2),
                destination: Some("out.nt"),
                ..Setup::default()
            },
        );

        assert!(outcome.run.is_ok());
        assert!(outcome.report.parse.is_failed());
        assert_eq!(outcome.report.elements(), 0);
        assert_eq!(saves(&outcome.events), 1);
        assert!(outcome.events.contains(&"post:2".to_string()));
        assert_eq!(graph.node_count(), 2);
    }

    /// S1.4: A sink failure is absorbed.
    #[test]
    fn persist_failure_is_absorbed() {
        let mut graph = Graph::new();
        let outcome = run_with(
            &mut graph,
            Setup {
                result: Some("a"),
                destination: Some("out.nt"),
                sink_fails: true,
                ..Setup::default()
            },
        );

        assert!(outcome.run.is_ok());
        assert!(outcome.report.persist.is_failed());
        assert_eq!(outcome.report.post_process, StageOutcome::Done { count: 1 });
        assert_eq!(outcome.report.failures(), 1);
    }

    /// S1.5: A post-processing failure reaches the caller; finish still fires.
    #[test]
    fn post_process_failure_propagates() {
        let mut graph = Graph::new();
        let outcome = run_with(
            &mut graph,
            Setup {
                result: Some("a\nb\nc"),
                post_fails: true,
                ..Setup::default()
            },
        );

        assert!(matches!(
            outcome.run,
            Err(TaskError::PostProcess(PostProcessError::Failed { .. }))
        ));
        assert!(outcome.report.post_process.is_failed());
        assert_eq!(finishes(&outcome.events), 1);
        assert_eq!(outcome.events.last().map(String::as_str), Some("finish"));
        assert_eq!(graph.node_count(), 3);
    }

    /// S1.6: Every stage failing still completes normally apart from stage 4.
    #[test]
    fn everything_fails() {
        let mut graph = Graph::new();
        let outcome = run_with(
            &mut graph,
            Setup {
                result: None,
                parse_fail_after: Some(0),
                destination: Some("out.nt"),
                sink_fails: true,
                post_fails: true,
            },
        );

        assert!(outcome.run.is_err());
        assert_eq!(finishes(&outcome.events), 1);
        assert_eq!(
            outcome.events.iter().filter(|e| e.as_str() == "tick").count(),
            4
        );
    }
}

// =============================================================================
// TIER S2: PERSISTENCE
// =============================================================================

mod s2_persistence {
    use super::*;

    /// S2.1: Unset or empty destination means zero sink calls.
    #[test]
    fn empty_destination_disables_sink() {
        for destination in [None, Some("")] {
            let mut graph = Graph::new();
            let outcome = run_with(
                &mut graph,
                Setup {
                    result: Some("a"),
                    destination,
                    ..Setup::default()
                },
            );
            assert_eq!(saves(&outcome.events), 0);
            assert_eq!(outcome.report.persist, StageOutcome::Skipped);
        }
    }

    /// S2.2: The default file sink writes the raw result verbatim.
    #[test]
    fn file_sink_receives_raw_result() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("result.nt");
        let raw = "<http://ex/a> <http://ex/p> <http://ex/b> .\n";

        let mut graph = Graph::new();
        let mut task = ImportTask::new(&mut graph, "q", 0);
        task.set_query_engine(Box::new(ScriptedEngine {
            result: Some(raw),
            events: Events::default(),
        }));
        task.set_save_result(path.to_str().expect("utf-8 path"));
        task.run().expect("run");

        assert_eq!(
            task.report().persist,
            StageOutcome::Done { count: raw.len() }
        );
        assert_eq!(std::fs::read_to_string(&path).expect("read"), raw);
    }
}

// =============================================================================
// TIER S3: CANCELLATION
// =============================================================================

mod s3_cancellation {
    use super::*;

    /// Cancels the shared token while the query runs.
    struct CancellingEngine(CancellationToken);

    impl QueryEngine for CancellingEngine {
        fn execute(&self, _query: &str) -> Result<String, QueryError> {
            self.0.cancel();
            Ok("<http://ex/a> <http://ex/p> <http://ex/b> .\n".to_string())
        }
    }

    /// S3.1: Cancelled before run: no stage starts, finish still fires.
    #[test]
    fn cancel_before_run_skips_everything() {
        let mut graph = Graph::new();
        let events = Events::default();
        let mut task = ImportTask::new(&mut graph, "q", 0);
        task.set_progress_channel(Box::new(SpyProgress(events.clone())));
        task.set_query_engine(Box::new(ScriptedEngine {
            result: Some("a"),
            events: events.clone(),
        }));

        task.cancel();
        task.run().expect("cancelled run is not an error");

        assert!(
            task.report()
                .stages()
                .all(|(_, outcome)| *outcome == StageOutcome::Cancelled)
        );
        assert_eq!(events.count("finish"), 1);
        assert!(!events.list().iter().any(|e| e.starts_with("query:")));
    }

    /// S3.2: The stage in flight completes; later stages are skipped.
    #[test]
    fn cancel_during_query_stops_at_next_boundary() {
        let token = CancellationToken::new();
        let mut graph = Graph::new();
        {
            let mut task = ImportTask::new(&mut graph, "q", 0)
                .with_cancellation_token(token.clone());
            task.set_query_engine(Box::new(CancellingEngine(token.clone())));
            task.run().expect("run");

            assert!(matches!(task.report().query, StageOutcome::Done { .. }));
            assert!(task.raw_result().is_some());
            assert_eq!(task.report().parse, StageOutcome::Cancelled);
            assert_eq!(task.report().post_process, StageOutcome::Cancelled);
            assert_eq!(task.state(), TaskState::Finished);
        }
        assert!(graph.is_empty());
    }

    /// S3.3: The task exposes a token usable from another thread.
    #[test]
    fn token_crosses_threads() {
        let mut graph = Graph::new();
        let mut task = ImportTask::new(&mut graph, "q", 0);
        let token = task.cancellation_token();

        std::thread::spawn(move || token.cancel())
            .join()
            .expect("join");

        task.run().expect("run");
        assert_eq!(task.report().query, StageOutcome::Cancelled);
    }
}

// =============================================================================
// TIER S4: FULL PIPELINE
// =============================================================================

mod s4_pipeline {
    use super::*;
    use quarry_core::{GraphMetrics, PatternStore, PruneIsolated};

    const DATA: &str = "\
<http://ex/alice> <http://ex/knows> <http://ex/bob> .
<http://ex/bob> <http://ex/knows> <http://ex/carol> .
<http://ex/alice> <http://ex/name> \"Alice\" .
<http://ex/dave> <http://ex/name> \"Dave\" .
";

    /// S4.1: Pattern store, N-Triples builder and pruning work together.
    #[test]
    fn pattern_store_to_pruned_graph() {
        let store = PatternStore::load(DATA).expect("load");
        let mut graph = Graph::new();
        {
            let mut task = ImportTask::new(&mut graph, "CONSTRUCT WHERE { ?s ?p ?o }", 0);
            task.set_query_engine(Box::new(store));
            task.set_post_processor(Box::new(PruneIsolated));
            task.run().expect("run");

            assert_eq!(task.report().elements(), 4);
            assert_eq!(task.report().post_process, StageOutcome::Done { count: 3 });
        }

        let metrics = GraphMetrics::from_model(&graph);
        assert_eq!(metrics.node_count, 3);
        assert_eq!(metrics.edge_count, 2);
        assert_eq!(metrics.attribute_count, 1);
        assert!(graph.get_node_by_term(&Term::iri("http://ex/dave")).is_none());
    }

    /// S4.2: A malformed query is a query failure, not a task failure.
    #[test]
    fn malformed_query_is_absorbed() {
        let store = PatternStore::load(DATA).expect("load");
        let mut graph = Graph::new();
        let mut task = ImportTask::new(&mut graph, "SELECT * WHERE { ?s ?p ?o }", 0);
        task.set_query_engine(Box::new(store));

        task.run().expect("run");
        assert!(task.report().query.is_failed());
        assert_eq!(task.report().elements(), 0);
    }
}
