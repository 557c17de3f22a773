//! # Post-processing
//!
//! Strategies run on the populated graph as the last stage of an import.
//!
//! Unlike the other stages, a failing post-processor is not absorbed by the
//! import task: its error reaches the caller of `run`.

use crate::graph::GraphModel;
use crate::PostProcessError;

/// A step run on the graph after it has been built.
pub trait PostProcessor: Send {
    /// Name used in logs and on the command line.
    fn name(&self) -> &str;

    /// Run the strategy on `model`.
    fn run(&mut self, model: &mut dyn GraphModel) -> Result<(), PostProcessError>;
}

/// Leaves the graph untouched. The default strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl PostProcessor for Identity {
    fn name(&self) -> &str {
        "identity"
    }

    fn run(&mut self, _model: &mut dyn GraphModel) -> Result<(), PostProcessError> {
        Ok(())
    }
}

/// Removes nodes with no edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct PruneIsolated;

impl PostProcessor for PruneIsolated {
    fn name(&self) -> &str {
        "prune-isolated"
    }

    fn run(&mut self, model: &mut dyn GraphModel) -> Result<(), PostProcessError> {
        MinDegree(1).run(model)
    }
}

/// Removes nodes whose degree is below the threshold.
///
/// Degrees are computed once, before any removal.
#[derive(Debug, Clone, Copy)]
pub struct MinDegree(pub usize);

impl PostProcessor for MinDegree {
    fn name(&self) -> &str {
        "min-degree"
    }

    fn run(&mut self, model: &mut dyn GraphModel) -> Result<(), PostProcessError> {
        let doomed: Vec<_> = model
            .node_ids()
            .into_iter()
            .filter(|&id| model.degree(id) < self.0)
            .collect();

        for id in &doomed {
            model.remove_node(*id)?;
        }

        tracing::info!("{}: removed {} nodes", self.name(), doomed.len());
        Ok(())
    }
}

/// Runs several strategies in order, stopping at the first failure.
#[derive(Default)]
pub struct Chain {
    steps: Vec<Box<dyn PostProcessor>>,
}

impl Chain {
    #[must_use]
    pub fn new(steps: Vec<Box<dyn PostProcessor>>) -> Self {
        Self { steps }
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl PostProcessor for Chain {
    fn name(&self) -> &str {
        "chain"
    }

    fn run(&mut self, model: &mut dyn GraphModel) -> Result<(), PostProcessError> {
        for step in &mut self.steps {
            tracing::debug!("Post-processing step: {}", step.name());
            step.run(model)?;
        }
        Ok(())
    }
}

/// Resolve a strategy from its command-line spelling.
///
/// Accepts `identity`, `prune-isolated`, `min-degree:N`, and comma-separated
/// lists of those (run in order).
pub fn by_name(spec: &str) -> Result<Box<dyn PostProcessor>, PostProcessError> {
    let parts: Vec<&str> = spec
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    match parts.as_slice() {
        [] => Ok(Box::new(Identity)),
        [single] => single_by_name(single),
        many => {
            let steps = many
                .iter()
                .map(|part| single_by_name(part))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Box::new(Chain::new(steps)))
        }
    }
}

fn single_by_name(name: &str) -> Result<Box<dyn PostProcessor>, PostProcessError> {
    match name {
        "identity" | "none" => Ok(Box::new(Identity)),
        "prune-isolated" => Ok(Box::new(PruneIsolated)),
        _ => {
            let threshold = name
                .strip_prefix("min-degree:")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| PostProcessError::Unknown(name.to_string()))?;
            Ok(Box::new(MinDegree(threshold)))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
