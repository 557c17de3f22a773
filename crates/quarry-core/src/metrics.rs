//! # Graph Metrics
//!
//! Summary figures for an imported graph, computed through the
//! [`GraphModel`] trait so they work for any model implementation.

use crate::graph::GraphModel;
use serde::{Deserialize, Serialize};

/// Metrics extracted from a graph model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMetrics {
    /// Total number of nodes in the graph.
    pub node_count: usize,
    /// Total number of edges in the graph.
    pub edge_count: usize,
    /// Total number of `(key, value)` attributes over all nodes.
    pub attribute_count: usize,
    /// Nodes with no edge in either direction.
    pub isolated_count: usize,
    /// Highest degree of any node (0 if the graph is empty).
    pub max_degree: usize,
}

impl GraphMetrics {
    /// Create new metrics with all zeros.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compute metrics from a model.
    #[must_use]
    pub fn from_model(model: &dyn GraphModel) -> Self {
        let mut metrics = Self {
            node_count: model.node_count(),
            edge_count: model.edge_count(),
            ..Self::default()
        };

        for id in model.node_ids() {
            let degree = model.degree(id);
            if degree == 0 {
                metrics.isolated_count += 1;
            }
            metrics.max_degree = metrics.max_degree.max(degree);
            metrics.attribute_count += model.attributes(id).len();
        }

        metrics
    }
}
