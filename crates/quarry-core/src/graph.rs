//! # Graph Model
//!
//! The mutable graph an import populates.
//!
//! This module defines the `GraphModel` trait and its in-memory implementation.
//! All data structures use `BTreeMap` for deterministic ordering.
//!
//! ## Sharing Contract
//!
//! A graph model is owned by the caller of an import and lent to the
//! [`crate::ImportTask`] as `&mut dyn GraphModel` for the task's lifetime.
//! The task is its only writer while it runs; the caller gets it back once
//! the task is dropped.

use crate::{GraphError, Node, NodeId, Term};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// GRAPHMODEL TRAIT
// =============================================================================

/// The GraphModel trait defines the operations the builder and post-processors
/// need.
///
/// The trait is object safe so stages can share one `&mut dyn GraphModel`.
pub trait GraphModel: Send {
    /// Insert a node for the given resource term. Returns the NodeId.
    /// If the term already has a node, returns the existing NodeId.
    fn insert_node(&mut self, term: Term) -> Result<NodeId, GraphError>;

    /// Insert a labelled edge. Returns `true` if the edge is new.
    fn insert_edge(&mut self, from: NodeId, to: NodeId, predicate: &str)
    -> Result<bool, GraphError>;

    /// Attach a literal value to a node under the given key.
    /// Multiple values can be stored for the same key.
    fn set_attribute(&mut self, node: NodeId, key: &str, value: &str) -> Result<(), GraphError>;

    /// Remove a node together with its edges and attributes.
    fn remove_node(&mut self, node: NodeId) -> Result<(), GraphError>;

    /// Lookup a node by its NodeId.
    fn lookup(&self, id: NodeId) -> Option<Node>;

    /// Get the node standing for a term.
    fn get_node_by_term(&self, term: &Term) -> Option<NodeId>;

    /// All node ids in ascending order.
    fn node_ids(&self) -> Vec<NodeId>;

    /// Outgoing edges of a node as `(target, predicate)` pairs.
    fn edges_from(&self, node: NodeId) -> Vec<(NodeId, String)>;

    /// Number of edges touching the node, in either direction.
    fn degree(&self, node: NodeId) -> usize;

    /// All `(key, value)` attributes of a node.
    fn attributes(&self, node: NodeId) -> Vec<(String, String)>;

    /// Get the total number of nodes.
    fn node_count(&self) -> usize;

    /// Get the total number of edges.
    fn edge_count(&self) -> usize;
}

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// The in-memory graph.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Node storage: NodeId -> Node
    nodes: BTreeMap<NodeId, Node>,

    /// Adjacency list: from_node -> (to_node -> predicates)
    edges: BTreeMap<NodeId, BTreeMap<NodeId, BTreeSet<String>>>,

    /// Reverse lookup: Term -> NodeId
    term_index: BTreeMap<Term, NodeId>,

    /// Node attributes: NodeId -> key -> [values]
    attributes: BTreeMap<NodeId, BTreeMap<String, Vec<String>>>,

    /// Next available NodeId
    next_node_id: u64,
}

impl Graph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate over all nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterate over all edges as `(from, to, predicate)`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &str)> {
        self.edges.iter().flat_map(|(&from, targets)| {
            targets.iter().flat_map(move |(&to, predicates)| {
                predicates.iter().map(move |p| (from, to, p.as_str()))
            })
        })
    }

    /// True if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn require(&self, node: NodeId) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node) {
            Ok(())
        } else {
            Err(GraphError::NodeNotFound(node))
        }
    }
}

impl GraphModel for Graph {
    fn insert_node(&mut self, term: Term) -> Result<NodeId, GraphError> {
        if let Term::Literal(literal) = &term {
            return Err(GraphError::LiteralNode(literal.lexical.clone()));
        }

        if let Some(&existing) = self.term_index.get(&term) {
            return Ok(existing);
        }

        let id = NodeId(self.next_node_id);
        self.next_node_id = self.next_node_id.saturating_add(1);

        self.term_index.insert(term.clone(), id);
        self.nodes.insert(id, Node::new(id, term));

        Ok(id)
    }

    fn insert_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        predicate: &str,
    ) -> Result<bool, GraphError> {
        self.require(from)?;
        self.require(to)?;

        Ok(self
            .edges
            .entry(from)
            .or_default()
            .entry(to)
            .or_default()
            .insert(predicate.to_string()))
    }

    fn set_attribute(&mut self, node: NodeId, key: &str, value: &str) -> Result<(), GraphError> {
        self.require(node)?;

        let values = self
            .attributes
            .entry(node)
            .or_default()
            .entry(key.to_string())
            .or_default();

        if !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
        Ok(())
    }

    fn remove_node(&mut self, node: NodeId) -> Result<(), GraphError> {
        let removed = self.nodes.remove(&node).ok_or(GraphError::NodeNotFound(node))?;

        self.term_index.remove(&removed.term);
        self.attributes.remove(&node);
        self.edges.remove(&node);

        // Incoming edges
        for targets in self.edges.values_mut() {
            targets.remove(&node);
        }
        self.edges.retain(|_, targets| !targets.is_empty());

        Ok(())
    }

    fn lookup(&self, id: NodeId) -> Option<Node> {
        self.nodes.get(&id).cloned()
    }

    fn get_node_by_term(&self, term: &Term) -> Option<NodeId> {
        self.term_index.get(term).copied()
    }

    fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn edges_from(&self, node: NodeId) -> Vec<(NodeId, String)> {
        self.edges
            .get(&node)
            .map(|targets| {
                targets
                    .iter()
                    .flat_map(|(&to, predicates)| predicates.iter().map(move |p| (to, p.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn degree(&self, node: NodeId) -> usize {
        let outgoing: usize = self
            .edges
            .get(&node)
            .map(|targets| targets.values().map(BTreeSet::len).sum())
            .unwrap_or(0);

        let incoming: usize = self
            .edges
            .iter()
            .filter(|&(&from, _)| from != node)
            .filter_map(|(_, targets)| targets.get(&node))
            .map(BTreeSet::len)
            .sum();

        outgoing + incoming
    }

    fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.attributes
            .get(&node)
            .map(|keys| {
                keys.iter()
                    .flat_map(|(key, values)| values.iter().map(move |v| (key.clone(), v.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn edge_count(&self) -> usize {
        self.edges
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeSet::len)
            .sum()
    }
}

// =============================================================================
// SERIALIZABLE GRAPH
// =============================================================================

/// Flat, serde-friendly mirror of a [`Graph`] used by snapshots and JSON export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<(NodeId, NodeId, String)>,
    pub next_node_id: u64,
    #[serde(default)]
    pub attributes: Vec<(u64, String, String)>,
}

impl From<&Graph> for SerializableGraph {
    fn from(graph: &Graph) -> Self {
        let mut attributes = Vec::new();
        for (node, keys) in &graph.attributes {
            for (key, values) in keys {
                for value in values {
                    attributes.push((node.0, key.clone(), value.clone()));
                }
            }
        }

        Self {
            nodes: graph.nodes.values().cloned().collect(),
            edges: graph
                .edges()
                .map(|(from, to, p)| (from, to, p.to_string()))
                .collect(),
            next_node_id: graph.next_node_id,
            attributes,
        }
    }
}

impl TryFrom<SerializableGraph> for Graph {
    type Error = GraphError;

    /// Rebuild a graph, rejecting ids or terms that appear twice, literal
    /// nodes, and edges or attributes that point at missing nodes.
    fn try_from(sg: SerializableGraph) -> Result<Self, Self::Error> {
        let mut graph = Graph::new();
        let mut next_node_id = sg.next_node_id;

        for node in sg.nodes {
            if let Term::Literal(literal) = &node.term {
                return Err(GraphError::LiteralNode(literal.lexical.clone()));
            }
            if graph.nodes.contains_key(&node.id) {
                return Err(GraphError::Inconsistent(format!("duplicate node id {}", node.id)));
            }
            if graph.term_index.contains_key(&node.term) {
                return Err(GraphError::Inconsistent(format!("duplicate term {}", node.term)));
            }

            next_node_id = next_node_id.max(node.id.0.saturating_add(1));
            graph.term_index.insert(node.term.clone(), node.id);
            graph.nodes.insert(node.id, node);
        }
        graph.next_node_id = next_node_id;

        for (from, to, predicate) in sg.edges {
            graph.insert_edge(from, to, &predicate)?;
        }

        for (node_id, key, value) in sg.attributes {
            graph.set_attribute(NodeId(node_id), &key, &value)?;
        }

        Ok(graph)
    }
}

// =============================================================================
// TESTS
// =============================================================================
