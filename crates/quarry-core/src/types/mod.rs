//! # Core Type Definitions
//!
//! This module contains the value types shared by every stage of an import:
//! - RDF terms and statements (`Term`, `Literal`, `Triple`)
//! - Graph identifiers (`NodeId`, `Node`)
//! - Error types (see [`error`])
//!
//! ## Determinism Guarantees
//!
//! All types in this module implement `Ord` so they can key `BTreeMap`/`BTreeSet`
//! collections and iterate in a stable order.

mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// GRAPH IDENTIFIERS
// =============================================================================

/// Unique identifier for a node in the graph model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A node in the graph model.
///
/// A node stands for exactly one resource term (IRI or blank node).
/// Literals are stored as node attributes, never as nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// The internal node identifier.
    pub id: NodeId,
    /// The resource this node represents.
    pub term: Term,
}

impl Node {
    /// Create a new node.
    #[must_use]
    pub const fn new(id: NodeId, term: Term) -> Self {
        Self { id, term }
    }

    /// Short human-readable label: the last IRI segment, or the blank node label.
    #[must_use]
    pub fn label(&self) -> &str {
        match &self.term {
            Term::Iri(iri) => iri
                .rsplit(|c: char| c == '#' || c == '/')
                .find(|segment| !segment.is_empty())
                .unwrap_or(iri.as_str()),
            Term::Blank(label) => label.as_str(),
            Term::Literal(literal) => literal.lexical.as_str(),
        }
    }
}

// =============================================================================
// TERMS
// =============================================================================

/// A literal value with optional language tag or datatype.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Literal {
    /// The lexical form, unescaped.
    pub lexical: String,
    /// Language tag without the leading `@`.
    pub language: Option<String>,
    /// Datatype IRI without angle brackets.
    pub datatype: Option<String>,
}

impl Literal {
    /// Plain literal with neither language nor datatype.
    #[must_use]
    pub fn plain(lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            language: None,
            datatype: None,
        }
    }
}

/// An RDF term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Term {
    /// An IRI, stored without angle brackets.
    Iri(String),
    /// A blank node, stored without the `_:` prefix.
    Blank(String),
    /// A literal.
    Literal(Literal),
}

impl Term {
    /// IRI helper.
    #[must_use]
    pub fn iri(iri: impl Into<String>) -> Self {
        Self::Iri(iri.into())
    }

    /// Blank node helper.
    #[must_use]
    pub fn blank(label: impl Into<String>) -> Self {
        Self::Blank(label.into())
    }

    /// Plain literal helper.
    #[must_use]
    pub fn literal(lexical: impl Into<String>) -> Self {
        Self::Literal(Literal::plain(lexical))
    }

    /// True for IRIs and blank nodes, the terms that become graph nodes.
    #[must_use]
    pub fn is_resource(&self) -> bool {
        !matches!(self, Self::Literal(_))
    }

    /// The IRI string, if this term is an IRI.
    #[must_use]
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri(iri) => Some(iri),
            _ => None,
        }
    }
}

/// Escape a lexical form for N-Triples output.
fn write_escaped(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            _ => write!(f, "{c}")?,
        }
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "<{iri}>"),
            Self::Blank(label) => write!(f, "_:{label}"),
            Self::Literal(literal) => {
                f.write_str("\"")?;
                write_escaped(f, &literal.lexical)?;
                f.write_str("\"")?;
                if let Some(language) = &literal.language {
                    write!(f, "@{language}")
                } else if let Some(datatype) = &literal.datatype {
                    write!(f, "^^<{datatype}>")
                } else {
                    Ok(())
                }
            }
        }
    }
}

// =============================================================================
// TRIPLE
// =============================================================================

/// A single statement: `subject predicate object`.
///
/// The subject is an IRI or blank node; the predicate is always an IRI.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    /// Create a new triple.
    #[must_use]
    pub fn new(subject: Term, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {} .", self.subject, self.predicate, self.object)
    }
}

// =============================================================================
// TESTS
// =============================================================================
