//! # Graph Builder
//!
//! Turns a serialized triple stream into nodes, edges and attributes of a
//! [`GraphModel`].
//!
//! - Resource objects (IRIs, blank nodes) become nodes joined by an edge
//!   labelled with the predicate
//! - Literal objects become attributes of the subject node
//! - An empty stream is not an error: it yields zero elements
//!
//! ## Follow-your-nose Expansion
//!
//! When a [`Dereferencer`] is attached, the depth level bounds how many rounds
//! of link following happen after the primary stream: each round dereferences
//! the IRI objects discovered by the previous one and parses the returned
//! documents into the same model.
//!
//! Blank node labels are local to the document they appear in: labels from a
//! fetched document are suffixed with the document number so they never
//! collide with labels of the primary stream or of other documents.

use crate::graph::GraphModel;
use crate::ntriples::parse_line;
use crate::primitives::{MAX_DEPTH_LEVEL, MAX_FOLLOW_PER_ROUND};
use crate::{ParseError, QueryError, Term, Triple};
use std::collections::BTreeSet;
use std::io::{BufRead, BufReader, Read};

/// The GraphBuilder trait is the boundary between an import and the parser.
pub trait GraphBuilder: Send {
    /// Parse `stream` into `model`, expanding up to `level` rounds.
    ///
    /// Returns the number of triples applied to the model. Triples applied
    /// before a failure stay in the model.
    fn parse(
        &self,
        stream: &mut dyn Read,
        model: &mut dyn GraphModel,
        level: u32,
    ) -> Result<usize, ParseError>;
}

/// Fetches the document describing a resource.
pub trait Dereferencer: Send {
    /// Returns the N-Triples description of `iri`, or `None` if there is none.
    fn dereference(&self, iri: &str) -> Result<Option<String>, QueryError>;
}

/// Builder for the line-oriented N-Triples syntax.
#[derive(Default)]
pub struct NTriplesBuilder {
    dereferencer: Option<Box<dyn Dereferencer>>,
}

impl NTriplesBuilder {
    /// Builder without link following.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder that follows links through `dereferencer`.
    #[must_use]
    pub fn with_dereferencer(dereferencer: Box<dyn Dereferencer>) -> Self {
        Self {
            dereferencer: Some(dereferencer),
        }
    }

    /// Apply one triple to the model.
    ///
    /// Returns the object IRI when the object is a dereferenceable resource.
    pub fn apply(model: &mut dyn GraphModel, triple: &Triple) -> Result<Option<String>, ParseError> {
        let subject = model.insert_node(triple.subject.clone())?;

        match &triple.object {
            Term::Literal(literal) => {
                model.set_attribute(subject, &triple.predicate, &literal.lexical)?;
                Ok(None)
            }
            object => {
                let target = model.insert_node(object.clone())?;
                model.insert_edge(subject, target, &triple.predicate)?;
                Ok(object.as_iri().map(str::to_string))
            }
        }
    }

    /// Rename blank nodes of fetched document `doc` into their own scope.
    fn scope_blank(term: &mut Term, doc: usize) {
        if let Term::Blank(label) = term {
            *label = format!("{label}.d{doc}");
        }
    }

    /// Parse lines from `reader`, collecting dereferenceable object IRIs.
    ///
    /// `scope` is `None` for the primary stream and the document number for
    /// fetched documents.
    fn parse_lines(
        reader: impl BufRead,
        model: &mut dyn GraphModel,
        discovered: &mut BTreeSet<String>,
        scope: Option<usize>,
    ) -> Result<usize, ParseError> {
        let mut count = 0;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let triple = parse_line(&line).map_err(|message| ParseError::Syntax {
                line: index + 1,
                message,
            })?;

            if let Some(mut triple) = triple {
                if let Some(doc) = scope {
                    Self::scope_blank(&mut triple.subject, doc);
                    Self::scope_blank(&mut triple.object, doc);
                }
                if let Some(iri) = Self::apply(model, &triple)? {
                    discovered.insert(iri);
                }
                count += 1;
            }
        }

        Ok(count)
    }

    /// Follow links for up to `level` rounds. Returns the extra triple count.
    fn expand(
        dereferencer: &dyn Dereferencer,
        model: &mut dyn GraphModel,
        mut frontier: BTreeSet<String>,
        level: u32,
    ) -> usize {
        let mut visited = BTreeSet::new();
        let mut count = 0;
        let mut documents = 0;

        for round in 1..=level.min(MAX_DEPTH_LEVEL) {
            frontier.retain(|iri| !visited.contains(iri));
            if frontier.is_empty() {
                break;
            }

            let mut next = BTreeSet::new();
            for iri in frontier.into_iter().take(MAX_FOLLOW_PER_ROUND) {
                visited.insert(iri.clone());

                let document = match dereferencer.dereference(&iri) {
                    Ok(Some(document)) => document,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::debug!("Round {}: cannot dereference <{}>: {}", round, iri, e);
                        continue;
                    }
                };

                documents += 1;
                match Self::parse_lines(document.as_bytes(), model, &mut next, Some(documents)) {
                    Ok(n) => count += n,
                    Err(e) => tracing::debug!("Round {}: skipping <{}>: {}", round, iri, e),
                }
            }

            tracing::debug!("Expansion round {} done, {} triples so far", round, count);
            frontier = next;
        }

        count
    }
}

impl GraphBuilder for NTriplesBuilder {
    fn parse(
        &self,
        stream: &mut dyn Read,
        model: &mut dyn GraphModel,
        level: u32,
    ) -> Result<usize, ParseError> {
        let mut discovered = BTreeSet::new();
        let mut count = Self::parse_lines(BufReader::new(stream), model, &mut discovered, None)?;

        match &self.dereferencer {
            Some(dereferencer) if level > 0 => {
                count += Self::expand(&**dereferencer, model, discovered, level);
            }
            None if level > 0 => {
                tracing::debug!("Depth level {} ignored: no dereferencer attached", level);
            }
            _ => {}
        }

        Ok(count)
    }
}

// =============================================================================
// TESTS
// =============================================================================
