//! # Query Module
//!
//! The query engine boundary and a local in-memory engine.
//!
//! - `QueryEngine`: `execute(query) -> result text`
//! - `PatternStore`: a triple store answering conjunctive triple patterns
//!
//! `PatternStore` understands a deliberately small language: an optional
//! `CONSTRUCT WHERE { ... }` wrapper around triple patterns separated by `.`,
//! where any position may be a `?variable`. The result is every instantiated
//! pattern of every solution, deduplicated and rendered as sorted N-Triples.

use crate::ntriples::{Lexer, Token, parse_document};
use crate::primitives::MAX_RESULT_BYTES;
use crate::{ParseError, QueryError, Term, Triple};
use std::collections::{BTreeMap, BTreeSet};

/// The QueryEngine trait produces the raw result an import parses.
pub trait QueryEngine: Send {
    /// Execute `query` and return the serialized result.
    fn execute(&self, query: &str) -> Result<String, QueryError>;
}

// =============================================================================
// PATTERNS
// =============================================================================

/// One position of a triple pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Fixed(Term),
    Var(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pattern {
    subject: Slot,
    predicate: Slot,
    object: Slot,
}

type Bindings = BTreeMap<String, Term>;

impl Slot {
    /// Match `term` against this slot, recording new bindings in `added`.
    fn unify(&self, term: &Term, bindings: &mut Bindings, added: &mut Vec<String>) -> bool {
        match self {
            Slot::Fixed(fixed) => fixed == term,
            Slot::Var(name) => match bindings.get(name) {
                Some(bound) => bound == term,
                None => {
                    bindings.insert(name.clone(), term.clone());
                    added.push(name.clone());
                    true
                }
            },
        }
    }

    fn resolve(&self, bindings: &Bindings) -> Option<Term> {
        match self {
            Slot::Fixed(term) => Some(term.clone()),
            Slot::Var(name) => bindings.get(name).cloned(),
        }
    }
}

impl Pattern {
    fn instantiate(&self, bindings: &Bindings) -> Option<Triple> {
        let subject = self.subject.resolve(bindings)?;
        let Term::Iri(predicate) = self.predicate.resolve(bindings)? else {
            return None;
        };
        let object = self.object.resolve(bindings)?;
        subject
            .is_resource()
            .then(|| Triple::new(subject, predicate, object))
    }
}

/// Strip an optional `CONSTRUCT WHERE { ... }` wrapper.
fn pattern_body(query: &str) -> Result<&str, QueryError> {
    let trimmed = query.trim();
    let Some(head) = trimmed.get(..9) else {
        return Ok(trimmed);
    };
    if !head.eq_ignore_ascii_case("CONSTRUCT") {
        return Ok(trimmed);
    }

    let rest = trimmed[9..].trim_start();
    let rest = match rest.get(..5) {
        Some(kw) if kw.eq_ignore_ascii_case("WHERE") => rest[5..].trim_start(),
        _ => return Err(QueryError::Malformed("expected WHERE after CONSTRUCT".to_string())),
    };

    rest.strip_prefix('{')
        .and_then(|body| body.strip_suffix('}'))
        .ok_or_else(|| QueryError::Malformed("expected '{ ... }' after WHERE".to_string()))
}

fn parse_patterns(query: &str) -> Result<Vec<Pattern>, QueryError> {
    let body = pattern_body(query)?;
    let mut lexer = Lexer::with_vars(body);
    let mut patterns = Vec::new();
    let mut slots = Vec::with_capacity(3);

    loop {
        let token = lexer.next_token().map_err(QueryError::Malformed)?;
        let end = token.is_none();
        match token {
            Some(Token::Term(term)) => slots.push(Slot::Fixed(term)),
            Some(Token::Var(name)) => slots.push(Slot::Var(name)),
            Some(Token::Dot) | None => {
                if !slots.is_empty() {
                    patterns.push(pattern_from_slots(std::mem::take(&mut slots))?);
                }
            }
        }
        if end {
            break;
        }
    }

    if patterns.is_empty() {
        return Err(QueryError::Malformed("no triple patterns".to_string()));
    }
    Ok(patterns)
}

fn pattern_from_slots(slots: Vec<Slot>) -> Result<Pattern, QueryError> {
    let [subject, predicate, object]: [Slot; 3] = slots.try_into().map_err(|slots: Vec<Slot>| {
        QueryError::Malformed(format!("pattern has {} terms, expected 3", slots.len()))
    })?;

    if matches!(&subject, Slot::Fixed(Term::Literal(_))) {
        return Err(QueryError::Malformed("literal in subject position".to_string()));
    }
    if matches!(&predicate, Slot::Fixed(term) if term.as_iri().is_none()) {
        return Err(QueryError::Malformed("predicate must be an IRI".to_string()));
    }

    Ok(Pattern {
        subject,
        predicate,
        object,
    })
}

// =============================================================================
// PATTERN STORE
// =============================================================================

/// In-memory triple store answering pattern queries.
#[derive(Debug, Clone, Default)]
pub struct PatternStore {
    triples: BTreeSet<Triple>,
}

impl PatternStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from an N-Triples document.
    pub fn load(text: &str) -> Result<Self, ParseError> {
        Ok(parse_document(text)?.into_iter().collect())
    }

    /// Add a triple. Returns `false` if it was already present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    /// Number of stored triples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// True if the store holds no triples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Backtracking join: match `patterns` in order, emit `all` per solution.
    fn solve(
        &self,
        patterns: &[Pattern],
        bindings: &mut Bindings,
        out: &mut BTreeSet<Triple>,
        all: &[Pattern],
    ) {
        let Some((first, rest)) = patterns.split_first() else {
            out.extend(all.iter().filter_map(|p| p.instantiate(bindings)));
            return;
        };

        for triple in &self.triples {
            let mut added = Vec::new();
            let predicate = Term::Iri(triple.predicate.clone());

            let matched = first.subject.unify(&triple.subject, bindings, &mut added)
                && first.predicate.unify(&predicate, bindings, &mut added)
                && first.object.unify(&triple.object, bindings, &mut added);

            if matched {
                self.solve(rest, bindings, out, all);
            }

            for name in added {
                bindings.remove(&name);
            }
        }
    }
}

impl FromIterator<Triple> for PatternStore {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        Self {
            triples: iter.into_iter().collect(),
        }
    }
}

impl QueryEngine for PatternStore {
    fn execute(&self, query: &str) -> Result<String, QueryError> {
        let patterns = parse_patterns(query)?;

        let mut out = BTreeSet::new();
        self.solve(&patterns, &mut Bindings::new(), &mut out, &patterns);

        let mut result = String::new();
        for triple in &out {
            result.push_str(&triple.to_string());
            result.push('\n');
            if result.len() > MAX_RESULT_BYTES {
                return Err(QueryError::TooLarge {
                    size: result.len(),
                    max: MAX_RESULT_BYTES,
                });
            }
        }

        Ok(result)
    }
}

// =============================================================================
// TESTS
// =============================================================================
