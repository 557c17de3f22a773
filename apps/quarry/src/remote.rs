//! # Remote Sources
//!
//! HTTP implementations of the core's query and dereferencing traits, built
//! on the blocking `reqwest` client. Both must be created, used and dropped on
//! a blocking worker thread, never inside the async runtime.
//!
//! - `HttpEndpoint`: SPARQL protocol query via GET `?query=`
//! - `HttpDereferencer`: fetches `http(s)` resources for link following

use quarry_core::primitives::MAX_RESULT_BYTES;
use quarry_core::{Dereferencer, QuarryError, QueryEngine, QueryError};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use std::io::Read;
use std::time::Duration;

/// Media types asked for, best first.
const RDF_ACCEPT: &str = "application/n-triples, text/plain;q=0.5";

fn build_client(timeout: Duration) -> Result<Client, QuarryError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("quarry/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| QuarryError::Config(format!("Cannot build HTTP client: {}", e)))
}

/// Longest error body kept in a [`QueryError`].
const MAX_ERROR_BODY_BYTES: usize = 4 * 1024;

/// Read at most `limit` bytes from `reader`.
///
/// Returns the text and whether more bytes were left unread.
fn read_capped(reader: impl Read, limit: usize) -> Result<(String, bool), QueryError> {
    let mut bytes = Vec::new();
    reader
        .take(u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|e| QueryError::Transport(format!("Cannot read response body: {e}")))?;

    let overflow = bytes.len() > limit;
    bytes.truncate(limit);
    Ok((String::from_utf8_lossy(&bytes).into_owned(), overflow))
}

/// Read a successful response body, enforcing `MAX_RESULT_BYTES`.
fn read_body(response: Response) -> Result<String, QueryError> {
    if let Some(length) = response.content_length() {
        let size = usize::try_from(length).unwrap_or(usize::MAX);
        if size > MAX_RESULT_BYTES {
            return Err(QueryError::TooLarge {
                size,
                max: MAX_RESULT_BYTES,
            });
        }
    }

    // Chunked bodies carry no length: stop reading one byte past the limit.
    let (body, overflow) = read_capped(response, MAX_RESULT_BYTES)?;
    if overflow {
        return Err(QueryError::TooLarge {
            size: MAX_RESULT_BYTES.saturating_add(1),
            max: MAX_RESULT_BYTES,
        });
    }
    Ok(body)
}

/// The start of an error body, for diagnostics.
fn error_body(response: Response) -> String {
    read_capped(response, MAX_ERROR_BODY_BYTES)
        .map(|(body, _)| body)
        .unwrap_or_default()
}

fn status_error(status: StatusCode, response: Response) -> QueryError {
    QueryError::Status {
        status: status.as_u16(),
        body: error_body(response),
    }
}

// =============================================================================
// SPARQL ENDPOINT
// =============================================================================

/// A SPARQL protocol endpoint answering CONSTRUCT queries in N-Triples.
pub struct HttpEndpoint {
    client: Client,
    url: String,
}

impl HttpEndpoint {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, QuarryError> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.into(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl QueryEngine for HttpEndpoint {
    fn execute(&self, query: &str) -> Result<String, QueryError> {
        tracing::debug!("GET {} ({} byte query)", self.url, query.len());

        let response = self
            .client
            .get(&self.url)
            .query(&[("query", query)])
            .header(ACCEPT, RDF_ACCEPT)
            .send()
            .map_err(|e| QueryError::Transport(format!("{}: {e}", self.url)))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            return Err(QueryError::Malformed(error_body(response)));
        }
        if !status.is_success() {
            return Err(status_error(status, response));
        }

        read_body(response)
    }
}

// =============================================================================
// DEREFERENCER
// =============================================================================

/// Fetches the description of an `http(s)` resource.
pub struct HttpDereferencer {
    client: Client,
}

impl HttpDereferencer {
    pub fn new(timeout: Duration) -> Result<Self, QuarryError> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }
}

impl Dereferencer for HttpDereferencer {
    fn dereference(&self, iri: &str) -> Result<Option<String>, QueryError> {
        if !(iri.starts_with("http://") || iri.starts_with("https://")) {
            return Ok(None);
        }

        // The fragment never reaches the server.
        let url = iri.split('#').next().unwrap_or(iri);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, RDF_ACCEPT)
            .send()
            .map_err(|e| QueryError::Transport(format!("{url}: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(status_error(status, response));
        }

        read_body(response).map(Some)
    }
}
