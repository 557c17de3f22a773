//! # Result Sinks
//!
//! Persistence of the raw query result.
//!
//! The import task decides *whether* to save (a destination is configured and
//! a result exists); a sink only knows *how* to write to a named destination.

use crate::PersistenceError;
use std::fs::File;
use std::io::Write;

/// Writes a raw result to a named destination.
pub trait ResultSink: Send {
    /// Write the full `raw` text to `destination`, replacing previous content.
    fn save(&self, destination: &str, raw: &str) -> Result<(), PersistenceError>;
}

/// Sink writing to a file path.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSink;

impl ResultSink for FileSink {
    fn save(&self, destination: &str, raw: &str) -> Result<(), PersistenceError> {
        let io_error = |source| PersistenceError::Io {
            destination: destination.to_string(),
            source,
        };

        let mut file = File::create(destination).map_err(io_error)?;
        file.write_all(raw.as_bytes()).map_err(io_error)?;
        file.flush().map_err(io_error)
    }
}
