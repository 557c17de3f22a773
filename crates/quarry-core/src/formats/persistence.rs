//! # Snapshot Format
//!
//! Binary serialization for imported graphs.
//!
//! Format: Header (5 bytes) + postcard-serialized [`SerializableGraph`].
//! - 4 bytes: Magic ("QRRY")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is decoded, so corrupted
//! or oversized input fails without allocating for it.
//!
//! A JSON rendering of the same `SerializableGraph` is provided for tools
//! that cannot read postcard.

use crate::graph::{Graph, SerializableGraph};
use crate::{QuarryError, primitives};

/// Maximum accepted snapshot size (500 MB).
pub const MAX_SNAPSHOT_SIZE: usize = 500 * 1024 * 1024;

const HEADER_SIZE: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The snapshot header precedes all graph data.
#[derive(Debug, Clone, Copy)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Create a new header with current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Validate the header.
    pub fn validate(&self) -> Result<(), QuarryError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(QuarryError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(QuarryError::SerializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, QuarryError> {
        let Some(header) = bytes.get(..HEADER_SIZE) else {
            return Err(QuarryError::SerializationError(
                "Header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[0..4]);
        Ok(Self {
            magic,
            version: header[4],
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// BINARY SNAPSHOTS
// =============================================================================

/// Serialize a graph to bytes (header + payload).
pub fn graph_to_bytes(graph: &Graph) -> Result<Vec<u8>, QuarryError> {
    let payload = postcard::to_stdvec(&SerializableGraph::from(graph))
        .map_err(|e| QuarryError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_SIZE + payload.len());
    result.extend_from_slice(&PersistenceHeader::new().to_bytes());
    result.extend_from_slice(&payload);

    Ok(result)
}

/// Deserialize a graph from bytes.
pub fn graph_from_bytes(bytes: &[u8]) -> Result<Graph, QuarryError> {
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(QuarryError::SerializationError(format!(
            "Snapshot size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    let header = PersistenceHeader::from_bytes(bytes)?;
    header.validate()?;

    let serializable: SerializableGraph =
        postcard::from_bytes(&bytes[HEADER_SIZE..]).map_err(|e| {
            QuarryError::SerializationError(format!("Failed to deserialize graph data: {}", e))
        })?;

    restore(serializable)
}

fn restore(serializable: SerializableGraph) -> Result<Graph, QuarryError> {
    Graph::try_from(serializable)
        .map_err(|e| QuarryError::SerializationError(format!("Corrupt graph data: {}", e)))
}

// =============================================================================
// JSON
// =============================================================================

/// Render a graph as pretty-printed JSON.
pub fn graph_to_json(graph: &Graph) -> Result<String, QuarryError> {
    serde_json::to_string_pretty(&SerializableGraph::from(graph))
        .map_err(|e| QuarryError::SerializationError(e.to_string()))
}

/// Read a graph back from its JSON rendering.
pub fn graph_from_json(text: &str) -> Result<Graph, QuarryError> {
    if text.len() > MAX_SNAPSHOT_SIZE {
        return Err(QuarryError::SerializationError(format!(
            "Snapshot size {} bytes exceeds maximum allowed {} bytes",
            text.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    let serializable: SerializableGraph = serde_json::from_str(text)
        .map_err(|e| QuarryError::SerializationError(format!("Invalid JSON snapshot: {}", e)))?;
    restore(serializable)
}

// =============================================================================
// TESTS
// =============================================================================
