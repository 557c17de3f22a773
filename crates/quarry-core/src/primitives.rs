//! # Primitives
//!
//! Hardcoded runtime constants for the Quarry core.

/// Estimated duration of an import, announced to the progress channel on start.
pub const DEFAULT_ESTIMATED_SECONDS: u64 = 5;

/// Number of progress ticks a complete import emits (one per stage).
pub const STAGE_COUNT: u64 = 4;

/// Highest follow-your-nose depth accepted by the graph builder.
///
/// Larger levels are clamped. Every level is one more round of dereferencing.
pub const MAX_DEPTH_LEVEL: u32 = 8;

/// Maximum number of resources dereferenced in a single expansion round.
pub const MAX_FOLLOW_PER_ROUND: usize = 256;

/// Maximum size of a query result accepted from any engine (64 MB).
pub const MAX_RESULT_BYTES: usize = 64 * 1024 * 1024;

/// Magic bytes for the graph snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"QRRY";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;
