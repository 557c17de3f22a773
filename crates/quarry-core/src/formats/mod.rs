//! # Formats
//!
//! Graph snapshot serialization. File I/O stays in the app layer.

mod persistence;

pub use persistence::{
    MAX_SNAPSHOT_SIZE, PersistenceHeader, graph_from_bytes, graph_from_json, graph_to_bytes,
    graph_to_json,
};
