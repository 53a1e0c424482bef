//! Error types for hopmask-core.

use thiserror::Error;

/// Error type for subgraph extraction and dataset caching.
#[derive(Error, Debug)]
pub enum Error {
    /// Node id not present in the graph (or out of range for its node type).
    #[error("Unknown node: {0}")]
    UnknownNode(usize),

    /// Node type label not declared on the graph.
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// Edge type referenced by a mask or edge tag but not declared.
    #[error("Unknown edge type: {0}")]
    UnknownEdgeType(String),

    /// Graph artifact is structurally invalid.
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// Mask width does not match the edge index it is split against.
    #[error("Mask has {actual} edge columns, expected {expected}")]
    MaskShape {
        /// Number of edges the index describes.
        expected: usize,
        /// Number of columns in the mask.
        actual: usize,
    },

    /// Label sequence is not aligned with the target sequence.
    #[error("Got {labels} labels for {targets} target nodes")]
    LabelMismatch {
        /// Number of target nodes.
        targets: usize,
        /// Number of labels.
        labels: usize,
    },

    /// Split index refers to a record past the end of the dataset.
    #[error("Index {index} out of range for dataset of {len} records")]
    IndexOutOfRange {
        /// Offending position.
        index: usize,
        /// Dataset length.
        len: usize,
    },

    /// Cached artifact exists but cannot be decoded.
    #[error("Cache artifact '{key}' is corrupt: {reason}")]
    CacheCorrupt {
        /// Cache key of the artifact.
        key: String,
        /// What failed while decoding.
        reason: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for hopmask operations.
pub type Result<T> = std::result::Result<T, Error>;
