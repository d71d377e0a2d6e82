//! Error types for the stroke mesh builder.

use thiserror::Error;

/// Errors reported for misuse of the builder API.
///
/// Geometric failures during `build()` are not errors: they degrade
/// the mesh and make `build()` return `false`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuilderError {
    /// A node index does not refer to an added node.
    #[error("node {index} out of range ({count} nodes)")]
    NodeOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of nodes in the graph.
        count: usize,
    },

    /// An edge would connect a node to itself.
    #[error("edge from node {0} to itself")]
    SelfLoop(usize),

    /// Invalid builder configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for builder operations.
pub type Result<T> = std::result::Result<T, BuilderError>;
