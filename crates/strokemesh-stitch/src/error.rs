//! Stitching error types.

use thiserror::Error;

/// Errors from stitching cut rings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StitchError {
    /// The stitcher was given the wrong number of rings.
    #[error("expected {expected} rings, got {found}")]
    RingCount {
        /// Number of rings the stitcher needs (a minimum for wrapping).
        expected: usize,
        /// Number of rings supplied.
        found: usize,
    },

    /// A ring has fewer than three vertices.
    #[error("ring {0} has fewer than 3 vertices")]
    DegenerateRing(usize),

    /// The skin could not be closed around some rings.
    #[error("{open_edges} edges left open around rings {failed_loops:?}")]
    Unclosed {
        /// Indices of the rings next to the failure.
        failed_loops: Vec<usize>,
        /// Number of half-edges still without a partner.
        open_edges: usize,
    },
}

impl StitchError {
    /// Ring indices implicated in the failure.
    pub fn failed_edge_loops(&self) -> &[usize] {
        match self {
            StitchError::RingCount { .. } => &[],
            StitchError::DegenerateRing(ring) => std::slice::from_ref(ring),
            StitchError::Unclosed { failed_loops, .. } => failed_loops,
        }
    }
}

/// Result type for stitching operations.
pub type Result<T> = std::result::Result<T, StitchError>;
