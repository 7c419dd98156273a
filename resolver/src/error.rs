use thiserror::Error;

/// Everything that can go wrong while building or transforming the graph.
///
/// Invariant violations and malformed inputs are fatal: the graph must be
/// discarded. A cancelled transform leaves the graph in the consistent state
/// reached by the last completed step.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invariant violated: {0}")]
    Invariant(String),
    #[error("malformed edge record {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },
    #[error("malformed read path {index}: {reason}")]
    MalformedPath { index: usize, reason: String },
    #[error("transform made no progress at k={k}")]
    Stuck { k: usize },
    #[error("transform cancelled at k={k}")]
    Cancelled { k: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
