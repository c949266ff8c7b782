//! Error type shared by the whole crate.

use thiserror::Error;

use crate::gene::NodeId;

/// Errors surfaced by genome evaluation, explicit structural edits,
/// reproduction and persistence.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NeatError {
    /// `feed_forward` was called with a sensor vector of the wrong length.
    #[error("input length mismatch: expected {expected}, got {actual}")]
    InputLengthMismatch {
        /// Number of input nodes in the genome.
        expected: usize,
        /// Length of the supplied vector.
        actual: usize,
    },

    /// The requested output array does not match the genome's output count.
    #[error("output length mismatch: expected {expected}, got {actual}")]
    OutputLengthMismatch {
        /// Number of output nodes in the genome.
        expected: usize,
        /// Length of the requested array.
        actual: usize,
    },

    /// The genome changed structurally since its network was last compiled.
    #[error("network is stale; call compile_network() after structural changes")]
    NetworkNotCompiled,

    /// A node id that does not exist in the genome.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// Genes may never join two nodes of the same layer.
    #[error("nodes {from} and {to} share a layer")]
    SameLayer {
        /// Source node.
        from: NodeId,
        /// Target node.
        to: NodeId,
    },

    /// The pair is already wired in one direction or the other.
    #[error("nodes {from} and {to} are already connected")]
    AlreadyConnected {
        /// Source node.
        from: NodeId,
        /// Target node.
        to: NodeId,
    },

    /// `give_me_baby` on a species without members.
    #[error("cannot breed from an empty species")]
    EmptySpecies,

    /// A loaded genome failed validation.
    #[error("malformed genome: {0}")]
    MalformedGenome(String),

    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, NeatError>;
