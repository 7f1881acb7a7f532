//! Error types for layer construction, initialization and execution.

use thiserror::Error;

/// Errors reported by the scratch memory pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemPoolError {
    /// Pool capacity can't satisfy the request.
    #[error("mempool out of memory: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: usize, available: usize },

    /// Freeing an allocation the pool doesn't know about.
    #[error("mempool has no live allocation with id {0}")]
    UnknownAllocation(usize),

    /// Freeing a buffer that was allocated from a different pool.
    #[error("scratch buffer {0} belongs to a different mempool")]
    ForeignBuffer(usize),
}

/// Errors that can occur while building or running a layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
    /// No weight blobs were supplied.
    #[error("inner product layer requires at least one weight blob")]
    MissingWeights,

    /// `bias_term` is set but there is no bias blob.
    #[error("bias_term is set but only {found} weight blob(s) were supplied")]
    MissingBias { found: usize },

    /// Weight blob element count doesn't match its declared shape.
    #[error("weight blob holds {found} elements, shape declares {rows}x{cols}")]
    WeightShape {
        rows: usize,
        cols: usize,
        found: usize,
    },

    /// Bias blob length doesn't match the output channel count.
    #[error("bias blob holds {found} elements, expected {expected}")]
    BiasShape { expected: usize, found: usize },

    /// Bound input length doesn't match the weight matrix columns.
    #[error("input blob holds {found} elements, weights expect {expected}")]
    InputShape { expected: usize, found: usize },

    /// Output blob length doesn't match the bound output size.
    #[error("output blob holds {found} elements, layer produces {expected}")]
    OutputShape { expected: usize, found: usize },

    /// `init` called before an input blob was bound.
    #[error("layer has no bound input; call generate_top_blobs first")]
    Unbound,

    /// `forward` called before `init`.
    #[error("layer is not initialized; call init before forward")]
    NotInitialized,

    /// `fuse` called after the kernel was already selected.
    #[error("fuse must be called before init")]
    FuseAfterInit,

    /// Scratch allocation or release failed during `init`.
    #[error(transparent)]
    MemPool(#[from] MemPoolError),
}

/// Result type for layer operations.
pub type Result<T> = std::result::Result<T, LayerError>;
