use crate::operand::Operand;
use crate::shape::Shape;

/// All errors a tessel kernel can report.
///
/// Every variant is a precondition violation in caller-supplied shape or
/// stride metadata (or a failed scratch allocation). Kernels never abort the
/// process; the caller decides whether to propagate, retry with corrected
/// shapes, or give up.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two aligned dimension sizes that are neither equal nor 1.
    #[error("invalid broadcast from shape {src} to {dst}: dim size {from} vs {to}")]
    InvalidBroadcast {
        from: usize,
        to: usize,
        src: Shape,
        dst: Shape,
    },

    /// A broadcast-resolved source offset landed past the operand's buffer.
    #[error("{operand} index out of bounds: {index} >= {size}")]
    IndexOutOfBounds {
        operand: Operand,
        index: usize,
        size: usize,
    },

    /// Matrix multiplication dimension mismatch.
    #[error("matmul shape mismatch: [{m}x{k1}] @ [{k2}x{n}], inner dims must match")]
    MatmulShapeMismatch {
        m: usize,
        k1: usize,
        k2: usize,
        n: usize,
    },

    /// A scratch buffer could not be allocated.
    #[error("failed to allocate scratch buffer of {elements} elements")]
    AllocationFailure { elements: usize },

    /// Output or gradient array does not have the shape the kernel requires.
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },

    /// Operation requires a specific rank.
    #[error("rank mismatch: expected rank {expected}, got {got}")]
    RankMismatch { expected: usize, got: usize },

    /// Axis index out of range for the array's rank.
    #[error("dimension out of range: dim {dim} for array with {rank} dimensions")]
    DimOutOfRange { dim: usize, rank: usize },

    /// Transpose axes that are not a permutation of `0..ndim`.
    #[error("invalid permutation {axes:?}")]
    InvalidPermutation { axes: Vec<usize> },

    /// Buffer length does not match the shape's element count.
    #[error("element count mismatch: shape {shape} requires {expected} elements, got {got}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    /// Strides that would address memory outside the buffer.
    #[error("strides {strides:?} for shape {shape} address past buffer of length {len}")]
    InvalidStrides {
        shape: Shape,
        strides: Vec<usize>,
        len: usize,
    },

    /// Operand selector that is neither 0 (left) nor 1 (right).
    #[error("invalid operand index {0}, expected 0 or 1")]
    InvalidOperand(usize),

    /// Generic message for cases not covered above.
    #[error("{0}")]
    Msg(String),
}

impl Error {
    /// Create an error from any string message.
    pub fn msg(s: impl Into<String>) -> Self {
        Error::Msg(s.into())
    }
}

/// Convenience Result type used throughout tessel.
pub type Result<T> = std::result::Result<T, Error>;

/// Early return with a formatted error message.
/// Usage: `bail!("unsupported layout: {}", detail)`
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::Msg(format!($($arg)*)))
    };
}
