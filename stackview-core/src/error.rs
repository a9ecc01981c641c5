//! Error types for stackview-core.

use thiserror::Error;

use crate::view::{NormOp, Orientation};

/// Result type alias for stackview operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons an operation on an image stack is rejected.
///
/// Every rejection leaves the stack exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The stack has no frames.
    #[error("image stack must contain at least one frame")]
    EmptyStack,

    /// The raw volume does not have a supported rank.
    #[error("unsupported stack shape {shape:?}: expected frame x height x width [x channel]")]
    UnsupportedShape { shape: Vec<usize> },

    /// Frame and metadata counts disagree.
    #[error("metadata length {metadata} does not match frame count {frames}")]
    MetadataMismatch { frames: usize, metadata: usize },

    /// Normalization requested while a reduction is displayed.
    #[error("cannot normalize while a reduction is active")]
    ReductionActive,

    /// Reference volume does not match the frame shape of the stack.
    #[error("reference shape {found:?} does not match frame shape {expected:?}")]
    ReferenceShape {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// Frame range outside of the stack or reversed.
    #[error("invalid frame range [{left}, {right}] for {frames} frame(s)")]
    InvalidRange {
        left: usize,
        right: usize,
        frames: usize,
    },

    /// Masking requested while the data is flipped or transposed.
    #[error("masking is not available while data is flipped or transposed ({0:?})")]
    OrientationActive(Orientation),

    /// Mask rectangle lies completely outside the displayed image.
    #[error("mask region is empty after clamping to the displayed image")]
    EmptyRegion,

    /// A normalization kernel failed to broadcast its reference.
    #[error("{op:?} reference of shape {reference:?} cannot broadcast over {stack:?}")]
    Broadcast {
        op: NormOp,
        reference: Vec<usize>,
        stack: Vec<usize>,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
