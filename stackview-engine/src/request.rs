//! Normalization requests.

use stackview_core::{NormOp, ReduceOp};

use crate::stack::ImageStack;

/// Inclusive frame window whose reduction, scaled by `beta`, is the reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRange {
    pub left: usize,
    pub right: usize,
    pub beta: f64,
    pub reduce: ReduceOp,
}

impl FrameRange {
    /// Mean of frames `left..=right`, unscaled.
    #[must_use]
    pub fn new(left: usize, right: usize) -> Self {
        Self {
            left,
            right,
            beta: 1.0,
            reduce: ReduceOp::Mean,
        }
    }

    #[must_use]
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    #[must_use]
    pub fn with_reduce(mut self, reduce: ReduceOp) -> Self {
        self.reduce = reduce;
        self
    }
}

/// Where the normalization reference comes from.
#[derive(Debug, Clone, Copy)]
pub enum Reference<'a> {
    /// A window of the stack being normalized.
    Range(FrameRange),
    /// The per-pixel mean of another stack's current image, e.g. a loaded
    /// background file.
    Image(&'a ImageStack),
}

/// A normalization call.
#[derive(Debug, Clone, Copy)]
pub struct Normalize<'a> {
    pub op: NormOp,
    pub reference: Reference<'a>,
    /// Recompute even when `op` is already active instead of toggling it off.
    pub force: bool,
}

impl<'a> Normalize<'a> {
    #[must_use]
    pub fn new(op: NormOp, reference: Reference<'a>) -> Self {
        Self {
            op,
            reference,
            force: false,
        }
    }

    #[must_use]
    pub fn subtract(reference: Reference<'a>) -> Self {
        Self::new(NormOp::Subtract, reference)
    }

    #[must_use]
    pub fn divide(reference: Reference<'a>) -> Self {
        Self::new(NormOp::Divide, reference)
    }

    #[must_use]
    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}
