//! View-state value types.
//!
//! [`ViewState`] describes how the current image is derived from the raw
//! stack. It is a small `Copy` value: the engine never edits it field by
//! field, it replaces the whole value after each successful mutation.

use std::fmt;
use std::str::FromStr;

use crate::region::Mask;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fold applied along the frame axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ReduceOp {
    /// Per-pixel minimum.
    Min,
    /// Per-pixel maximum.
    Max,
    /// Per-pixel arithmetic mean.
    Mean,
    /// Per-pixel population standard deviation.
    Std,
}

impl ReduceOp {
    /// All reductions, in cache slot order.
    pub const ALL: [Self; 4] = [Self::Min, Self::Max, Self::Mean, Self::Std];

    /// Lower-case name of the reduction.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Mean => "mean",
            Self::Std => "std",
        }
    }
}

impl fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReduceOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "mean" => Ok(Self::Mean),
            "std" => Ok(Self::Std),
            other => Err(Error::ConfigError(format!("unknown reduction: {other:?}"))),
        }
    }
}

/// Per-pixel correction applied against a reference frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum NormOp {
    /// `frame - reference`
    Subtract,
    /// `frame / reference`
    Divide,
}

impl NormOp {
    /// Lower-case name of the operation.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Subtract => "subtract",
            Self::Divide => "divide",
        }
    }
}

impl fmt::Display for NormOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NormOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "subtract" | "sub" => Ok(Self::Subtract),
            "divide" | "div" => Ok(Self::Divide),
            other => Err(Error::ConfigError(format!(
                "unknown normalization: {other:?}"
            ))),
        }
    }
}

/// Presentation-only orientation flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Orientation {
    /// The two spatial axes are swapped.
    pub transposed: bool,
    /// First spatial axis (after transpose) is reversed.
    pub flipped_x: bool,
    /// Second spatial axis (after transpose) is reversed.
    pub flipped_y: bool,
}

impl Orientation {
    /// True when no flag is set.
    #[must_use]
    pub fn is_identity(self) -> bool {
        !(self.transposed || self.flipped_x || self.flipped_y)
    }

    #[must_use]
    pub fn toggle_transpose(self) -> Self {
        Self {
            transposed: !self.transposed,
            ..self
        }
    }

    #[must_use]
    pub fn toggle_flip_x(self) -> Self {
        Self {
            flipped_x: !self.flipped_x,
            ..self
        }
    }

    #[must_use]
    pub fn toggle_flip_y(self) -> Self {
        Self {
            flipped_y: !self.flipped_y,
            ..self
        }
    }
}

/// Complete description of the derived view.
///
/// The default value is the identity: the current image equals the raw stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ViewState {
    /// Reduction selected for display.
    pub reduction: Option<ReduceOp>,
    /// Normalization whose cache is displayed when no reduction is active.
    pub normalization: Option<NormOp>,
    /// Active crop in raw coordinates.
    pub mask: Option<Mask>,
    /// Orientation applied last.
    pub orientation: Orientation,
}

impl ViewState {
    /// Identity view.
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// True when the view equals the raw stack.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn with_reduction(self, reduction: Option<ReduceOp>) -> Self {
        Self { reduction, ..self }
    }

    #[must_use]
    pub fn with_normalization(self, normalization: Option<NormOp>) -> Self {
        Self {
            normalization,
            ..self
        }
    }

    #[must_use]
    pub fn with_mask(self, mask: Option<Mask>) -> Self {
        Self { mask, ..self }
    }

    #[must_use]
    pub fn with_orientation(self, orientation: Orientation) -> Self {
        Self {
            orientation,
            ..self
        }
    }
}
