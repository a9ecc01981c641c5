//! Summary statistics and display levels of an image volume.

use ndarray::ArrayViewD;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Summary statistics over every element of a volume.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameStats {
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
}

impl FrameStats {
    /// Computes statistics of `volume`, or `None` if it has no elements.
    ///
    /// `NaN` elements are skipped.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn of(volume: &ArrayViewD<'_, f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for &v in volume.iter().filter(|v| !v.is_nan()) {
            count += 1;
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        if count == 0 {
            return None;
        }
        let n = count as f64;
        let mean = sum / n;
        let var = volume
            .iter()
            .filter(|v| !v.is_nan())
            .fold(0.0, |acc, &v| acc + (v - mean) * (v - mean))
            / n;
        Some(Self {
            min,
            max,
            mean,
            std: var.sqrt(),
        })
    }
}

/// Display levels for a lookup table.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Levels {
    /// Value mapped to the bottom of the lookup table.
    pub min: f64,
    /// Value mapped to the top of the lookup table.
    pub max: f64,
    /// Data straddles zero; levels are symmetric and a diverging colormap
    /// should be used.
    pub bipolar: bool,
}

impl Levels {
    /// Levels fitted to `stats`.
    ///
    /// When the data contains both negative and positive values (e.g. after
    /// background subtraction) the range is made symmetric around zero.
    #[must_use]
    pub fn auto(stats: &FrameStats) -> Self {
        if stats.min < 0.0 && 0.0 < stats.max {
            let bound = stats.min.abs().max(stats.max);
            Self {
                min: -bound,
                max: bound,
                bipolar: true,
            }
        } else {
            Self {
                min: stats.min,
                max: stats.max,
                bipolar: false,
            }
        }
    }
}
