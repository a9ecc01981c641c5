//! Rectangular regions and spatial masks.

use std::ops::Range;

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rectangle in displayed-image coordinates, as handed over by an ROI widget.
///
/// `row`/`height` run along the first spatial axis, `col`/`width` along the
/// second. Values may be fractional or partly outside of the image.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Region {
    pub row: f64,
    pub col: f64,
    pub height: f64,
    pub width: f64,
}

impl Region {
    /// Creates a region from a position and a size.
    #[must_use]
    pub fn new(pos: (f64, f64), size: (f64, f64)) -> Self {
        Self {
            row: pos.0,
            col: pos.1,
            height: size.0,
            width: size.1,
        }
    }

    /// Region covering whole pixels `[row, row + height) x [col, col + width)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn pixels(row: usize, col: usize, height: usize, width: usize) -> Self {
        Self::new((row as f64, col as f64), (height as f64, width as f64))
    }

    /// Clamps the region to an image of `rows x cols` pixels.
    ///
    /// Coordinates are truncated toward zero. Returns `None` when nothing of
    /// the region is left.
    #[must_use]
    pub fn clamp(&self, rows: usize, cols: usize) -> Option<Mask> {
        let row_start = clamp_index(self.row, rows);
        let row_stop = clamp_index(self.row + self.height, rows);
        let col_start = clamp_index(self.col, cols);
        let col_stop = clamp_index(self.col + self.width, cols);
        if row_start >= row_stop || col_start >= col_stop {
            return None;
        }
        Some(Mask {
            row_start,
            row_stop,
            col_start,
            col_stop,
        })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_index(value: f64, extent: usize) -> usize {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    let index = value.trunc();
    if index >= extent as f64 {
        extent
    } else {
        index as usize
    }
}

/// Crop in raw pixel coordinates. Half-open on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Mask {
    pub row_start: usize,
    pub row_stop: usize,
    pub col_start: usize,
    pub col_stop: usize,
}

impl Mask {
    #[must_use]
    pub fn rows(&self) -> Range<usize> {
        self.row_start..self.row_stop
    }

    #[must_use]
    pub fn cols(&self) -> Range<usize> {
        self.col_start..self.col_stop
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.row_stop - self.row_start
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.col_stop - self.col_start
    }

    /// Shifts a mask expressed relative to `origin` into `origin`'s frame.
    #[must_use]
    pub fn offset_by(self, origin: &Mask) -> Self {
        Self {
            row_start: self.row_start + origin.row_start,
            row_stop: self.row_stop + origin.row_start,
            col_start: self.col_start + origin.col_start,
            col_stop: self.col_stop + origin.col_start,
        }
    }

    /// Resolves `region`, given in displayed coordinates of an image of
    /// `displayed` = `(rows, cols)` pixels, into raw coordinates on top of the
    /// `current` mask.
    ///
    /// # Errors
    /// Returns [`Error::EmptyRegion`] when the clamped region has no pixels.
    pub fn compose(current: Option<&Mask>, region: &Region, displayed: (usize, usize)) -> Result<Self> {
        let local = region
            .clamp(displayed.0, displayed.1)
            .ok_or(Error::EmptyRegion)?;
        Ok(match current {
            Some(origin) => local.offset_by(origin),
            None => local,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_truncates_and_bounds() {
        let mask = Region::new((-3.7, 2.9), (20.0, 500.0)).clamp(10, 100).unwrap();
        assert_eq!(mask.rows(), 0..10);
        assert_eq!(mask.cols(), 2..100);
    }

    #[test]
    fn test_clamp_outside_is_none() {
        assert!(Region::new((120.0, 0.0), (5.0, 5.0)).clamp(100, 100).is_none());
        assert!(Region::new((0.0, 0.0), (0.5, 5.0)).clamp(100, 100).is_none());
        assert!(Region::new((f64::NAN, 0.0), (5.0, 5.0)).clamp(100, 100).is_none());
    }

    #[test]
    fn test_compose_offsets_by_existing_origin() {
        let first = Mask::compose(None, &Region::pixels(10, 10, 50, 50), (100, 100)).unwrap();
        assert_eq!((first.rows(), first.cols()), (10..60, 10..60));

        let second = Mask::compose(
            Some(&first),
            &Region::pixels(5, 5, 20, 20),
            (first.height(), first.width()),
        )
        .unwrap();
        assert_eq!(second.rows(), 15..35);
        assert_eq!(second.cols(), 15..35);
    }

    #[test]
    fn test_compose_clamps_to_displayed_extent() {
        let first = Mask::compose(None, &Region::pixels(10, 20, 30, 40), (100, 100)).unwrap();
        let second = Mask::compose(
            Some(&first),
            &Region::pixels(25, 35, 100, 100),
            (first.height(), first.width()),
        )
        .unwrap();
        // clamped to the 30 x 40 displayed crop, then shifted by (10, 20)
        assert_eq!(second.rows(), 35..40);
        assert_eq!(second.cols(), 55..60);
    }

    #[test]
    fn test_compose_empty_region() {
        let err = Mask::compose(None, &Region::pixels(200, 0, 5, 5), (100, 100)).unwrap_err();
        assert_eq!(err, Error::EmptyRegion);
    }
}
