//! Point, line and region readouts of an image volume.
//!
//! All functions take the volume in `frame x row x col [x channel]` layout,
//! i.e. exactly what the engine's accessor returns.

use std::fmt;
use std::ops::Range;

use ndarray::{Array1, Array2, ArrayViewD, Axis, Ix2, Slice};

/// Value of one pixel.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelValue {
    /// Single intensity.
    Gray(f64),
    /// One value per channel.
    Color(Vec<f64>),
}

impl fmt::Display for PixelValue {
    #[allow(clippy::cast_possible_truncation)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gray(v) if v.is_finite() => write!(f, "{:4}", v.trunc() as i64),
            Self::Color(c) if c.iter().all(|v| v.is_finite()) => {
                f.write_str("(")?;
                for (i, v) in c.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:3}", v.trunc() as i64)?;
                }
                f.write_str(")")
            }
            _ => f.write_str("Invalid value"),
        }
    }
}

/// Reads the pixel at `(frame, row, col)`, or `None` when out of bounds.
#[must_use]
pub fn pixel(image: &ArrayViewD<'_, f64>, frame: usize, row: usize, col: usize) -> Option<PixelValue> {
    if !contains(image, frame, row, col) {
        return None;
    }
    let px = image
        .view()
        .index_axis_move(Axis(0), frame)
        .index_axis_move(Axis(0), row)
        .index_axis_move(Axis(0), col);
    if px.ndim() == 0 {
        px.iter().next().copied().map(PixelValue::Gray)
    } else {
        Some(PixelValue::Color(px.iter().copied().collect()))
    }
}

fn contains(image: &ArrayViewD<'_, f64>, frame: usize, row: usize, col: usize) -> bool {
    let shape = image.shape();
    shape.len() >= 3 && frame < shape[0] && row < shape[1] && col < shape[2]
}

/// Intensity profiles through one pixel.
///
/// Both profiles are `len x channels`; grayscale volumes have one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct LineProfiles {
    /// Values along the row through the pixel (varying column).
    pub along_row: Array2<f64>,
    /// Values along the column through the pixel (varying row).
    pub along_col: Array2<f64>,
}

/// Row and column profiles through `(frame, row, col)`.
#[must_use]
pub fn line_profiles(
    image: &ArrayViewD<'_, f64>,
    frame: usize,
    row: usize,
    col: usize,
) -> Option<LineProfiles> {
    if !contains(image, frame, row, col) {
        return None;
    }
    let plane = image.view().index_axis_move(Axis(0), frame);
    let along_row = as_channels(plane.clone().index_axis_move(Axis(0), row))?;
    let along_col = as_channels(plane.index_axis_move(Axis(1), col))?;
    Some(LineProfiles {
        along_row,
        along_col,
    })
}

fn as_channels(line: ArrayViewD<'_, f64>) -> Option<Array2<f64>> {
    let line = if line.ndim() == 1 {
        line.insert_axis(Axis(1))
    } else {
        line
    };
    line.into_dimensionality::<Ix2>().ok().map(|v| v.to_owned())
}

/// Mean over `rows x cols` (and channels) for every frame.
///
/// Ranges are clamped to the volume; frames of an empty selection yield `NaN`.
#[must_use]
pub fn region_means(image: &ArrayViewD<'_, f64>, rows: Range<usize>, cols: Range<usize>) -> Array1<f64> {
    if image.ndim() < 3 {
        return Array1::zeros(0);
    }
    let mut view = image.view();
    view.slice_axis_inplace(Axis(1), Slice::from(clamp_range(rows, image.len_of(Axis(1)))));
    view.slice_axis_inplace(Axis(2), Slice::from(clamp_range(cols, image.len_of(Axis(2)))));
    view.axis_iter(Axis(0))
        .map(|frame| frame.mean().unwrap_or(f64::NAN))
        .collect()
}

fn clamp_range(range: Range<usize>, len: usize) -> Range<usize> {
    let start = range.start.min(len);
    start..range.end.clamp(start, len)
}

/// Moving-average smoothing of `y` over `window` samples.
///
/// Returns the abscissa trimmed so that each smoothed value sits at the
/// centre of its window, and the smoothed values. Both are empty when the
/// window is zero or longer than the data.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn smooth(x: &[f64], y: &[f64], window: usize) -> (Vec<f64>, Vec<f64>) {
    let n = x.len().min(y.len());
    if window == 0 || window > n {
        return (Vec::new(), Vec::new());
    }
    let w = window as f64;
    let smoothed: Vec<f64> = y[..n].windows(window).map(|win| win.iter().sum::<f64>() / w).collect();
    let start = window / 2;
    let trimmed = x[start..start + smoothed.len()].to_vec();
    (trimmed, smoothed)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use ndarray::{array, Array3, Array4};

    fn gray() -> ndarray::ArrayD<f64> {
        Array3::from_shape_fn((2, 3, 4), |(f, r, c)| (f * 100 + r * 10 + c) as f64).into_dyn()
    }

    #[test]
    fn test_pixel_gray_and_bounds() {
        let g = gray();
        assert_eq!(pixel(&g.view(), 1, 2, 3), Some(PixelValue::Gray(123.0)));
        assert_eq!(pixel(&g.view(), 2, 0, 0), None);
        assert_eq!(pixel(&g.view(), 0, 0, 4), None);
    }

    #[test]
    fn test_pixel_color() {
        let c = Array4::from_shape_fn((1, 2, 2, 3), |(_, r, col, k)| (r * 100 + col * 10 + k) as f64)
            .into_dyn();
        assert_eq!(
            pixel(&c.view(), 0, 1, 1),
            Some(PixelValue::Color(vec![110.0, 111.0, 112.0]))
        );
    }

    #[test]
    fn test_pixel_display() {
        assert_eq!(PixelValue::Gray(7.9).to_string(), "   7");
        assert_eq!(
            PixelValue::Color(vec![1.0, 22.0, 255.0]).to_string(),
            "(  1,  22, 255)"
        );
        assert_eq!(PixelValue::Gray(f64::NAN).to_string(), "Invalid value");
    }

    #[test]
    fn test_line_profiles() {
        let g = gray();
        let lines = line_profiles(&g.view(), 1, 2, 1).unwrap();
        assert_eq!(lines.along_row.shape(), &[4, 1]);
        assert_eq!(lines.along_col.shape(), &[3, 1]);
        assert_eq!(lines.along_row.column(0).to_vec(), vec![120.0, 121.0, 122.0, 123.0]);
        assert_eq!(lines.along_col.column(0).to_vec(), vec![101.0, 111.0, 121.0]);
        assert!(line_profiles(&g.view(), 0, 3, 0).is_none());
    }

    #[test]
    fn test_line_profiles_color() {
        let c = Array4::<f64>::ones((1, 2, 5, 3)).into_dyn();
        let lines = line_profiles(&c.view(), 0, 1, 4).unwrap();
        assert_eq!(lines.along_row.shape(), &[5, 3]);
        assert_eq!(lines.along_col.shape(), &[2, 3]);
    }

    #[test]
    fn test_region_means() {
        let g = gray();
        let means = region_means(&g.view(), 0..2, 1..3);
        // frame 0: (1 + 2 + 11 + 12) / 4 = 6.5
        assert_eq!(means, array![6.5, 106.5]);

        let clamped = region_means(&g.view(), 2..10, 3..10);
        assert_eq!(clamped, array![23.0, 123.0]);

        let empty = region_means(&g.view(), 5..10, 0..1);
        assert!(empty.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_smooth_odd_and_even_windows() {
        let x: Vec<f64> = (0..6).map(f64::from).collect();
        let y = vec![0.0, 3.0, 6.0, 3.0, 0.0, 3.0];

        let (tx, sy) = smooth(&x, &y, 3);
        assert_eq!(sy, vec![3.0, 4.0, 3.0, 2.0]);
        assert_eq!(tx, vec![1.0, 2.0, 3.0, 4.0]);

        let (tx, sy) = smooth(&x, &y, 2);
        assert_eq!(sy.len(), 5);
        assert_eq!(tx, vec![1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(smooth(&x, &y, 7), (Vec::new(), Vec::new()));
    }
}
