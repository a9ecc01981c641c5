//! Shaping of already-decoded arrays before they enter an image stack.

use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, Slice, Zip};
use stackview_core::LUMA_WEIGHTS;

/// Widens any numeric source array to `f64`.
#[must_use]
pub fn to_f64<A>(raw: &ArrayViewD<'_, A>) -> ArrayD<f64>
where
    A: Copy + Into<f64>,
{
    raw.mapv(Into::into)
}

/// Keeps every `stride`-th frame, starting at frame 0.
///
/// A stride beyond the frame count keeps only the first frame.
#[must_use]
pub fn every_nth_frame(stack: ArrayD<f64>, stride: usize) -> ArrayD<f64> {
    if stride <= 1 {
        return stack;
    }
    let step = isize::try_from(stride).unwrap_or(isize::MAX);
    stack
        .slice_axis(Axis(0), Slice::new(0, None, step))
        .to_owned()
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn scaled_len(len: usize, ratio: f64) -> usize {
    ((len as f64 * ratio) as usize).clamp(1, len.max(1))
}

/// Source span `[start, stop)` covered by output index `i` when `len`
/// samples shrink to `out` samples.
fn source_span(i: usize, len: usize, out: usize) -> std::ops::Range<usize> {
    let start = i * len / out;
    let stop = ((i + 1) * len).div_ceil(out);
    start..stop.max(start + 1)
}

/// Shrinks every frame to `ratio` of its height and width by area averaging.
///
/// Output sizes are truncated and at least one pixel; frame and channel axes
/// are untouched. Ratios of 1.0 or more return the stack unchanged.
#[must_use]
pub fn downscale(stack: &ArrayViewD<'_, f64>, ratio: f64) -> ArrayD<f64> {
    if stack.ndim() < 3 || ratio.is_nan() || ratio >= 1.0 {
        return stack.to_owned();
    }
    let (rows, cols) = (stack.len_of(Axis(1)), stack.len_of(Axis(2)));
    let (out_rows, out_cols) = (scaled_len(rows, ratio), scaled_len(cols, ratio));
    if (out_rows, out_cols) == (rows, cols) {
        return stack.to_owned();
    }
    let mut shape = stack.shape().to_vec();
    shape[1] = out_rows;
    shape[2] = out_cols;
    let colour = shape.len() == 4;
    ArrayD::from_shape_fn(IxDyn(&shape), |idx| {
        let mut window = stack.view();
        window.slice_axis_inplace(Axis(1), Slice::from(source_span(idx[1], rows, out_rows)));
        window.slice_axis_inplace(Axis(2), Slice::from(source_span(idx[2], cols, out_cols)));
        let mut window = window.index_axis_move(Axis(0), idx[0]);
        if colour {
            window = window.index_axis_move(Axis(2), idx[3]);
        }
        window.mean().unwrap_or(f64::NAN)
    })
}

/// Rescales every frame to whole values in `0..=255`, `value / max * 255`
/// truncated, with `max` the largest finite value of that frame.
///
/// Frames without a positive maximum, and non-finite results, become 0.
#[must_use]
pub fn to_8_bit(mut stack: ArrayD<f64>) -> ArrayD<f64> {
    for mut frame in stack.axis_iter_mut(Axis(0)) {
        let max = frame
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        if max > 0.0 {
            frame.mapv_inplace(|v| {
                let scaled = (v / max * 255.0).trunc();
                if scaled.is_finite() {
                    scaled.clamp(0.0, 255.0)
                } else {
                    0.0
                }
            });
        } else {
            frame.fill(0.0);
        }
    }
    stack
}

/// Converts an RGB stack (`frame x row x col x 3`) to luma.
///
/// Returns `None` for stacks that are not three-channel colour.
#[must_use]
pub fn to_grayscale(stack: &ArrayViewD<'_, f64>) -> Option<ArrayD<f64>> {
    if stack.ndim() != 4 || stack.len_of(Axis(3)) != 3 {
        return None;
    }
    Some(Zip::from(stack.lanes(Axis(3))).map_collect(|px| {
        px.iter()
            .zip(LUMA_WEIGHTS)
            .map(|(&v, w)| v * w)
            .sum::<f64>()
    }))
}

/// True for rank-3 stacks, single-channel stacks and colour stacks whose
/// channels are identical everywhere.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn is_grayscale(stack: &ArrayViewD<'_, f64>) -> bool {
    match stack.ndim() {
        3 => true,
        4 if stack.len_of(Axis(3)) <= 1 => true,
        4 => stack
            .lanes(Axis(3))
            .into_iter()
            .all(|px| px.iter().all(|&v| v == px[0])),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array3, Array4};

    #[test]
    fn test_to_f64_from_u16() {
        let raw = Array3::<u16>::from_elem((2, 2, 2), 65_535).into_dyn();
        let wide = to_f64(&raw.view());
        assert!(wide.iter().all(|&v| v == 65_535.0));
    }

    #[test]
    fn test_every_nth_frame() {
        let stack = Array3::from_shape_fn((7, 1, 1), |(f, _, _)| f as f64).into_dyn();
        let kept = every_nth_frame(stack, 3);
        assert_eq!(kept.shape(), &[3, 1, 1]);
        assert_eq!(kept.iter().copied().collect::<Vec<_>>(), vec![0.0, 3.0, 6.0]);
    }

    #[test]
    fn test_every_nth_frame_huge_stride() {
        let stack = Array3::from_shape_fn((5, 2, 2), |(f, _, _)| f as f64).into_dyn();
        let kept = every_nth_frame(stack, usize::MAX);
        assert_eq!(kept.shape(), &[1, 2, 2]);
        assert!(kept.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_downscale_area_average() {
        let stack = Array3::from_shape_fn((2, 4, 6), |(f, r, c)| (f * 100 + r * 6 + c) as f64).into_dyn();
        let small = downscale(&stack.view(), 0.5);
        assert_eq!(small.shape(), &[2, 2, 3]);
        // mean of rows 0..2 and cols 0..2: (0 + 1 + 6 + 7) / 4
        assert_relative_eq!(small[[0, 0, 0]], 3.5);
        assert_relative_eq!(small[[1, 1, 2]], 100.0 + (16.0 + 17.0 + 22.0 + 23.0) / 4.0);
        assert_eq!(downscale(&stack.view(), 1.0), stack);
    }

    #[test]
    fn test_downscale_keeps_channels_and_one_pixel() {
        let stack = Array4::from_shape_fn((1, 3, 3, 3), |(_, r, c, k)| (r + c) as f64 * (k + 1) as f64)
            .into_dyn();
        let tiny = downscale(&stack.view(), 0.1);
        assert_eq!(tiny.shape(), &[1, 1, 1, 3]);
        // mean of r + c over 3x3 is 2
        assert_relative_eq!(tiny[[0, 0, 0, 0]], 2.0);
        assert_relative_eq!(tiny[[0, 0, 0, 2]], 6.0);
    }

    #[test]
    fn test_to_8_bit_per_frame_max() {
        let stack = ndarray::array![[[0.0, 500.0, 1000.0]], [[1.0, 2.0, 4.0]], [[-3.0, 0.0, 0.0]]].into_dyn();
        let eight = to_8_bit(stack);
        assert_eq!(eight.index_axis(Axis(0), 0).iter().copied().collect::<Vec<_>>(), vec![0.0, 127.0, 255.0]);
        assert_eq!(eight.index_axis(Axis(0), 1).iter().copied().collect::<Vec<_>>(), vec![63.0, 127.0, 255.0]);
        assert!(eight.index_axis(Axis(0), 2).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_to_grayscale_weights() {
        let mut stack = Array4::<f64>::zeros((1, 1, 2, 3));
        stack[[0, 0, 0, 0]] = 100.0;
        stack[[0, 0, 1, 1]] = 100.0;
        let gray = to_grayscale(&stack.into_dyn().view()).unwrap();
        assert_eq!(gray.shape(), &[1, 1, 2]);
        assert_relative_eq!(gray[[0, 0, 0]], 29.89);
        assert_relative_eq!(gray[[0, 0, 1]], 58.70);
        assert!(to_grayscale(&Array3::<f64>::zeros((1, 2, 2)).into_dyn().view()).is_none());
    }

    #[test]
    fn test_is_grayscale() {
        assert!(is_grayscale(&Array3::<f64>::zeros((1, 2, 2)).into_dyn().view()));
        let equal = Array4::from_shape_fn((2, 2, 2, 3), |(f, r, c, _)| (f + r + c) as f64).into_dyn();
        assert!(is_grayscale(&equal.view()));
        let mut color = equal.clone();
        color[[1, 1, 1, 2]] = -1.0;
        assert!(!is_grayscale(&color.view()));
    }
}
