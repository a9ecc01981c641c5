//! Normalization against a reference frame.
//!
//! References always carry a leading frame axis of length 1 so they
//! broadcast over the frame axis of the stack they correct.

use ndarray::{ArrayD, ArrayViewD, Axis, Slice, Zip};
use stackview_core::{Error, NormOp, ReduceOp, Result};

use crate::exec::Execution;
use crate::reduce::reduce_frames;

/// Reference built from `op` over frames `left..=right` of `stack`, scaled by `beta`.
///
/// # Errors
/// Returns [`Error::InvalidRange`] if the range is reversed or extends past
/// the last frame.
pub fn range_reference(
    stack: &ArrayViewD<'_, f64>,
    left: usize,
    right: usize,
    beta: f64,
    op: ReduceOp,
    mode: Execution,
) -> Result<ArrayD<f64>> {
    let frames = stack.len_of(Axis(0));
    if left > right || right >= frames {
        return Err(Error::InvalidRange {
            left,
            right,
            frames,
        });
    }
    let window = stack.slice_axis(Axis(0), Slice::from(left..right + 1));
    let mut reference = reduce_frames(&window, op, mode);
    if (beta - 1.0).abs() > f64::EPSILON {
        reference.mapv_inplace(|v| v * beta);
    }
    Ok(reference)
}

/// Per-pixel mean of an external `reference` stack, checked against the
/// frame shape of the stack it will correct.
///
/// # Errors
/// Returns [`Error::ReferenceShape`] when the reference frames differ in shape.
pub fn image_reference(
    reference: &ArrayViewD<'_, f64>,
    frame_shape: &[usize],
    mode: Execution,
) -> Result<ArrayD<f64>> {
    let found = reference.shape().get(1..).unwrap_or_default();
    if found != frame_shape {
        return Err(Error::ReferenceShape {
            expected: frame_shape.to_vec(),
            found: found.to_vec(),
        });
    }
    Ok(reduce_frames(reference, ReduceOp::Mean, mode))
}

/// Applies `op` between every frame of `stack` and `reference`.
///
/// Division follows IEEE semantics: zero reference pixels produce `inf`/`NaN`.
///
/// # Errors
/// Returns [`Error::Broadcast`] when `reference` does not broadcast over `stack`.
pub fn apply(
    stack: &ArrayViewD<'_, f64>,
    reference: &ArrayViewD<'_, f64>,
    op: NormOp,
    mode: Execution,
) -> Result<ArrayD<f64>> {
    let broadcast = reference
        .broadcast(stack.raw_dim())
        .ok_or_else(|| Error::Broadcast {
            op,
            reference: reference.shape().to_vec(),
            stack: stack.shape().to_vec(),
        })?;
    let combine = combiner(op);
    let zip = Zip::from(stack).and(&broadcast);
    Ok(match mode {
        Execution::Sequential => zip.map_collect(|&s, &r| combine(s, r)),
        Execution::Parallel => zip.par_map_collect(|&s, &r| combine(s, r)),
    })
}

fn combiner(op: NormOp) -> fn(f64, f64) -> f64 {
    match op {
        NormOp::Subtract => |s, r| s - r,
        NormOp::Divide => |s, r| s / r,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use ndarray::{array, Array3};

    fn stack() -> ArrayD<f64> {
        Array3::from_shape_fn((4, 2, 3), |(f, r, c)| (f * 10 + r * 3 + c + 1) as f64).into_dyn()
    }

    #[test]
    fn test_range_reference_mean_with_beta() {
        let s = stack();
        let reference =
            range_reference(&s.view(), 1, 2, 2.0, ReduceOp::Mean, Execution::Sequential).unwrap();
        assert_eq!(reference.shape(), &[1, 2, 3]);
        // mean of frames 1 and 2 at (0, 0) is (11 + 21) / 2 = 16, times beta
        assert_eq!(reference[[0, 0, 0]], 32.0);
    }

    #[test]
    fn test_range_reference_single_frame() {
        let s = stack();
        let reference =
            range_reference(&s.view(), 3, 3, 1.0, ReduceOp::Max, Execution::Sequential).unwrap();
        assert_eq!(reference.index_axis(Axis(0), 0), s.index_axis(Axis(0), 3));
    }

    #[test]
    fn test_range_reference_rejects_bad_ranges() {
        let s = stack();
        for (left, right) in [(2, 1), (0, 4), (5, 6)] {
            let err = range_reference(&s.view(), left, right, 1.0, ReduceOp::Mean, Execution::Sequential)
                .unwrap_err();
            assert_eq!(
                err,
                Error::InvalidRange {
                    left,
                    right,
                    frames: 4
                }
            );
        }
    }

    #[test]
    fn test_image_reference_shape_check() {
        let background = Array3::<f64>::ones((2, 3, 2)).into_dyn();
        let err = image_reference(&background.view(), &[2, 3], Execution::Sequential).unwrap_err();
        assert!(matches!(err, Error::ReferenceShape { .. }));

        let background = Array3::<f64>::ones((2, 2, 3)).into_dyn();
        let reference = image_reference(&background.view(), &[2, 3], Execution::Sequential).unwrap();
        assert_eq!(reference.shape(), &[1, 2, 3]);
    }

    #[test]
    fn test_apply_subtract_and_divide() {
        let s = array![[[2.0, 4.0]], [[6.0, 8.0]]].into_dyn();
        let r = array![[[2.0, 4.0]]].into_dyn();
        let sub = apply(&s.view(), &r.view(), NormOp::Subtract, Execution::Sequential).unwrap();
        let div = apply(&s.view(), &r.view(), NormOp::Divide, Execution::Parallel).unwrap();
        assert_eq!(sub, array![[[0.0, 0.0]], [[4.0, 4.0]]].into_dyn());
        assert_eq!(div, array![[[1.0, 1.0]], [[3.0, 2.0]]].into_dyn());
    }

    #[test]
    fn test_apply_divide_by_zero_is_ieee() {
        let s = array![[[1.0, 0.0]]].into_dyn();
        let r = array![[[0.0, 0.0]]].into_dyn();
        let div = apply(&s.view(), &r.view(), NormOp::Divide, Execution::Sequential).unwrap();
        assert!(div[[0, 0, 0]].is_infinite());
        assert!(div[[0, 0, 1]].is_nan());
    }

    #[test]
    fn test_apply_rejects_mismatched_reference() {
        let s = stack();
        let r = ArrayD::<f64>::zeros(vec![1, 3, 2]);
        let err = apply(&s.view(), &r.view(), NormOp::Subtract, Execution::Sequential).unwrap_err();
        assert!(matches!(err, Error::Broadcast { .. }));
    }
}
