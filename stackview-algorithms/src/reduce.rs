//! Reductions along the frame axis.

use ndarray::{ArrayD, ArrayView1, ArrayViewD, Axis, Zip};
use stackview_core::ReduceOp;

use crate::exec::Execution;

/// Folds `stack` along its frame axis.
///
/// The result keeps a leading frame axis of length 1, so callers can keep
/// indexing frame 0 of a reduced stack. `Std` is the population standard
/// deviation.
#[must_use]
pub fn reduce_frames(stack: &ArrayViewD<'_, f64>, op: ReduceOp, mode: Execution) -> ArrayD<f64> {
    let lanes = stack.lanes(Axis(0));
    let reduced = match mode {
        Execution::Sequential => Zip::from(lanes).map_collect(|lane| fold_lane(&lane, op)),
        Execution::Parallel => Zip::from(lanes).par_map_collect(|lane| fold_lane(&lane, op)),
    };
    reduced.insert_axis(Axis(0))
}

#[allow(clippy::cast_precision_loss)]
fn fold_lane(lane: &ArrayView1<'_, f64>, op: ReduceOp) -> f64 {
    let n = lane.len() as f64;
    match op {
        ReduceOp::Min => lane.fold(f64::INFINITY, |acc, &v| acc.min(v)),
        ReduceOp::Max => lane.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v)),
        ReduceOp::Mean => lane.sum() / n,
        ReduceOp::Std => {
            let mean = lane.sum() / n;
            let var = lane.fold(0.0, |acc, &v| acc + (v - mean) * (v - mean)) / n;
            var.sqrt()
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array3, Array4};

    fn stack() -> Array3<f64> {
        array![
            [[1.0, 2.0], [3.0, 4.0]],
            [[5.0, 0.0], [3.0, 8.0]],
            [[3.0, 4.0], [3.0, 0.0]],
        ]
    }

    #[test]
    fn test_min_max() {
        let s = stack().into_dyn();
        let min = reduce_frames(&s.view(), ReduceOp::Min, Execution::Sequential);
        let max = reduce_frames(&s.view(), ReduceOp::Max, Execution::Sequential);
        assert_eq!(min.shape(), &[1, 2, 2]);
        assert_eq!(min, array![[[1.0, 0.0], [3.0, 0.0]]].into_dyn());
        assert_eq!(max, array![[[5.0, 4.0], [3.0, 8.0]]].into_dyn());
    }

    #[test]
    fn test_mean_std() {
        let s = stack().into_dyn();
        let mean = reduce_frames(&s.view(), ReduceOp::Mean, Execution::Sequential);
        let std = reduce_frames(&s.view(), ReduceOp::Std, Execution::Sequential);
        assert_eq!(mean, array![[[3.0, 2.0], [3.0, 4.0]]].into_dyn());
        // population std of (1, 5, 3) = sqrt(8 / 3)
        assert_relative_eq!(std[[0, 0, 0]], (8.0_f64 / 3.0).sqrt());
        assert_eq!(std[[0, 1, 0]], 0.0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let s = Array4::from_shape_fn((6, 5, 4, 3), |(f, r, c, k)| {
            ((f * 31 + r * 7 + c * 3 + k) % 11) as f64
        })
        .into_dyn();
        for op in ReduceOp::ALL {
            let seq = reduce_frames(&s.view(), op, Execution::Sequential);
            let par = reduce_frames(&s.view(), op, Execution::Parallel);
            assert_eq!(seq.shape(), &[1, 5, 4, 3]);
            assert_eq!(seq, par, "{op} differs between execution modes");
        }
    }

    #[test]
    fn test_single_frame_is_identity_for_min_max_mean() {
        let s = array![[[2.5, -1.0]]].into_dyn();
        for op in [ReduceOp::Min, ReduceOp::Max, ReduceOp::Mean] {
            assert_eq!(reduce_frames(&s.view(), op, Execution::Sequential), s);
        }
        let std = reduce_frames(&s.view(), ReduceOp::Std, Execution::Sequential);
        assert!(std.iter().all(|&v| v == 0.0));
    }
}
