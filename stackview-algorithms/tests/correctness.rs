#![allow(clippy::uninlined_format_args, clippy::cast_precision_loss)]
use approx::assert_relative_eq;
use ndarray::{Array3, ArrayD, Axis};
use stackview_algorithms::{normalize, reduce_frames, Execution, FrameStats, NormOp, ReduceOp};

fn generate_stack() -> ArrayD<f64> {
    // 6 frames of 5x7, with a bright spot moving along the diagonal
    Array3::from_shape_fn((6, 5, 7), |(f, r, c)| {
        let base = (r * 7 + c) as f64 * 0.5;
        if r == f % 5 && c == f {
            base + 100.0
        } else {
            base + f as f64
        }
    })
    .into_dyn()
}

#[test]
fn test_verification_reductions() {
    let stack = generate_stack();
    for op in ReduceOp::ALL {
        let seq = reduce_frames(&stack.view(), op, Execution::Sequential);
        let par = reduce_frames(&stack.view(), op, Execution::Parallel);
        assert_eq!(seq.shape(), &[1, 5, 7], "{} has wrong shape", op);
        assert_eq!(seq, par, "{} differs between modes", op);
    }
}

#[test]
fn test_verification_mean_and_std() {
    let stack = generate_stack();
    let mean = reduce_frames(&stack.view(), ReduceOp::Mean, Execution::Sequential);
    let std = reduce_frames(&stack.view(), ReduceOp::Std, Execution::Sequential);

    // pixel (4, 6) never sees the spot: base 17 plus frame offsets 0..=5
    assert_relative_eq!(mean[[0, 4, 6]], 17.0 + 2.5);
    assert_relative_eq!(std[[0, 4, 6]], (35.0_f64 / 12.0).sqrt());
}

#[test]
fn test_verification_max_finds_spot() {
    let stack = generate_stack();
    let max = reduce_frames(&stack.view(), ReduceOp::Max, Execution::Parallel);
    for f in 0..5 {
        let expected = (f * 7 + f) as f64 * 0.5 + 100.0;
        assert_relative_eq!(max[[0, f, f]], expected);
    }
}

#[test]
fn test_verification_background_subtraction() {
    let stack = generate_stack();
    let reference =
        normalize::range_reference(&stack.view(), 4, 5, 1.0, ReduceOp::Min, Execution::Sequential)
            .unwrap();
    let corrected =
        normalize::apply(&stack.view(), &reference.view(), NormOp::Subtract, Execution::Parallel)
            .unwrap();
    assert_eq!(corrected.shape(), stack.shape());

    // frame 5 is at least the minimum of frames 4 and 5 everywhere
    let last = corrected.index_axis(Axis(0), 5);
    assert!(last.iter().all(|&v| v >= 0.0));

    let stats = FrameStats::of(&corrected.view()).unwrap();
    assert!(stats.min < 0.0);
    assert!(stats.max > 90.0);
}

#[test]
fn test_verification_flat_field_division() {
    let stack = generate_stack().mapv(|v| v + 1.0);
    let flat = ArrayD::from_elem(vec![2, 5, 7], 2.0);
    let reference = normalize::image_reference(&flat.view(), &[5, 7], Execution::Sequential).unwrap();
    let divided =
        normalize::apply(&stack.view(), &reference.view(), NormOp::Divide, Execution::Sequential)
            .unwrap();
    for (d, s) in divided.iter().zip(stack.iter()) {
        assert_relative_eq!(*d * 2.0, *s);
    }
}
