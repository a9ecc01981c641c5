//! Projection of a base volume through the view state.

use ndarray::{ArrayViewD, Axis, Slice};
use stackview_core::ViewState;

/// Applies mask, transpose, flip-x and flip-y (in that order) to `base`.
///
/// Every step only rewrites strides and offsets of the view; no element is
/// copied.
#[must_use]
pub fn project<'a>(base: ArrayViewD<'a, f64>, state: &ViewState) -> ArrayViewD<'a, f64> {
    let mut view = base;
    if let Some(mask) = state.mask {
        view.slice_axis_inplace(Axis(1), Slice::from(mask.rows()));
        view.slice_axis_inplace(Axis(2), Slice::from(mask.cols()));
    }
    let orientation = state.orientation;
    if orientation.transposed {
        view.swap_axes(1, 2);
    }
    if orientation.flipped_x {
        view.invert_axis(Axis(1));
    }
    if orientation.flipped_y {
        view.invert_axis(Axis(2));
    }
    view
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use ndarray::{array, Array3};
    use stackview_core::{Mask, Orientation};

    fn base() -> ndarray::ArrayD<f64> {
        Array3::from_shape_fn((1, 2, 3), |(_, r, c)| (r * 3 + c) as f64).into_dyn()
    }

    #[test]
    fn test_identity_is_base() {
        let b = base();
        let view = project(b.view(), &ViewState::identity());
        assert_eq!(view, b.view());
        assert_eq!(view.as_ptr(), b.as_ptr());
    }

    #[test]
    fn test_transpose_then_flip() {
        let b = base();
        let state = ViewState::identity().with_orientation(Orientation {
            transposed: true,
            flipped_x: true,
            flipped_y: false,
        });
        let view = project(b.view(), &state);
        // transposed: [[0, 3], [1, 4], [2, 5]]; flipping the first spatial axis reverses rows
        assert_eq!(view, array![[[2.0, 5.0], [1.0, 4.0], [0.0, 3.0]]].into_dyn());
    }

    #[test]
    fn test_flip_y_reverses_columns() {
        let b = base();
        let state = ViewState::identity().with_orientation(Orientation::default().toggle_flip_y());
        let view = project(b.view(), &state);
        assert_eq!(view, array![[[2.0, 1.0, 0.0], [5.0, 4.0, 3.0]]].into_dyn());
    }

    #[test]
    fn test_mask_before_orientation() {
        let b = base();
        let state = ViewState::identity()
            .with_mask(Some(Mask {
                row_start: 1,
                row_stop: 2,
                col_start: 0,
                col_stop: 2,
            }))
            .with_orientation(Orientation::default().toggle_transpose());
        let view = project(b.view(), &state);
        assert_eq!(view, array![[[3.0], [4.0]]].into_dyn());
    }
}
