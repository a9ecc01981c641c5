//! stackview-engine: Stateful image stack engine.
//!
//! An [`ImageStack`] owns a raw `frame x row x col [x channel]` volume and
//! derives the image a viewer displays from it:
//! - **Reductions** over the frame axis, cached per operation
//! - **Normalization** against a frame range or another stack
//! - **Masking** to a region, composing with earlier masks
//! - **Orientation** toggles (transpose, flip-x, flip-y) as zero-copy views
//!
//! # Example
//!
//! ```
//! use ndarray::Array3;
//! use stackview_engine::{FrameRange, ImageStack, Normalize, Reference, ReduceOp};
//!
//! let raw = Array3::<u16>::zeros((5, 4, 4)).into_dyn();
//! let mut stack = ImageStack::from_array(&raw.view(), "scan").unwrap();
//!
//! stack.reduce(ReduceOp::Mean);
//! assert_eq!(stack.shape(), vec![1, 4, 4]);
//! stack.unravel();
//!
//! let request = Normalize::subtract(Reference::Range(FrameRange::new(0, 1)));
//! assert!(stack.normalize(&request).unwrap());
//! ```

mod cache;
mod projection;
mod request;
mod stack;

pub use cache::Volume;
pub use request::{FrameRange, Normalize, Reference};
pub use stack::{FrameLabel, ImageStack};

// Re-export the types callers need to drive the engine
pub use stackview_algorithms::{FrameStats, Levels, LineProfiles, PixelValue};
pub use stackview_core::{
    ColorModel, EngineConfig, Error, FrameMeta, LoadOptions, Mask, NormOp, Orientation, ReduceOp,
    Region, Result, ViewState,
};
