//! stackview-algorithms: Numeric kernels for image stacks.
//!
//! This crate provides the computations behind the engine:
//! - **Reductions** - per-pixel min/max/mean/std along the frame axis
//! - **Normalization** - range and external references, subtract/divide
//! - **Statistics** - summary stats and display levels
//! - **Profiles** - pixel readout, line profiles, ROI curves, smoothing
//! - **Ingest** - type widening, frame subsetting, grayscale conversion
//!
#![warn(missing_docs)]

mod exec;
pub mod ingest;
pub mod normalize;
pub mod profile;
mod reduce;
mod stats;

pub use exec::{Execution, Executor};
pub use profile::{line_profiles, pixel, region_means, smooth, LineProfiles, PixelValue};
pub use reduce::reduce_frames;
pub use stats::{FrameStats, Levels};

// Re-export core operation types
pub use stackview_core::{NormOp, ReduceOp};
