//! stackview-core: Core types for the stackview image stack engine.
//!
//! This crate provides the value types shared by the kernels and the
//! engine: the view state describing how the current image is derived,
//! spatial masks, per-frame metadata, configuration and errors.
//!

pub mod config;
pub mod error;
pub mod meta;
pub mod region;
pub mod view;

pub use config::{EngineConfig, LoadOptions, LUMA_WEIGHTS};
pub use error::{Error, Result};
pub use meta::{ColorModel, FrameMeta};
pub use region::{Mask, Region};
pub use view::{NormOp, Orientation, ReduceOp, ViewState};
