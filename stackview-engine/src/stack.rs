//! The image stack engine.

use std::fmt;
use std::mem::size_of;
use std::sync::Arc;

use log::{debug, info, warn};
use ndarray::{Array1, ArrayD, ArrayViewD, Axis};
use stackview_algorithms::{
    ingest, line_profiles, normalize, pixel, reduce_frames, region_means, Executor, FrameStats,
    Levels, LineProfiles, PixelValue,
};
use stackview_core::{
    ColorModel, EngineConfig, Error, FrameMeta, LoadOptions, Mask, Region, ReduceOp, Result,
    ViewState,
};

use crate::cache::{ReductionCache, Volume};
use crate::projection::project;
use crate::request::{Normalize, Reference};

/// Index, last index and shortened name of a frame, for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLabel {
    pub index: usize,
    pub last: usize,
    pub name: String,
}

/// Raw image stack plus the lazily derived view the application displays.
///
/// The raw volume is `frame x row x col` (grayscale) or
/// `frame x row x col x channel`. It is never modified; reductions and
/// normalizations are cached next to it and selected by the [`ViewState`].
/// Consumers read [`ImageStack::current_image`] after every mutation.
pub struct ImageStack {
    raw: ArrayD<f64>,
    meta: Vec<FrameMeta>,
    grayscale: bool,
    reductions: ReductionCache,
    normalization: Option<Volume>,
    state: ViewState,
    config: EngineConfig,
    exec: Executor,
}

fn rejected<T>(err: Error) -> Result<T> {
    warn!("{err}");
    Err(err)
}

fn validate(raw: &ArrayD<f64>, meta: &[FrameMeta]) -> Result<()> {
    if !(3..=4).contains(&raw.ndim()) {
        return Err(Error::UnsupportedShape {
            shape: raw.shape().to_vec(),
        });
    }
    let frames = raw.len_of(Axis(0));
    if frames == 0 {
        return Err(Error::EmptyStack);
    }
    if meta.len() != frames {
        return Err(Error::MetadataMismatch {
            frames,
            metadata: meta.len(),
        });
    }
    Ok(())
}

fn prepare(
    raw: ArrayD<f64>,
    meta: Vec<FrameMeta>,
    options: &LoadOptions,
) -> Result<(ArrayD<f64>, Vec<FrameMeta>)> {
    validate(&raw, &meta).or_else(rejected)?;
    let total = raw.len_of(Axis(0));
    let stride = options
        .resolve_stride(raw.len() * size_of::<f64>(), total)
        .or_else(rejected)?;

    let raw = ingest::every_nth_frame(raw, stride);
    let mut meta: Vec<FrameMeta> = meta.into_iter().step_by(stride).collect();
    info!("Keeping {}/{} frames", meta.len(), total);

    let raw = if options.grayscale {
        match ingest::to_grayscale(&raw.view()) {
            Some(gray) => {
                for record in &mut meta {
                    record.color_model = ColorModel::Grayscale;
                }
                gray
            }
            None => raw,
        }
    } else {
        raw
    };
    let raw = if options.size_ratio < 1.0 {
        let small = ingest::downscale(&raw.view(), options.size_ratio);
        let size = (small.len_of(Axis(1)), small.len_of(Axis(2)));
        debug!("Downscaled frames to {size:?}");
        for record in &mut meta {
            record.size = size;
        }
        small
    } else {
        raw
    };
    let raw = if options.convert_to_8_bit {
        for record in &mut meta {
            record.dtype = "u8".to_string();
            record.bit_depth = 8;
        }
        ingest::to_8_bit(raw)
    } else {
        raw
    };
    Ok((raw, meta))
}

impl ImageStack {
    /// Creates a stack with the default configuration.
    ///
    /// # Errors
    /// Returns an error if the volume is not rank 3 or 4, has no frames, or
    /// `meta` does not have one record per frame.
    pub fn new(raw: ArrayD<f64>, meta: Vec<FrameMeta>) -> Result<Self> {
        Self::with_config(raw, meta, EngineConfig::default())
    }

    /// Creates a stack with an explicit configuration.
    ///
    /// # Errors
    /// See [`Self::new`]; also fails if the worker pool cannot be built.
    pub fn with_config(raw: ArrayD<f64>, meta: Vec<FrameMeta>, config: EngineConfig) -> Result<Self> {
        validate(&raw, &meta).or_else(rejected)?;
        let exec = Executor::from_config(&config)?;
        let grayscale = ingest::is_grayscale(&raw.view());
        info!(
            "Loaded {} frame(s) of shape {:?}",
            raw.len_of(Axis(0)),
            &raw.shape()[1..]
        );
        Ok(Self {
            raw,
            meta,
            grayscale,
            reductions: ReductionCache::default(),
            normalization: None,
            state: ViewState::identity(),
            config,
            exec,
        })
    }

    /// Creates a stack from any numeric array, naming frames `<name>-<index>`.
    ///
    /// # Errors
    /// See [`Self::new`].
    pub fn from_array<A>(raw: &ArrayViewD<'_, A>, name: &str) -> Result<Self>
    where
        A: Copy + Into<f64>,
    {
        let shape = raw.shape();
        let frames = shape.first().copied().unwrap_or(0);
        let size = (
            shape.get(1).copied().unwrap_or(0),
            shape.get(2).copied().unwrap_or(0),
        );
        let color_model = if shape.len() == 4 && shape[3] == 3 {
            ColorModel::Rgb
        } else {
            ColorModel::Grayscale
        };
        let frame_elements: usize = shape.iter().skip(1).product();
        let bit_depth = u32::try_from(size_of::<A>() * 8).unwrap_or(u32::MAX);
        let meta = FrameMeta::numbered(
            name,
            frames,
            size,
            std::any::type_name::<A>(),
            bit_depth,
            color_model,
            frame_elements * size_of::<A>(),
        );
        Self::new(ingest::to_f64(raw), meta)
    }

    /// Replaces storage wholesale and resets every cache and view flag.
    ///
    /// # Errors
    /// See [`Self::new`]. On error the stack keeps its previous data.
    pub fn load(&mut self, raw: ArrayD<f64>, meta: Vec<FrameMeta>) -> Result<()> {
        validate(&raw, &meta).or_else(rejected)?;
        self.grayscale = ingest::is_grayscale(&raw.view());
        self.raw = raw;
        self.meta = meta;
        self.reset();
        info!(
            "Loaded {} frame(s) of shape {:?}",
            self.frame_count(),
            &self.raw.shape()[1..]
        );
        Ok(())
    }

    /// Like [`Self::load`], after optional grayscale conversion and frame
    /// subsetting according to `options`.
    ///
    /// # Errors
    /// Returns an error for invalid options or an invalid stack.
    pub fn load_with(&mut self, raw: ArrayD<f64>, meta: Vec<FrameMeta>, options: &LoadOptions) -> Result<()> {
        let (raw, meta) = prepare(raw, meta, options)?;
        self.load(raw, meta)
    }

    /// Like [`Self::with_config`], applying `options` as [`Self::load_with`] does.
    ///
    /// # Errors
    /// Returns an error for invalid options or an invalid stack.
    pub fn with_options(
        raw: ArrayD<f64>,
        meta: Vec<FrameMeta>,
        config: EngineConfig,
        options: &LoadOptions,
    ) -> Result<Self> {
        let (raw, meta) = prepare(raw, meta, options)?;
        Self::with_config(raw, meta, config)
    }

    /// The image consumers should display and measure.
    ///
    /// Base volume (active reduction, else active normalization, else raw),
    /// then mask, transpose, flip-x, flip-y. Only view metadata is built.
    #[must_use]
    pub fn current_image(&self) -> ArrayViewD<'_, f64> {
        project(self.base().view(), &self.state)
    }

    fn base(&self) -> &ArrayD<f64> {
        if let Some(volume) = self.state.reduction.and_then(|op| self.reductions.get(op)) {
            return volume;
        }
        if let Some(volume) = &self.normalization {
            return volume;
        }
        &self.raw
    }

    /// Number of raw frames.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.raw.len_of(Axis(0))
    }

    /// Shape of the current image.
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        self.current_image().shape().to_vec()
    }

    /// Shape of the raw stack.
    #[must_use]
    pub fn raw_shape(&self) -> &[usize] {
        self.raw.shape()
    }

    /// The raw stack, independent of the view state.
    #[must_use]
    pub fn raw(&self) -> ArrayViewD<'_, f64> {
        self.raw.view()
    }

    /// Metadata of raw frame `index`.
    #[must_use]
    pub fn metadata(&self, index: usize) -> Option<&FrameMeta> {
        self.meta.get(index)
    }

    /// All frame metadata.
    #[must_use]
    pub fn all_metadata(&self) -> &[FrameMeta] {
        &self.meta
    }

    /// True when the current image has a single frame (one raw frame, or a
    /// reduction is displayed).
    #[must_use]
    pub fn is_single_frame(&self) -> bool {
        self.current_image().len_of(Axis(0)) == 1
    }

    /// True when the raw frames carry no colour information.
    #[must_use]
    pub fn is_grayscale(&self) -> bool {
        self.grayscale
    }

    #[must_use]
    pub fn view_state(&self) -> ViewState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Cached reduction for `op`, whether or not it is active.
    #[must_use]
    pub fn cached_reduction(&self, op: ReduceOp) -> Option<&Volume> {
        self.reductions.get(op)
    }

    /// Cached normalization volume, present only while a normalization is active.
    #[must_use]
    pub fn cached_normalization(&self) -> Option<&Volume> {
        self.normalization.as_ref()
    }

    fn ensure_reduction(&mut self, op: ReduceOp) -> &Volume {
        let raw = &self.raw;
        let exec = &self.exec;
        let (volume, computed) = self.reductions.get_or_compute(op, || {
            exec.run(raw.len(), |mode| reduce_frames(&raw.view(), op, mode))
        });
        if computed {
            debug!("Computed {op} reduction over {} frame(s)", raw.len_of(Axis(0)));
        } else {
            debug!("Reusing cached {op} reduction");
        }
        volume
    }

    /// Displays the `op` reduction over all frames, computing it at most once
    /// until the caches are invalidated.
    pub fn reduce(&mut self, op: ReduceOp) {
        self.ensure_reduction(op);
        self.state = self.state.with_reduction(Some(op));
    }

    /// Returns to the unreduced view. Cached reductions are kept.
    pub fn unravel(&mut self) {
        self.state = self.state.with_reduction(None);
    }

    /// Normalizes the raw stack against a reference.
    ///
    /// Requesting the operation that is already active without
    /// [`Normalize::force`] switches normalization off instead. Returns
    /// whether a normalization is active afterwards.
    ///
    /// # Errors
    /// Rejected (state unchanged) while a reduction is active, for an invalid
    /// frame range, or when the reference frame shape differs.
    pub fn normalize(&mut self, request: &Normalize<'_>) -> Result<bool> {
        if self.state.reduction.is_some() {
            return rejected(Error::ReductionActive);
        }
        if self.state.normalization == Some(request.op) && !request.force {
            self.normalization = None;
            self.state = self.state.with_normalization(None);
            debug!("Switched off {} normalization", request.op);
            return Ok(false);
        }

        let raw = self.raw.view();
        let frame_shape = &self.raw.shape()[1..];
        let volume = self
            .exec
            .run(self.raw.len(), |mode| {
                let reference = match request.reference {
                    Reference::Range(range) => normalize::range_reference(
                        &raw,
                        range.left,
                        range.right,
                        range.beta,
                        range.reduce,
                        mode,
                    )?,
                    Reference::Image(background) => {
                        normalize::image_reference(&background.current_image(), frame_shape, mode)?
                    }
                };
                normalize::apply(&raw, &reference.view(), request.op, mode)
            })
            .or_else(rejected)?;

        debug!("Computed {} normalization", request.op);
        self.normalization = Some(Arc::new(volume));
        self.state = self.state.with_normalization(Some(request.op));
        Ok(true)
    }

    /// Crops every frame to `region`, given in the coordinates of the current
    /// image. Masks compose: a second mask is relative to the first.
    ///
    /// The active reduction is kept (recomputed), any normalization is
    /// discarded. Returns the resulting mask in raw coordinates.
    ///
    /// # Errors
    /// Rejected (state unchanged) while the image is flipped or transposed,
    /// or when the region does not overlap the current image.
    pub fn mask(&mut self, region: &Region) -> Result<Mask> {
        let orientation = self.state.orientation;
        if !orientation.is_identity() {
            return rejected(Error::OrientationActive(orientation));
        }
        let displayed = {
            let image = self.current_image();
            (image.len_of(Axis(1)), image.len_of(Axis(2)))
        };
        let mask = Mask::compose(self.state.mask.as_ref(), region, displayed).or_else(rejected)?;

        let reduction = self.state.reduction;
        self.clear_caches();
        if let Some(op) = reduction {
            self.ensure_reduction(op);
        }
        self.state = ViewState::identity()
            .with_reduction(reduction)
            .with_mask(Some(mask));
        debug!("Mask rows {:?} cols {:?}", mask.rows(), mask.cols());
        Ok(mask)
    }

    /// Swaps the two spatial axes of the current image.
    pub fn transpose(&mut self) {
        self.state = self
            .state
            .with_orientation(self.state.orientation.toggle_transpose());
    }

    /// Reverses the first spatial axis of the current image.
    pub fn flip_x(&mut self) {
        self.state = self
            .state
            .with_orientation(self.state.orientation.toggle_flip_x());
    }

    /// Reverses the second spatial axis of the current image.
    pub fn flip_y(&mut self) {
        self.state = self
            .state
            .with_orientation(self.state.orientation.toggle_flip_y());
    }

    /// Drops all caches and returns to the raw view.
    pub fn reset(&mut self) {
        self.clear_caches();
        self.state = ViewState::identity();
    }

    fn clear_caches(&mut self) {
        self.reductions.clear();
        self.normalization = None;
    }

    /// Statistics of the current image.
    #[must_use]
    pub fn stats(&self) -> Option<FrameStats> {
        FrameStats::of(&self.current_image())
    }

    /// Display levels fitted to the current image.
    #[must_use]
    pub fn levels(&self) -> Option<Levels> {
        self.stats().map(|stats| Levels::auto(&stats))
    }

    /// Pixel of the current image.
    #[must_use]
    pub fn pixel(&self, frame: usize, row: usize, col: usize) -> Option<PixelValue> {
        pixel(&self.current_image(), frame, row, col)
    }

    /// Row and column profiles of the current image through a pixel.
    #[must_use]
    pub fn line_profiles(&self, frame: usize, row: usize, col: usize) -> Option<LineProfiles> {
        line_profiles(&self.current_image(), frame, row, col)
    }

    /// Mean of `region` of the current image for every displayed frame, or
    /// `None` when the region does not overlap the image.
    #[must_use]
    pub fn roi_curve(&self, region: &Region) -> Option<Array1<f64>> {
        let image = self.current_image();
        let local = region.clamp(image.len_of(Axis(1)), image.len_of(Axis(2)))?;
        Some(region_means(&image, local.rows(), local.cols()))
    }

    /// Label of displayed frame `index`.
    #[must_use]
    pub fn frame_label(&self, index: usize) -> Option<FrameLabel> {
        let frames = self.current_image().len_of(Axis(0));
        if index >= frames {
            return None;
        }
        let name = self.metadata(index)?.display_name(self.config.max_name_length);
        Some(FrameLabel {
            index,
            last: frames - 1,
            name,
        })
    }
}

impl fmt::Debug for ImageStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageStack")
            .field("raw_shape", &self.raw.shape())
            .field("frames", &self.meta.len())
            .field("grayscale", &self.grayscale)
            .field("cached_reductions", &self.reductions.len())
            .field("normalized", &self.normalization.is_some())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
