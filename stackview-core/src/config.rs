//! Engine and ingest configuration.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Luma weights used when converting RGB frames to grayscale.
pub const LUMA_WEIGHTS: [f64; 3] = [0.2989, 0.5870, 0.1140];

/// Configuration for an image stack engine.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Number of elements above which reduction and normalization kernels
    /// run data-parallel.
    pub parallel_threshold: usize,
    /// Worker threads for parallel kernels (`None` = global rayon pool).
    pub parallelism: Option<usize>,
    /// Maximum length of frame names returned by frame labels.
    pub max_name_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 1 << 20,
            parallelism: None,
            max_name_length: 40,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the element count above which kernels run in parallel.
    #[must_use]
    pub fn with_parallel_threshold(mut self, elements: usize) -> Self {
        self.parallel_threshold = elements;
        self
    }

    /// Set the number of worker threads for parallel kernels.
    ///
    /// Values less than 1 are clamped to 1. Use [`Self::try_with_parallelism`]
    /// to surface invalid values as an error instead.
    #[must_use]
    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads.max(1));
        self
    }

    /// Set the maximum displayed frame-name length.
    #[must_use]
    pub fn with_max_name_length(mut self, length: usize) -> Self {
        self.max_name_length = length;
        self
    }

    /// Fallible variant of [`Self::with_parallelism`].
    ///
    /// # Errors
    /// Returns an error if `threads` is 0.
    pub fn try_with_parallelism(mut self, threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(Error::ConfigError(
                "parallelism must be at least 1".to_string(),
            ));
        }
        self.parallelism = Some(threads);
        Ok(self)
    }
}

/// Options applied to already-decoded arrays when they are loaded.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoadOptions {
    /// Fraction of frames to keep (0.0 < ratio <= 1.0).
    pub subset_ratio: f64,
    /// Spatial scale applied to every frame (0.0 < ratio <= 1.0).
    pub size_ratio: f64,
    /// Memory budget for the loaded stack in bytes; the frame subset is
    /// thinned further when the estimate exceeds it.
    pub memory_budget_bytes: Option<usize>,
    /// Convert colour frames to grayscale.
    pub grayscale: bool,
    /// Rescale every frame to `0..=255` relative to its maximum.
    pub convert_to_8_bit: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            subset_ratio: 1.0,
            size_ratio: 1.0,
            memory_budget_bytes: None,
            grayscale: false,
            convert_to_8_bit: false,
        }
    }
}

fn unit_ratio(name: &str, ratio: f64) -> Result<()> {
    if 0.0 < ratio && ratio <= 1.0 {
        Ok(())
    } else {
        Err(Error::ConfigError(format!("{name} must be in (0.0, 1.0]")))
    }
}

impl LoadOptions {
    /// Set the fraction of frames to keep.
    #[must_use]
    pub fn with_subset_ratio(mut self, ratio: f64) -> Self {
        self.subset_ratio = ratio;
        self
    }

    /// Set the spatial scale of loaded frames.
    #[must_use]
    pub fn with_size_ratio(mut self, ratio: f64) -> Self {
        self.size_ratio = ratio;
        self
    }

    /// Set an explicit memory budget in bytes.
    #[must_use]
    pub fn with_memory_budget_bytes(mut self, bytes: usize) -> Self {
        self.memory_budget_bytes = Some(bytes);
        self
    }

    /// Enable or disable grayscale conversion.
    #[must_use]
    pub fn with_grayscale(mut self, grayscale: bool) -> Self {
        self.grayscale = grayscale;
        self
    }

    /// Enable or disable 8-bit rescaling.
    #[must_use]
    pub fn with_convert_to_8_bit(mut self, convert: bool) -> Self {
        self.convert_to_8_bit = convert;
        self
    }

    /// Checks the ratios and the memory budget.
    ///
    /// # Errors
    /// Returns an error if a ratio is outside `(0.0, 1.0]` or the memory
    /// budget is zero.
    pub fn validate(&self) -> Result<()> {
        unit_ratio("subset_ratio", self.subset_ratio)?;
        unit_ratio("size_ratio", self.size_ratio)?;
        if self.memory_budget_bytes == Some(0) {
            return Err(Error::ConfigError(
                "memory budget must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Ratio of frames that fit into the memory budget (1.0 when everything
    /// fits). `source_bytes` is the size before spatial scaling.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn memory_ratio(&self, source_bytes: usize) -> f64 {
        let estimate = source_bytes as f64 * self.size_ratio * self.size_ratio;
        match self.memory_budget_bytes {
            Some(budget) if estimate > budget as f64 => budget as f64 / estimate,
            _ => 1.0,
        }
    }

    /// Step between kept frames of a `frames`-frame stack of `source_bytes`.
    ///
    /// Never larger than `frames`, so at least the first frame is kept.
    ///
    /// # Errors
    /// See [`Self::validate`].
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn resolve_stride(&self, source_bytes: usize, frames: usize) -> Result<usize> {
        self.validate()?;
        let ratio = self.subset_ratio.min(self.memory_ratio(source_bytes));
        let stride = (1.0 / ratio).ceil();
        let frames = frames.max(1);
        if stride >= frames as f64 {
            return Ok(frames);
        }
        Ok((stride as usize).max(1))
    }
}
