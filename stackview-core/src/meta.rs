//! Per-frame metadata records.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Colour model of the source frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ColorModel {
    #[default]
    Grayscale,
    Rgb,
}

impl fmt::Display for ColorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grayscale => f.write_str("Grayscale"),
            Self::Rgb => f.write_str("RGB"),
        }
    }
}

/// Metadata describing one frame of a stack.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameMeta {
    /// Source file name (or `<file>-<index>` for frames of one array file).
    pub file_name: String,
    /// Size of the source in MiB.
    pub file_size_mb: f64,
    /// Frame size as (height, width).
    pub size: (usize, usize),
    /// Element type of the source data, e.g. `"u16"`.
    pub dtype: String,
    /// Bits per element of the source data.
    pub bit_depth: u32,
    pub color_model: ColorModel,
}

impl FrameMeta {
    /// Creates a record with only a name; the rest is left at neutral values.
    #[must_use]
    pub fn named(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            file_size_mb: 0.0,
            size: (0, 0),
            dtype: String::from("float64"),
            bit_depth: 64,
            color_model: ColorModel::Grayscale,
        }
    }

    /// Builds `count` records named `<prefix>-<index>` for frames that all
    /// come from a single in-memory array.
    ///
    /// `frame_bytes` is the size of one frame in the source type.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn numbered(
        prefix: &str,
        count: usize,
        size: (usize, usize),
        dtype: &str,
        bit_depth: u32,
        color_model: ColorModel,
        frame_bytes: usize,
    ) -> Vec<Self> {
        let file_size_mb = frame_bytes as f64 / f64::from(1u32 << 20);
        (0..count)
            .map(|index| Self {
                file_name: format!("{prefix}-{index}"),
                file_size_mb,
                size,
                dtype: dtype.to_string(),
                bit_depth,
                color_model,
            })
            .collect()
    }

    /// Name shortened to at most `max_len` characters.
    ///
    /// Long names keep their head and tail (where the extension or frame
    /// number lives) around a `...` marker.
    #[must_use]
    pub fn display_name(&self, max_len: usize) -> String {
        fit_text(&self.file_name, max_len)
    }
}

fn fit_text(text: &str, max_len: usize) -> String {
    const MARKER: &str = "...";
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_len {
        return text.to_string();
    }
    if max_len <= MARKER.len() {
        return chars[..max_len].iter().collect();
    }
    let keep = max_len - MARKER.len();
    let head = keep.div_ceil(2);
    let tail = keep - head;
    let mut out: String = chars[..head].iter().collect();
    out.push_str(MARKER);
    out.extend(&chars[chars.len() - tail..]);
    out
}
