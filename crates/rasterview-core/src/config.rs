use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_VIEW_HEIGHT, DEFAULT_VIEW_WIDTH, DEFAULT_WHEEL_ZOOM_STEP, MAX_SCROLL_VALUE,
    MODEL_BOUNDS_EXTENSION,
};

/// Top-level viewer configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub pyramid: PyramidConfig,
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub zoom: ZoomConfig,
}

/// Initial device-pixel size of the view surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_VIEW_WIDTH,
            height: DEFAULT_VIEW_HEIGHT,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PyramidConfig {
    /// Number of levels. `None` picks enough levels for the coarsest one to
    /// fit a single tile.
    #[serde(default)]
    pub levels: Option<usize>,
    #[serde(default)]
    pub derivation: DerivationKind,
}

/// How each pyramid level is derived from the base raster.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum DerivationKind {
    /// Area-averaged downsampling.
    #[default]
    Downsample,
    /// Downsample, then `v * factor + offset`.
    Rescale { factor: f32, offset: f32 },
    /// Downsample, then stretch `[low, high]` linearly into `[0, 1]`.
    Stretch { low: f32, high: f32 },
    /// Every level is "no data".
    NoData,
}

impl std::fmt::Display for DerivationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Downsample => write!(f, "Downsample"),
            Self::Rescale { factor, offset } => {
                write!(f, "Rescale (x{factor}, {offset:+})")
            }
            Self::Stretch { low, high } => write!(f, "Stretch ({low}..{high})"),
            Self::NoData => write!(f, "No Data"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Pixels the model bounds are extended by on every side.
    pub margin: f64,
    /// Maximum scrollbar value.
    pub max_value: i32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            margin: MODEL_BOUNDS_EXTENSION,
            max_value: MAX_SCROLL_VALUE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoomConfig {
    /// Zoom multiplier per wheel notch.
    pub wheel_step: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            wheel_step: DEFAULT_WHEEL_ZOOM_STEP,
        }
    }
}
