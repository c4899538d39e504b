//! Per-level derivation strategies.
//!
//! A [`PyramidSource`](super::PyramidSource) is constructed with one
//! strategy; it is invoked at most once per level and cache generation.

use std::sync::Arc;

use ndarray::{s, Array2};
use rayon::prelude::*;

use crate::config::DerivationKind;
use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{RasterViewError, Result};
use crate::raster::Raster;

use super::cancel::CancelToken;
use super::model::PyramidModel;

/// Produces the raster of one pyramid level from the base (level-0) raster.
pub trait LevelDerivation: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Derive `level`. Implementations should poll `cancel` and return
    /// [`RasterViewError::Cancelled`] when it is set.
    fn derive(
        &self,
        base: &Raster,
        level: usize,
        model: &PyramidModel,
        cancel: &CancelToken,
    ) -> Result<Raster>;

    /// Custom per-level scales. `None` means `scale[n] = 2^n`.
    fn scales(&self, _width: usize, _height: usize, _level_count: usize) -> Option<Vec<f64>> {
        None
    }
}

/// Build the strategy selected in a config file.
pub fn from_kind(kind: &DerivationKind) -> Arc<dyn LevelDerivation> {
    match *kind {
        DerivationKind::Downsample => Arc::new(Downsample::default()),
        DerivationKind::Rescale { factor, offset } => Arc::new(Rescale::new(factor, offset)),
        DerivationKind::Stretch { low, high } => Arc::new(Stretch::new(low, high)),
        DerivationKind::NoData => Arc::new(NoData),
    }
}

/// Area-averaging downsampler. NaN samples are ignored; a block with no
/// valid sample stays NaN.
#[derive(Clone, Debug, Default)]
pub struct Downsample {
    custom_scales: Option<Vec<f64>>,
}

impl Downsample {
    /// Downsampler for a non-power-of-two pyramid.
    pub fn with_scales(scales: Vec<f64>) -> Self {
        Self {
            custom_scales: Some(scales),
        }
    }
}

impl LevelDerivation for Downsample {
    fn name(&self) -> &str {
        "downsample"
    }

    fn derive(
        &self,
        base: &Raster,
        level: usize,
        model: &PyramidModel,
        cancel: &CancelToken,
    ) -> Result<Raster> {
        downsample(base, level, model, cancel)
    }

    fn scales(&self, _width: usize, _height: usize, _level_count: usize) -> Option<Vec<f64>> {
        self.custom_scales.clone()
    }
}

/// Downsample, then apply `v * factor + offset` (unit / type conversion).
#[derive(Clone, Debug)]
pub struct Rescale {
    pub factor: f32,
    pub offset: f32,
}

impl Rescale {
    pub fn new(factor: f32, offset: f32) -> Self {
        Self { factor, offset }
    }
}

impl LevelDerivation for Rescale {
    fn name(&self) -> &str {
        "rescale"
    }

    fn derive(
        &self,
        base: &Raster,
        level: usize,
        model: &PyramidModel,
        cancel: &CancelToken,
    ) -> Result<Raster> {
        let (factor, offset) = (self.factor, self.offset);
        let level_raster = downsample(base, level, model, cancel)?;
        Ok(Raster::new(level_raster.data.mapv(|v| v * factor + offset)))
    }
}

/// Downsample, then stretch `[low, high]` linearly onto `[0, 1]` for display.
#[derive(Clone, Debug)]
pub struct Stretch {
    pub low: f32,
    pub high: f32,
}

impl Stretch {
    pub fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }
}

impl LevelDerivation for Stretch {
    fn name(&self) -> &str {
        "stretch"
    }

    fn derive(
        &self,
        base: &Raster,
        level: usize,
        model: &PyramidModel,
        cancel: &CancelToken,
    ) -> Result<Raster> {
        let range = self.high - self.low;
        if !(range > 0.0 && range.is_finite()) {
            return Err(RasterViewError::Derivation {
                level,
                message: format!("empty stretch range {}..{}", self.low, self.high),
            });
        }
        let low = self.low;
        let level_raster = downsample(base, level, model, cancel)?;
        Ok(Raster::new(
            level_raster
                .data
                .mapv(|v| ((v - low) / range).clamp(0.0, 1.0)),
        ))
    }
}

/// Sentinel: every level is a "no data" raster of the level's size.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoData;

impl LevelDerivation for NoData {
    fn name(&self) -> &str {
        "no-data"
    }

    fn derive(
        &self,
        _base: &Raster,
        level: usize,
        model: &PyramidModel,
        _cancel: &CancelToken,
    ) -> Result<Raster> {
        let (w, h) = model.level_size(level)?;
        Ok(Raster::no_data(w, h))
    }
}

/// Adapts a closure into a [`LevelDerivation`].
pub struct FnDerivation<F> {
    name: String,
    derive: F,
}

impl<F> FnDerivation<F>
where
    F: Fn(&Raster, usize, &PyramidModel, &CancelToken) -> Result<Raster> + Send + Sync,
{
    pub fn new(name: impl Into<String>, derive: F) -> Self {
        Self {
            name: name.into(),
            derive,
        }
    }
}

impl<F> LevelDerivation for FnDerivation<F>
where
    F: Fn(&Raster, usize, &PyramidModel, &CancelToken) -> Result<Raster> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn derive(
        &self,
        base: &Raster,
        level: usize,
        model: &PyramidModel,
        cancel: &CancelToken,
    ) -> Result<Raster> {
        (self.derive)(base, level, model, cancel)
    }
}

/// Area-average `base` down to the size of `level`.
pub fn downsample(
    base: &Raster,
    level: usize,
    model: &PyramidModel,
    cancel: &CancelToken,
) -> Result<Raster> {
    let (w, h) = model.level_size(level)?;
    if base.width() == 0 || base.height() == 0 {
        return Err(RasterViewError::InvalidDimensions {
            width: base.width(),
            height: base.height(),
        });
    }
    if w == base.width() && h == base.height() {
        return Ok(base.clone());
    }
    let scale = model.scale(level)?;

    let row = |r: usize| -> Option<Vec<f32>> {
        if cancel.is_cancelled() {
            return None;
        }
        let (y0, y1) = block_span(r, scale, base.height());
        Some(
            (0..w)
                .map(|c| {
                    let (x0, x1) = block_span(c, scale, base.width());
                    block_mean(&base.data, y0, y1, x0, x1)
                })
                .collect(),
        )
    };

    let rows: Option<Vec<Vec<f32>>> = if w * h >= PARALLEL_PIXEL_THRESHOLD {
        (0..h).into_par_iter().map(row).collect()
    } else {
        (0..h).map(row).collect()
    };
    let rows = rows.ok_or(RasterViewError::Cancelled { level })?;

    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    let data = Array2::from_shape_vec((h, w), flat).map_err(|e| RasterViewError::Derivation {
        level,
        message: e.to_string(),
    })?;
    Ok(Raster::new(data))
}

/// Source index range covered by destination index `i` at `scale`.
fn block_span(i: usize, scale: f64, len: usize) -> (usize, usize) {
    let start = ((i as f64 * scale).floor() as usize).min(len - 1);
    let end = (((i + 1) as f64 * scale).floor() as usize).clamp(start + 1, len);
    (start, end)
}

fn block_mean(data: &Array2<f32>, y0: usize, y1: usize, x0: usize, x1: usize) -> f32 {
    let (sum, count) = data
        .slice(s![y0..y1, x0..x1])
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0f64, 0usize), |(sum, n), &v| (sum + v as f64, n + 1));
    if count == 0 {
        f32::NAN
    } else {
        (sum / count as f64) as f32
    }
}
