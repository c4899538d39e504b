use kurbo::{Affine, Rect};

use crate::error::{RasterViewError, Result};

/// Upper bound on automatically chosen level counts.
const MAX_AUTO_LEVELS: usize = 32;

/// Immutable description of a multi-resolution hierarchy.
///
/// Level 0 is full resolution. Level `n` has `scale[n]` level-0 pixels per
/// level pixel along each axis, so its size is `ceil(level0 / scale[n])`,
/// never smaller than 1×1.
#[derive(Clone, Debug, PartialEq)]
pub struct PyramidModel {
    width: usize,
    height: usize,
    scales: Vec<f64>,
    image_to_model: Affine,
}

impl PyramidModel {
    /// Power-of-two pyramid: `scale[n] = 2^n`.
    pub fn new(
        width: usize,
        height: usize,
        level_count: usize,
        image_to_model: Affine,
    ) -> Result<Self> {
        if level_count == 0 {
            return Err(RasterViewError::InvalidPyramid(
                "level count must be at least 1".into(),
            ));
        }
        let scales = (0..level_count).map(|n| 2f64.powi(n as i32)).collect();
        Self::with_scales(width, height, scales, image_to_model)
    }

    /// Pyramid with explicit per-level scales. Scales must start at 1 and be
    /// strictly increasing.
    pub fn with_scales(
        width: usize,
        height: usize,
        scales: Vec<f64>,
        image_to_model: Affine,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RasterViewError::InvalidDimensions { width, height });
        }
        match scales.first() {
            None => {
                return Err(RasterViewError::InvalidPyramid(
                    "level count must be at least 1".into(),
                ))
            }
            Some(&first) if first != 1.0 => {
                return Err(RasterViewError::InvalidPyramid(format!(
                    "level 0 scale must be 1, got {first}"
                )))
            }
            Some(_) => {}
        }
        if scales.iter().any(|s| !s.is_finite())
            || scales.windows(2).any(|pair| pair[1] <= pair[0])
        {
            return Err(RasterViewError::InvalidPyramid(format!(
                "scales must be finite and strictly increasing: {scales:?}"
            )));
        }
        if image_to_model.determinant().abs() <= f64::EPSILON
            || !image_to_model.as_coeffs().iter().all(|c| c.is_finite())
        {
            return Err(RasterViewError::InvalidPyramid(
                "image-to-model transform is not invertible".into(),
            ));
        }
        Ok(Self {
            width,
            height,
            scales,
            image_to_model,
        })
    }

    /// Number of power-of-two levels needed until the coarsest level fits
    /// inside a `tile × tile` square.
    pub fn auto_level_count(width: usize, height: usize, tile: usize) -> usize {
        let tile = tile.max(1);
        let mut count = 1;
        let mut extent = width.max(height);
        while extent > tile && count < MAX_AUTO_LEVELS {
            extent = extent.div_ceil(2);
            count += 1;
        }
        count
    }

    pub fn level_count(&self) -> usize {
        self.scales.len()
    }

    /// Level-0 width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Level-0 height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn scale(&self, level: usize) -> Result<f64> {
        self.scales
            .get(level)
            .copied()
            .ok_or(RasterViewError::LevelOutOfRange {
                level,
                level_count: self.level_count(),
            })
    }

    /// `(width, height)` of `level` in that level's pixels.
    pub fn level_size(&self, level: usize) -> Result<(usize, usize)> {
        let scale = self.scale(level)?;
        let w = ((self.width as f64 / scale).ceil() as usize).max(1);
        let h = ((self.height as f64 / scale).ceil() as usize).max(1);
        Ok((w, h))
    }

    /// Transform from level-0 image pixels to model coordinates.
    pub fn image_to_model(&self) -> Affine {
        self.image_to_model
    }

    /// Transform from `level` image pixels to model coordinates.
    pub fn level_image_to_model(&self, level: usize) -> Result<Affine> {
        Ok(self.image_to_model * Affine::scale(self.scale(level)?))
    }

    /// Bounds of the level-0 image in model coordinates.
    pub fn model_bounds(&self) -> Rect {
        self.image_to_model.transform_rect_bbox(Rect::new(
            0.0,
            0.0,
            self.width as f64,
            self.height as f64,
        ))
    }

    /// Coarsest level whose scale does not exceed `image_pixels_per_view_pixel`.
    pub fn level_for_scale(&self, image_pixels_per_view_pixel: f64) -> usize {
        if !image_pixels_per_view_pixel.is_finite() {
            return if image_pixels_per_view_pixel > 0.0 {
                self.level_count() - 1
            } else {
                0
            };
        }
        self.scales
            .iter()
            .rposition(|&s| s <= image_pixels_per_view_pixel)
            .unwrap_or(0)
    }

    /// Level to display at a viewport zoom factor (view pixels per model
    /// unit).
    pub fn level_for_zoom(&self, zoom_factor: f64) -> usize {
        let model_per_image = self.image_to_model.determinant().abs().sqrt();
        self.level_for_scale(1.0 / (zoom_factor * model_per_image))
    }
}
