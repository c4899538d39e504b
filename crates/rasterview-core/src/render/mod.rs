mod canvas;

use kurbo::{Affine, Rect};
use tracing::debug;

use crate::error::{RasterViewError, Result};
use crate::pyramid::PyramidSource;
use crate::raster::Raster;
use crate::viewport::Viewport;

pub use canvas::RasterCanvas;

/// Something a pyramid level can be painted onto.
pub trait RenderSurface {
    /// Device-pixel bounds of the surface.
    fn view_bounds(&self) -> Rect;

    /// Paint `image` with `image_to_view` mapping its pixels to surface
    /// coordinates.
    fn paint(&mut self, image: &Raster, image_to_view: Affine);
}

/// Paints the pyramid level matching the viewport's zoom. Returns the level
/// that was painted.
pub fn render_viewport(
    viewport: &Viewport,
    source: &PyramidSource,
    surface: &mut dyn RenderSurface,
) -> Result<usize> {
    let model = source.model();
    let level = model.level_for_zoom(viewport.zoom_factor());
    let image = source.level_image(level)?;
    let level_to_view = viewport.model_to_view_transform() * model.level_image_to_model(level)?;
    debug!(
        level,
        width = image.width(),
        height = image.height(),
        "Painting pyramid level"
    );
    surface.paint(&image, level_to_view);
    Ok(level)
}

/// Renders `model_rect` into a new `width × height` raster, rotated by
/// `orientation` radians about its center.
pub fn snapshot(
    source: &PyramidSource,
    model_rect: Rect,
    width: usize,
    height: usize,
    orientation: f64,
) -> Result<Raster> {
    if width == 0 || height == 0 {
        return Err(RasterViewError::InvalidDimensions { width, height });
    }
    let mut canvas = RasterCanvas::new(width, height);
    let mut viewport = Viewport::new(canvas.view_bounds());
    viewport.set_orientation(orientation);
    viewport.zoom_to_rect(model_rect);
    render_viewport(&viewport, source, &mut canvas)?;
    Ok(canvas.into_raster())
}
