use kurbo::{Affine, Point, Rect};
use ndarray::{Array2, Zip};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::raster::Raster;

use super::RenderSurface;

/// In-memory render target. Starts as "no data"; painting composites valid
/// samples over whatever is already there, nearest-neighbour.
#[derive(Clone, Debug)]
pub struct RasterCanvas {
    data: Array2<f32>,
}

impl RasterCanvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: Array2::from_elem((height, width), f32::NAN),
        }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn into_raster(self) -> Raster {
        Raster::new(self.data)
    }
}

impl RenderSurface for RasterCanvas {
    fn view_bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width() as f64, self.height() as f64)
    }

    fn paint(&mut self, image: &Raster, image_to_view: Affine) {
        if image_to_view.determinant() == 0.0 {
            return;
        }
        let view_to_image = image_to_view.inverse();
        let pixel = |(y, x): (usize, usize), out: &mut f32| {
            let p = view_to_image * Point::new(x as f64 + 0.5, y as f64 + 0.5);
            if !(p.x >= 0.0 && p.y >= 0.0) {
                return;
            }
            if let Some(v) = image.sample(p.x as usize, p.y as usize) {
                if !v.is_nan() {
                    *out = v;
                }
            }
        };
        let parallel = self.data.len() >= PARALLEL_PIXEL_THRESHOLD;
        let zip = Zip::indexed(&mut self.data);
        if parallel {
            zip.par_for_each(pixel);
        } else {
            zip.for_each(pixel);
        }
    }
}
