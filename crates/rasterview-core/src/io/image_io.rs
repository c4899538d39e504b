use std::path::Path;

use image::{GrayImage, ImageFormat, Luma};
use ndarray::Array2;

use crate::error::Result;
use crate::raster::Raster;

/// Load an image file as a single-band raster with samples in [0.0, 1.0].
pub fn load_raster(path: &Path) -> Result<Raster> {
    let img = image::open(path)?;
    let gray = img.to_luma16();
    let (w, h) = gray.dimensions();
    let mut data = Array2::<f32>::zeros((h as usize, w as usize));

    for (col, row, pixel) in gray.enumerate_pixels() {
        data[[row as usize, col as usize]] = pixel.0[0] as f32 / 65535.0;
    }

    Ok(Raster::new(data))
}

/// Save a raster as 8-bit grayscale PNG. "No data" samples become black.
pub fn save_png(raster: &Raster, path: &Path) -> Result<()> {
    let h = raster.height();
    let w = raster.width();

    let mut img = GrayImage::new(w as u32, h as u32);
    for ((row, col), &v) in raster.data.indexed_iter() {
        let val = if v.is_nan() {
            0
        } else {
            (v.clamp(0.0, 1.0) * 255.0) as u8
        };
        img.put_pixel(col as u32, row as u32, Luma([val]));
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
