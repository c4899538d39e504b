use ndarray::Array2;

/// A single-band raster.
/// Samples are f32; `NaN` marks "no data" and renders transparent.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    /// Sample data, row-major, shape = (height, width)
    pub data: Array2<f32>,
}

impl Raster {
    pub fn new(data: Array2<f32>) -> Self {
        Self { data }
    }

    /// A raster where every sample is "no data".
    pub fn no_data(width: usize, height: usize) -> Self {
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

    /// Sample at column `x`, row `y`, or `None` outside the raster.
    pub fn sample(&self, x: usize, y: usize) -> Option<f32> {
        self.data.get([y, x]).copied()
    }

    /// True when every sample is "no data".
    pub fn is_no_data(&self) -> bool {
        self.data.iter().all(|v| v.is_nan())
    }

    /// Minimum and maximum of the valid (non-NaN) samples.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_range_skips_no_data() {
        let mut data = Array2::from_elem((2, 2), f32::NAN);
        data[[0, 1]] = 0.25;
        data[[1, 0]] = 0.75;
        let raster = Raster::new(data);
        assert_eq!(raster.value_range(), Some((0.25, 0.75)));
        assert!(!raster.is_no_data());
    }

    #[test]
    fn no_data_raster_has_requested_shape() {
        let raster = Raster::no_data(5, 3);
        assert_eq!(raster.width(), 5);
        assert_eq!(raster.height(), 3);
        assert!(raster.is_no_data());
        assert_eq!(raster.value_range(), None);
    }
}
