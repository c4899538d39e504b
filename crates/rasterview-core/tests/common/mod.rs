#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ndarray::Array2;

use rasterview_core::error::Result;
use rasterview_core::pyramid::{
    derivation::downsample, CancelToken, LevelDerivation, PyramidModel,
};
use rasterview_core::raster::Raster;

/// Raster whose sample at (x, y) is `y * width + x`, like the counting
/// fixture the level tests compare against.
pub fn ramp_raster(width: usize, height: usize) -> Raster {
    let data = Array2::from_shape_fn((height, width), |(y, x)| (y * width + x) as f32);
    Raster::new(data)
}

/// Raster with every sample set to `value`.
pub fn flat_raster(width: usize, height: usize, value: f32) -> Raster {
    Raster::new(Array2::from_elem((height, width), value))
}

/// Downsampling derivation that counts its invocations.
#[derive(Default)]
pub struct CountingDerivation {
    pub calls: AtomicUsize,
    /// Sleep inside `derive` to widen the window for concurrent requests.
    pub delay_ms: u64,
}

impl CountingDerivation {
    pub fn with_delay(delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay_ms,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LevelDerivation for CountingDerivation {
    fn name(&self) -> &str {
        "counting"
    }

    fn derive(
        &self,
        base: &Raster,
        level: usize,
        model: &PyramidModel,
        cancel: &CancelToken,
    ) -> Result<Raster> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            std::thread::sleep(std::time::Duration::from_millis(self.delay_ms));
        }
        downsample(base, level, model, cancel)
    }
}

pub fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected}, got {actual} (tolerance {tol})"
    );
}
