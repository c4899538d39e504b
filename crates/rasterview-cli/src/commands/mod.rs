pub mod config;
pub mod info;
pub mod render;
pub mod scroll;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use kurbo::Rect;
use rasterview_core::config::{PyramidConfig, ViewerConfig};
use rasterview_core::consts::AUTO_LEVEL_TILE_SIZE;
use rasterview_core::io::image_io::load_raster;
use rasterview_core::pyramid::{from_kind, PyramidModel, PyramidSource};
use rasterview_core::viewport::Viewport;
use tracing::debug;

/// Read a TOML viewer config, or fall back to defaults.
pub fn load_config(path: Option<&PathBuf>) -> Result<ViewerConfig> {
    let Some(path) = path else {
        return Ok(ViewerConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&contents).context("Invalid viewer config")
}

/// Load an image and wrap it in a pyramid source built from `config`.
pub fn open_source(file: &Path, config: &PyramidConfig) -> Result<PyramidSource> {
    let raster =
        load_raster(file).with_context(|| format!("Failed to load {}", file.display()))?;
    let levels = config.levels.unwrap_or_else(|| {
        PyramidModel::auto_level_count(raster.width(), raster.height(), AUTO_LEVEL_TILE_SIZE)
    });
    debug!(
        width = raster.width(),
        height = raster.height(),
        levels,
        derivation = %config.derivation,
        "Opening pyramid source"
    );
    PyramidSource::new(raster, levels, from_kind(&config.derivation))
        .context("Failed to build pyramid")
}

/// Viewport of `width × height` showing the whole model.
pub fn fitted_viewport(width: f64, height: f64, source: &PyramidSource) -> Viewport {
    let mut viewport = Viewport::new(Rect::new(0.0, 0.0, width, height));
    viewport.zoom_all(source.model().model_bounds());
    viewport
}

/// Parse exactly `N` comma-separated numbers, e.g. `"10,20"`.
pub fn parse_floats<const N: usize>(s: &str) -> Result<[f64; N]> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid number list '{s}'"))?;
    match <[f64; N]>::try_from(values) {
        Ok(array) => Ok(array),
        Err(values) => bail!("Expected {N} values, got {} in '{s}'", values.len()),
    }
}
