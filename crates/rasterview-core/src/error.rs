use thiserror::Error;

#[derive(Error, Debug)]
pub enum RasterViewError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Invalid pyramid: {0}")]
    InvalidPyramid(String),

    #[error("Pyramid level {level} out of range (level count: {level_count})")]
    LevelOutOfRange { level: usize, level_count: usize },

    #[error("Derivation of level {level} failed: {message}")]
    Derivation { level: usize, message: String },

    #[error("Derivation of level {level} was cancelled")]
    Cancelled { level: usize },

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, RasterViewError>;
