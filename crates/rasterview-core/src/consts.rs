/// Extension of the model bounds (in view pixels) on every side, so the user
/// can scroll slightly past the data edge.
pub const MODEL_BOUNDS_EXTENSION: f64 = 10.0;

/// Maximum scrollbar value. Scroll positions are quantized into `0..=MAX`.
pub const MAX_SCROLL_VALUE: i32 = 10_000;

/// Smallest zoom factor a viewport accepts. Non-positive or NaN zoom requests
/// are clamped up to this value.
pub const MIN_ZOOM_FACTOR: f64 = 1e-9;

/// Largest zoom factor a viewport accepts.
pub const MAX_ZOOM_FACTOR: f64 = 1e9;

/// Zoom multiplier applied per mouse-wheel notch.
pub const DEFAULT_WHEEL_ZOOM_STEP: f64 = 1.1;

/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Automatic level counts stop once the coarsest level fits in a tile of
/// this many pixels per side.
pub const AUTO_LEVEL_TILE_SIZE: usize = 256;

/// Default initial view width in device pixels.
pub const DEFAULT_VIEW_WIDTH: f64 = 800.0;

/// Default initial view height in device pixels.
pub const DEFAULT_VIEW_HEIGHT: f64 = 600.0;
