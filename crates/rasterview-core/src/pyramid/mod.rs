//! Multi-resolution raster pyramid: an immutable [`PyramidModel`], injected
//! [`LevelDerivation`] strategies, and the caching [`PyramidSource`].

pub mod cancel;
pub mod derivation;
pub mod model;
pub mod source;

pub use cancel::CancelToken;
pub use derivation::{
    from_kind, Downsample, FnDerivation, LevelDerivation, NoData, Rescale, Stretch,
};
pub use model::PyramidModel;
pub use source::{LevelState, PyramidSource};
