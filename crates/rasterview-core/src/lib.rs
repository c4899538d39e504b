pub mod config;
pub mod consts;
pub mod error;
pub mod io;
pub mod pyramid;
pub mod raster;
pub mod render;
pub mod scroll;
pub mod viewport;
