//! Core building blocks: raster and grid geometry, CRS transforms, the
//! processing stages (resize, reproject, pansharpen, normalize) and the
//! pipeline that chains them. Consumed by the high-level `api` module.
pub mod geometry;
pub mod params;
pub mod processing;
pub mod projection;
pub mod raster;
