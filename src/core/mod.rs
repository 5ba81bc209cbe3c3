//! Core building blocks: footprint geometry, localization parameters, and the
//! processing routines (localization, post-processing, rasterization, scaling)
//! consumed by the high-level `api` module.
pub mod geometry;
pub mod params;
pub mod processing;
