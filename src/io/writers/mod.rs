//! Output rasters: aligned Float32 GeoTIFF creation and windowed writes (`tiff`),
//! provenance metadata items and JSON sidecars (`metadata`).
pub mod metadata;
pub mod tiff;

pub use metadata::{Provenance, embed_provenance, write_json_sidecar};
pub use tiff::{create_aligned_f32, create_epsg4326_f32, write_band, write_window};
