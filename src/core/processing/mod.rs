//! Processing routines behind the `api` entry points.
pub mod localize;
pub mod ops;
pub mod postprocess;
pub mod rasterize;

pub use localize::{GridSource, LocalizationReport, localize_raster, patch_window, project_cells};
pub use ops::scale_raster;
pub use postprocess::{constrict_dynamic_range, smooth_nodata_pixels};
pub use rasterize::{RasterizedGrid, rasterize_cells, write_rasterized};
