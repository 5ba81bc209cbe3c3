//! I/O layer for DMI climate grids and GDAL-backed rasters.
//! Provides the `dmi` record parser, the dated grid `archive`, `gdal` raster
//! adapters, and `writers` for GeoTIFF outputs and provenance metadata.
pub mod dmi;
pub use dmi::{GridCell, GridError, parse_record, read_grid_file};

pub mod archive;
pub use archive::{FilterReport, GridArchive, GridFilter, filter_directory, path_for_date};

pub mod gdal;
pub use gdal::{EtfRaster, RasterError, RasterMetadata, Reprojector, warp_to_epsg4326};

pub mod writers;
