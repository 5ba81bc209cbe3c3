#![doc = r#"
etlocal: localization of Landsat ETF rasters with DMI climate grids.

An ETF (evapotranspiration fraction) raster says how much of the potential
evapotranspiration a pixel achieves. The Danish Meteorological Institute's 10km
climate grid supplies, per day and per cell, the potential evaporation itself. This
crate joins the two: every valid ETF pixel whose centre falls inside a grid cell is
rewritten as `etf * cell_value / etf_scale`, giving an absolute ET estimate. It powers
the etlocal CLI and can be embedded in your own Rust applications.

Requirements
------------
- GDAL development headers and runtime available on your system.
- `gdalwarp` on `PATH` for reprojection to EPSG:4326.
- Rust 2024 edition toolchain.

Quick start: localize one raster
--------------------------------
```rust,no_run
use std::path::Path;
use chrono::NaiveDate;
use etlocal::{localize_etf_to_path, LocalizationParams};

fn main() -> etlocal::Result<()> {
    let params = LocalizationParams::default(); // pot_evaporation_makkink, ETF * 10000
    let report = localize_etf_to_path(
        Path::new("/data/LC08_193022_20230601_etf.tif"),
        NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
        Path::new("/data/dmi/grid"),
        Path::new("/out/et_20230601.tif"),
        &params,
    )?;
    println!("{} cells applied, {} pixels written", report.cells_applied, report.pixels_written);
    Ok(())
}
```

Working with grid files directly
--------------------------------
```rust,no_run
use std::path::Path;
use etlocal::{read_grid_file, rasterize_cells, GridFilter};

fn main() -> etlocal::Result<()> {
    let cells = read_grid_file(Path::new("/data/dmi/grid/2023-06-01.txt"), Some("mean_temp"))?;
    let manual = GridFilter::new().with("qcStatus", ["manual"]);
    let checked: Vec<_> = cells.into_iter().filter(|c| manual.matches(c)).collect();
    let grid = rasterize_cells(&checked, 0.001, 0.0)?;
    println!("{}x{} px", grid.cols(), grid.rows());
    Ok(())
}
```

Error handling
--------------
All public functions return `etlocal::Result<T>`; match on `etlocal::Error` to handle
specific cases, e.g. a missing grid file for a date or a GDAL failure.

```rust,no_run
use std::path::Path;
use chrono::NaiveDate;
use etlocal::{localize_etf_to_path, Error, GridError, LocalizationParams};

fn main() {
    let date = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
    let params = LocalizationParams::default();
    match localize_etf_to_path(Path::new("etf.tif"), date, Path::new("grid"), Path::new("out.tif"), &params) {
        Ok(report) => println!("{:?}", report),
        Err(Error::Grid(GridError::MissingDate(d))) => eprintln!("no climate data for {d}"),
        Err(Error::Raster(e)) => eprintln!("raster error: {e}"),
        Err(other) => eprintln!("other error: {other}"),
    }
}
```

Useful modules
--------------
- [`api`]: high-level entry points.
- [`core`]: geometry, parameters and the localization engine.
- [`io`]: grid file parsing, the dated archive, GDAL readers/writers.
- [`error`]: crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use core::params::LocalizationParams;
pub use core::processing::localize::{GridSource, LocalizationReport};
pub use error::{Error, Result};
pub use types::{PatchMode, ResampleMethod};

// Readers
pub use io::archive::{FilterReport, GridArchive, GridFilter};
pub use io::dmi::{GridCell, GridError, parse_record, read_grid_file};
pub use io::gdal::{EtfRaster, RasterError, RasterMetadata, Reprojector};

// Processing
pub use core::processing::{
    RasterizedGrid, constrict_dynamic_range, localize_raster, rasterize_cells,
    smooth_nodata_pixels,
};

// High-level API re-exports
pub use api::{
    BatchReport, LocalizationJob, build_pet_raster_to_path, filter_grid_directory, load_jobs,
    localize_batch, localize_etf_to_path, lookup_grid_value, overlapping_cells,
    rasterize_grid_file_to_path, scale_raster_to_path, warp_raster_to_epsg4326,
};
