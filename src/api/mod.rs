//! High-level library API: localize ETF rasters against a directory of DMI climate
//! grid files, burn PET rasters, rasterize and filter grid files, and the small
//! raster utilities around them. Prefer these entry points over the low-level
//! processing modules when integrating etlocal.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::geometry::{polygon_intersects_bounds, ring_to_polygon};
use crate::core::params::LocalizationParams;
use crate::core::processing::localize::{GridSource, LocalizationReport, localize_raster};
use crate::core::processing::ops::scale_raster;
use crate::core::processing::rasterize::{rasterize_cells, write_rasterized};
use crate::error::{Error, Result};
use crate::io::archive::{FilterReport, GridArchive, GridFilter, filter_directory};
use crate::io::dmi::{GridCell, read_grid_file};
use crate::io::gdal::{EtfRaster, warp_to_epsg4326};
use crate::io::writers::Provenance;
use crate::types::ResampleMethod;

/// Localize one ETF raster with the grid file for `date` found in `grid_dir`
pub fn localize_etf_to_path(
    etf: &Path,
    date: NaiveDate,
    grid_dir: &Path,
    output: &Path,
    params: &LocalizationParams,
) -> Result<LocalizationReport> {
    params.validate()?;
    let archive = GridArchive::open(grid_dir)?;
    let grid_file = archive.file_for_date(date)?.to_path_buf();
    let cells = read_grid_file(&grid_file, Some(&params.parameter))?;
    if cells.is_empty() {
        warn!(
            "{:?} has no `{}` records; output will be all nodata",
            grid_file, params.parameter
        );
    }

    let raster = EtfRaster::open(etf)?;
    let source = GridSource {
        date: Some(date),
        file: Some(grid_file),
    };
    localize_raster(&raster, &cells, output, params, &source)
}

/// Burn the raw `parameter` cell values onto the ETF raster's pixel grid
pub fn build_pet_raster_to_path(
    etf: &Path,
    date: NaiveDate,
    grid_dir: &Path,
    output: &Path,
    parameter: &str,
) -> Result<LocalizationReport> {
    let params = LocalizationParams::pet_raster(parameter);
    localize_etf_to_path(etf, date, grid_dir, output, &params)
}

/// Cells of `grid_file` for `parameter` whose footprint intersects the raster
pub fn overlapping_cells(etf: &Path, grid_file: &Path, parameter: &str) -> Result<Vec<GridCell>> {
    let raster = EtfRaster::open(etf)?;
    let reprojector = raster.reprojector_from_wgs84()?;
    let extent = raster.extent();

    let mut overlapping = Vec::new();
    for cell in read_grid_file(grid_file, Some(parameter))? {
        let ring = reprojector.transform_ring(&cell.ring)?;
        if polygon_intersects_bounds(&ring_to_polygon(&ring), &extent) {
            overlapping.push(cell);
        }
    }
    info!(
        "{} `{}` cells of {:?} overlap {:?}",
        overlapping.len(),
        parameter,
        grid_file,
        etf
    );
    Ok(overlapping)
}

/// Rasterize the `parameter` records of one grid file to an EPSG:4326 GeoTIFF
pub fn rasterize_grid_file_to_path(
    grid_file: &Path,
    parameter: &str,
    output: &Path,
    pixel_size: f64,
    nodata: f64,
) -> Result<usize> {
    let cells = read_grid_file(grid_file, Some(parameter))?;
    let grid = rasterize_cells(&cells, pixel_size, nodata)?;

    let mut provenance = Provenance::new("rasterize");
    provenance.parameter = Some(parameter.to_string());
    provenance.grid_file = Some(grid_file.to_path_buf());
    provenance.cells_applied = Some(grid.cells_burned);
    write_rasterized(output, &grid, &provenance)?;
    Ok(grid.cells_burned)
}

/// Copy the records of every grid file in `src_dir` that match `filter` into `out_dir`
pub fn filter_grid_directory(src_dir: &Path, out_dir: &Path, filter: &GridFilter) -> Result<FilterReport> {
    Ok(filter_directory(src_dir, out_dir, filter)?)
}

/// Value of one cell for `parameter` on `date`
pub fn lookup_grid_value(
    grid_dir: &Path,
    parameter: &str,
    date: NaiveDate,
    cell_id: &str,
) -> Result<Option<f64>> {
    GridArchive::open(grid_dir)?.lookup(parameter, date, cell_id)
}

/// Multiply a whole raster band by `multiplier`
pub fn scale_raster_to_path(input: &Path, output: &Path, multiplier: f64, band: usize) -> Result<()> {
    let raster = EtfRaster::open(input)?;
    scale_raster(&raster, multiplier, output, band)
}

/// Reproject `input` to EPSG:4326; `Ok(false)` when it already is
pub fn warp_raster_to_epsg4326(input: &Path, output: &Path, resample: ResampleMethod) -> Result<bool> {
    Ok(warp_to_epsg4326(input, output, resample)?)
}

/// One raster of a batch run together with its acquisition date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizationJob {
    pub etf: PathBuf,
    pub date: NaiveDate,
    /// Output file name inside the batch output directory; defaults to `<etf stem>_et.tif`
    #[serde(default)]
    pub output: Option<String>,
}

impl LocalizationJob {
    pub fn output_path(&self, output_dir: &Path) -> Result<PathBuf> {
        if let Some(name) = &self.output {
            return Ok(output_dir.join(name));
        }
        let stem = self
            .etf
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::invalid("etf", self.etf.display()))?;
        Ok(output_dir.join(format!("{}_et.tif", stem)))
    }
}

/// Read a JSON array of jobs
pub fn load_jobs<P: AsRef<Path>>(path: P) -> Result<Vec<LocalizationJob>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    serde_json::from_str(&text).map_err(Error::external)
}

/// Batch processing report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    /// Jobs without a grid file for their date
    pub skipped: usize,
    pub errors: usize,
}

/// Localize every job into `output_dir` with one archive index.
/// If `continue_on_error` is true, errors are counted in the report and processing continues; otherwise, the first error is returned.
pub fn localize_batch(
    jobs: &[LocalizationJob],
    grid_dir: &Path,
    output_dir: &Path,
    params: &LocalizationParams,
    continue_on_error: bool,
) -> Result<BatchReport> {
    params.validate()?;
    std::fs::create_dir_all(output_dir)?;
    let archive = GridArchive::open(grid_dir)?;

    let mut report = BatchReport::default();
    for job in jobs {
        let grid_file = match archive.file_for_date(job.date) {
            Ok(p) => p.to_path_buf(),
            Err(e) => {
                warn!("Skipping {:?}: {}", job.etf, e);
                report.skipped += 1;
                continue;
            }
        };

        let outcome = job.output_path(output_dir).and_then(|output| {
            let cells = read_grid_file(&grid_file, Some(&params.parameter))?;
            let raster = EtfRaster::open(&job.etf)?;
            let source = GridSource {
                date: Some(job.date),
                file: Some(grid_file.clone()),
            };
            localize_raster(&raster, &cells, &output, params, &source)
        });

        match outcome {
            Ok(_) => report.processed += 1,
            Err(e) => {
                report.errors += 1;
                warn!("Failed to localize {:?}: {}", job.etf, e);
                if !continue_on_error {
                    return Err(e);
                }
            }
        }
    }

    info!(
        "Batch finished: processed={} skipped={} errors={}",
        report.processed, report.skipped, report.errors
    );
    Ok(report)
}
