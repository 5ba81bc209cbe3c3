//! The localization engine: applies DMI climate-grid cell values to the pixels
//! of an ETF raster that fall inside each cell's footprint.
//!
//! The output is a Float32 GeoTIFF aligned with the source. It starts as all
//! nodata and is filled one cell window at a time with a read-modify-write, so
//! pixels outside a footprint keep whatever an earlier cell wrote there.
use chrono::NaiveDate;
use ndarray::{Array2, Zip};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::geometry::{
    CellFootprint, PixelWindow, footprint_mask, polygon_bounds, polygon_intersects_bounds, ring_to_polygon,
    window_for_bounds,
};
use crate::core::params::LocalizationParams;
use crate::core::processing::postprocess::{constrict_dynamic_range, smooth_nodata_pixels};
use crate::error::Result;
use crate::io::dmi::GridCell;
use crate::io::gdal::{EtfRaster, Reprojector, read_window_as};
use crate::io::writers::{
    Provenance, create_aligned_f32, embed_provenance, tiff, write_json_sidecar,
};
use crate::types::{DEFAULT_NODATA, PatchMode};

/// Counters describing one localization run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocalizationReport {
    pub cells_total: usize,
    /// Cells whose footprint misses the raster
    pub cells_outside: usize,
    /// Cells over a part of the raster that is entirely nodata
    pub cells_all_nodata: usize,
    pub cells_applied: usize,
    pub pixels_written: usize,
    pub pixels_clamped: usize,
    pub pixels_smoothed: usize,
}

/// The grid file the cells were read from, recorded in the output's provenance
#[derive(Debug, Clone, Default)]
pub struct GridSource {
    pub date: Option<NaiveDate>,
    pub file: Option<PathBuf>,
}

#[inline]
fn is_valid_source(v: f64, nodata: Option<f64>) -> bool {
    !v.is_nan() && nodata != Some(v)
}

/// Reproject every cell ring from EPSG:4326 into the raster CRS
pub fn project_cells<'a>(
    cells: &'a [GridCell],
    reprojector: &Reprojector,
) -> Result<Vec<CellFootprint<'a>>> {
    cells
        .iter()
        .map(|cell| -> Result<CellFootprint<'a>> {
            let ring = reprojector.transform_ring(&cell.ring)?;
            Ok(CellFootprint {
                cell,
                polygon: ring_to_polygon(&ring),
            })
        })
        .collect()
}

/// Apply one cell to a window.
///
/// `current` is the output window as written so far; every pixel where `mask` is set
/// and `source` holds a valid value is replaced. Values are computed from `source`
/// only. Returns the number of pixels written.
pub fn patch_window(
    source: &Array2<f64>,
    source_nodata: Option<f64>,
    mask: &Array2<bool>,
    current: &mut Array2<f32>,
    value: f64,
    mode: PatchMode,
    etf_scale: f64,
) -> usize {
    let mut written = 0usize;
    Zip::from(current)
        .and(source)
        .and(mask)
        .for_each(|out, &etf, &inside| {
            if !inside || !is_valid_source(etf, source_nodata) {
                return;
            }
            *out = match mode {
                PatchMode::Scale => (etf * value / etf_scale) as f32,
                PatchMode::Overwrite => value as f32,
            };
            written += 1;
        });
    written
}

/// Localize `src` with `cells` and write the result to `output`
pub fn localize_raster(
    src: &EtfRaster,
    cells: &[GridCell],
    output: &Path,
    params: &LocalizationParams,
    source: &GridSource,
) -> Result<LocalizationReport> {
    params.validate()?;
    let meta = &src.metadata;
    if params.band > meta.bands {
        return Err(crate::io::RasterError::BandOutOfRange {
            index: params.band,
            bands: meta.bands,
        }
        .into());
    }

    let mut report = LocalizationReport {
        cells_total: cells.len(),
        ..Default::default()
    };

    let reprojector = src.reprojector_from_wgs84()?;
    let extent = src.extent();
    let footprints: Vec<CellFootprint> = project_cells(cells, &reprojector)?
        .into_iter()
        .filter(|fp| polygon_intersects_bounds(&fp.polygon, &extent))
        .collect();
    report.cells_outside = cells.len() - footprints.len();
    if footprints.is_empty() {
        warn!(
            "None of the {} cells overlap {:?}; output will be all nodata",
            cells.len(),
            meta.path
        );
    }

    let source_nodata = meta.nodata;
    let out_nodata = source_nodata.unwrap_or(DEFAULT_NODATA);
    let nodata_f32 = out_nodata as f32;
    let mut out_ds = create_aligned_f32(output, meta, out_nodata)?;
    let size = (meta.size_x, meta.size_y);

    for fp in &footprints {
        let Some(window) =
            polygon_bounds(&fp.polygon).and_then(|b| window_for_bounds(&meta.geotransform, size, &b))
        else {
            report.cells_outside += 1;
            continue;
        };

        let etf = src.read_window(params.band, &window)?;
        if etf.iter().all(|&v| !is_valid_source(v, source_nodata)) {
            debug!("Cell {}: window {:?} is all nodata, skipping", fp.cell.cell_id, window);
            report.cells_all_nodata += 1;
            continue;
        }

        let mask = footprint_mask(&meta.geotransform, &window, &fp.polygon);
        let mut current = read_window_as::<f32>(&out_ds, 1, &window)?;
        let written = patch_window(
            &etf,
            source_nodata,
            &mask,
            &mut current,
            fp.cell.value,
            params.mode,
            params.etf_scale,
        );
        tiff::write_window(&out_ds, 1, &window, &current)?;

        debug!(
            "Cell {} (value {}): {} pixels in window {:?}",
            fp.cell.cell_id, fp.cell.value, written, window
        );
        report.cells_applied += 1;
        report.pixels_written += written;
    }

    if params.dynamic_range.is_some() || params.smooth_nodata {
        let mut band = read_window_as::<f32>(
            &out_ds,
            1,
            &PixelWindow {
                col_off: 0,
                row_off: 0,
                cols: meta.size_x,
                rows: meta.size_y,
            },
        )?;
        if let Some(range) = params.dynamic_range {
            report.pixels_clamped = constrict_dynamic_range(&mut band, nodata_f32, range)?;
        }
        if params.smooth_nodata {
            let (smoothed, filled) = smooth_nodata_pixels(&band, nodata_f32);
            band = smoothed;
            report.pixels_smoothed = filled;
        }
        tiff::write_band(&out_ds, 1, &band)?;
    }

    let provenance = Provenance {
        mode: params.mode.to_string(),
        parameter: Some(params.parameter.clone()),
        date: source.date,
        grid_file: source.file.clone(),
        etf_scale: (params.mode == PatchMode::Scale).then_some(params.etf_scale),
        multiplier: None,
        source_raster: Some(meta.path.clone()),
        cells_applied: Some(report.cells_applied),
    };
    embed_provenance(&mut out_ds, &provenance)?;
    drop(out_ds);

    if params.sidecar {
        let report_json = serde_json::to_value(&report).map_err(crate::Error::external)?;
        write_json_sidecar(output, &provenance, report_json)?;
    }

    info!(
        "Localized {:?} -> {:?}: {}/{} cells applied, {} px written, {} clamped, {} smoothed",
        meta.path,
        output,
        report.cells_applied,
        report.cells_total,
        report.pixels_written,
        report.pixels_clamped,
        report.pixels_smoothed
    );
    Ok(report)
}
