//! Burns climate-grid cells into a standalone EPSG:4326 raster.
use ndarray::{Array2, Zip};
use std::path::Path;
use tracing::info;

use crate::core::geometry::{
    Bounds, ceil_snapped, footprint_mask, polygon_bounds, ring_to_polygon, window_for_bounds,
};
use crate::error::{Error, Result};
use crate::io::dmi::GridCell;
use crate::io::writers::{Provenance, create_epsg4326_f32, embed_provenance, write_band};

/// Default pixel size in degrees
pub const DEFAULT_PIXEL_SIZE: f64 = 0.0001;

/// Value of pixels covered by no cell
pub const DEFAULT_RASTER_NODATA: f64 = 0.0;

/// A lon/lat grid of cell values
#[derive(Debug, Clone)]
pub struct RasterizedGrid {
    /// Shape (rows, cols)
    pub data: Array2<f32>,
    pub geotransform: [f64; 6],
    pub nodata: f64,
    pub cells_burned: usize,
}

impl RasterizedGrid {
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }
}

/// Rasterize `cells` at `pixel_size` degrees. A pixel takes the value of the last cell
/// containing its centre; pixels in no cell hold `nodata`.
pub fn rasterize_cells(cells: &[GridCell], pixel_size: f64, nodata: f64) -> Result<RasterizedGrid> {
    if !pixel_size.is_finite() || pixel_size <= 0.0 {
        return Err(Error::invalid("pixel_size", pixel_size));
    }
    let extent = Bounds::from_points(cells.iter().flat_map(|c| c.ring.iter().copied())).ok_or(
        Error::MissingArgument {
            arg: "cells".to_string(),
        },
    )?;

    let cols = (ceil_snapped(extent.width() / pixel_size) as usize).max(1);
    let rows = (ceil_snapped(extent.height() / pixel_size) as usize).max(1);
    // grid is anchored at the lower-left corner; the top edge snaps to a whole pixel
    let max_y = extent.min_y + rows as f64 * pixel_size;
    let geotransform = [extent.min_x, pixel_size, 0.0, max_y, 0.0, -pixel_size];

    let mut data = Array2::from_elem((rows, cols), nodata as f32);
    let mut cells_burned = 0usize;
    for cell in cells {
        let polygon = ring_to_polygon(&cell.ring);
        let Some(window) =
            polygon_bounds(&polygon).and_then(|b| window_for_bounds(&geotransform, (cols, rows), &b))
        else {
            continue;
        };
        let mask = footprint_mask(&geotransform, &window, &polygon);
        let value = cell.value as f32;
        let mut target = data.slice_mut(ndarray::s![
            window.row_off..window.row_off + window.rows,
            window.col_off..window.col_off + window.cols
        ]);
        Zip::from(&mut target).and(&mask).for_each(|px, &inside| {
            if inside {
                *px = value;
            }
        });
        cells_burned += 1;
    }

    Ok(RasterizedGrid {
        data,
        geotransform,
        nodata,
        cells_burned,
    })
}

/// Write a rasterized grid as a single-band Float32 GeoTIFF in EPSG:4326
pub fn write_rasterized(path: &Path, grid: &RasterizedGrid, provenance: &Provenance) -> Result<()> {
    let mut ds = create_epsg4326_f32(path, grid.geotransform, grid.cols(), grid.rows(), grid.nodata)?;
    write_band(&ds, 1, &grid.data)?;
    embed_provenance(&mut ds, provenance)?;
    info!(
        "Rasterized {} cells into {}x{} px {:?}",
        grid.cells_burned,
        grid.cols(),
        grid.rows(),
        path
    );
    Ok(())
}
