use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use ndarray::Array2;
use std::path::Path;
use tracing::debug;

use crate::core::geometry::PixelWindow;
use crate::io::gdal::{RasterError, RasterMetadata};

// Rows per strip when pre-filling a new band with nodata
const FILL_STRIP_ROWS: usize = 256;

fn create_f32(path: &Path, cols: usize, rows: usize, nodata: f64) -> Result<Dataset, RasterError> {
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let ds = driver.create_with_band_type::<f32, _>(path, cols, rows, 1)?;
    {
        let mut band = ds.rasterband(1)?;
        band.set_no_data_value(Some(nodata))?;
        let mut row_off = 0;
        while row_off < rows {
            let strip = FILL_STRIP_ROWS.min(rows - row_off);
            let mut buf = Buffer::new((cols, strip), vec![nodata as f32; cols * strip]);
            band.write((0, row_off as isize), (cols, strip), &mut buf)?;
            row_off += strip;
        }
    }
    debug!("Created {}x{} Float32 GTiff {:?} (nodata={})", cols, rows, path, nodata);
    Ok(ds)
}

/// Single-band Float32 GTiff on the same grid as `source`, every pixel set to `nodata`
pub fn create_aligned_f32(
    path: &Path,
    source: &RasterMetadata,
    nodata: f64,
) -> Result<Dataset, RasterError> {
    let mut ds = create_f32(path, source.size_x, source.size_y, nodata)?;
    ds.set_geo_transform(&source.geotransform)?;
    ds.set_projection(&source.wkt)?;
    Ok(ds)
}

/// Single-band Float32 GTiff in EPSG:4326, every pixel set to `nodata`
pub fn create_epsg4326_f32(
    path: &Path,
    geotransform: [f64; 6],
    cols: usize,
    rows: usize,
    nodata: f64,
) -> Result<Dataset, RasterError> {
    let mut ds = create_f32(path, cols, rows, nodata)?;
    ds.set_geo_transform(&geotransform)?;
    ds.set_spatial_ref(&SpatialRef::from_epsg(4326)?)?;
    Ok(ds)
}

/// Write `data` (shape rows x cols) into `window` of band `index`
pub fn write_window(
    ds: &Dataset,
    index: usize,
    window: &PixelWindow,
    data: &Array2<f32>,
) -> Result<(), RasterError> {
    if data.dim() != (window.rows, window.cols) {
        return Err(RasterError::DimensionMismatch(window.cols, window.rows, data.len()));
    }
    let mut band = ds.rasterband(index)?;
    let mut buf = Buffer::new(window.size(), data.iter().copied().collect());
    band.write(window.offset(), window.size(), &mut buf)?;
    Ok(())
}

/// Write a whole band; `data` must match the dataset's raster size
pub fn write_band(ds: &Dataset, index: usize, data: &Array2<f32>) -> Result<(), RasterError> {
    let (rows, cols) = data.dim();
    let (size_x, size_y) = ds.raster_size();
    if (cols, rows) != (size_x, size_y) {
        return Err(RasterError::DimensionMismatch(size_x, size_y, data.len()));
    }
    let window = PixelWindow {
        col_off: 0,
        row_off: 0,
        cols,
        rows,
    };
    write_window(ds, index, &window, data)
}
