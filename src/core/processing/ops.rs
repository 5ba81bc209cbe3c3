use ndarray::Array2;
use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};
use crate::io::gdal::{EtfRaster, RasterError};
use crate::io::writers::{Provenance, create_aligned_f32, embed_provenance, write_band};
use crate::types::DEFAULT_NODATA;

/// Element-wise `data * multiplier` for valid pixels; nodata and NaN pixels become `out_nodata`
pub fn multiply_valid(
    data: &Array2<f64>,
    nodata: Option<f64>,
    multiplier: f64,
    out_nodata: f32,
) -> Array2<f32> {
    data.mapv(|v| {
        if v.is_nan() || nodata == Some(v) {
            out_nodata
        } else {
            (v * multiplier) as f32
        }
    })
}

/// Multiply a whole band by one value and write it as Float32 with the same geo-referencing
pub fn scale_raster(src: &EtfRaster, multiplier: f64, output: &Path, band: usize) -> Result<()> {
    if !multiplier.is_finite() {
        return Err(Error::invalid("multiplier", multiplier));
    }
    let meta = &src.metadata;
    if band == 0 || band > meta.bands {
        return Err(RasterError::BandOutOfRange {
            index: band,
            bands: meta.bands,
        }
        .into());
    }

    let data = src.read_band(band)?;
    let out_nodata = meta.nodata.unwrap_or(DEFAULT_NODATA);
    let scaled = multiply_valid(&data, meta.nodata, multiplier, out_nodata as f32);

    let mut ds = create_aligned_f32(output, meta, out_nodata)?;
    write_band(&ds, 1, &scaled)?;
    let mut provenance = Provenance::new("multiply");
    provenance.multiplier = Some(multiplier);
    provenance.source_raster = Some(meta.path.clone());
    embed_provenance(&mut ds, &provenance)?;

    info!("Scaled {:?} by {} -> {:?}", meta.path, multiplier, output);
    Ok(())
}
