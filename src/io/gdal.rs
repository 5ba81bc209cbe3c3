use gdal::raster::{Buffer, GdalType, ResampleAlg};
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use gdal::{Dataset, errors::GdalError as GdalCrateError};
use geo::Polygon;
use ndarray::Array2;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::geometry::{Bounds, PixelWindow, is_north_up, raster_extent, ring_to_polygon};
use crate::types::ResampleMethod;

/// Errors encountered when reading or transforming rasters through GDAL
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalCrateError),
    #[error("Raster has no spatial reference: {0:?}")]
    MissingSpatialRef(PathBuf),
    #[error("Unsupported raster: {0}")]
    Unsupported(String),
    #[error("Band index {index} out of range (raster has {bands})")]
    BandOutOfRange { index: usize, bands: usize },
    #[error("Dimension mismatch: expected {0}x{1}, got {2} values")]
    DimensionMismatch(usize, usize, usize),
    #[error("gdalwarp failed: {0}")]
    Warp(String),
}

/// Geo-referencing and layout of an opened raster
#[derive(Debug, Clone)]
pub struct RasterMetadata {
    pub path: PathBuf,
    /// Width (pixels) of the raster
    pub size_x: usize,
    /// Height (lines) of the raster
    pub size_y: usize,
    pub bands: usize,
    /// Affine geotransform coefficients ([origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height])
    pub geotransform: [f64; 6],
    /// `EPSG:XXXX` when an authority code is present, WKT otherwise
    pub projection: String,
    /// Raw WKT as reported by GDAL
    pub wkt: String,
    /// Nodata value of band 1
    pub nodata: Option<f64>,
}

impl RasterMetadata {
    pub fn extent(&self) -> Bounds {
        raster_extent(&self.geotransform, (self.size_x, self.size_y))
    }

    pub fn is_epsg4326(&self) -> bool {
        self.projection == "EPSG:4326"
    }
}

// Helper to extract EPSG code from WKT authority tag
fn parse_epsg(wkt: &str) -> Option<String> {
    const KEYS: [&str; 2] = ["AUTHORITY[\"EPSG\",\"", "ID[\"EPSG\","];
    for key in KEYS {
        if let Some(idx) = wkt.rfind(key) {
            let start = idx + key.len();
            let code: String = wkt[start..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if !code.is_empty() {
                return Some(format!("EPSG:{}", code));
            }
        }
    }
    None
}

/// GDAL-backed reader for ETF (and any other single-variable) rasters
pub struct EtfRaster {
    pub dataset: Dataset,
    pub metadata: RasterMetadata,
}

impl EtfRaster {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RasterError> {
        let path = path.as_ref();
        let dataset = Dataset::open(path)?;
        let (size_x, size_y) = dataset.raster_size();
        let bands = dataset.raster_count() as usize;
        if bands == 0 {
            return Err(RasterError::Unsupported("No raster bands found".into()));
        }
        let geotransform = dataset.geo_transform()?;
        if !is_north_up(&geotransform) {
            return Err(RasterError::Unsupported(format!(
                "{:?} is not north-up (geotransform {:?})",
                path, geotransform
            )));
        }
        let wkt = dataset.projection();
        if wkt.trim().is_empty() {
            return Err(RasterError::MissingSpatialRef(path.to_path_buf()));
        }
        let projection = parse_epsg(&wkt).unwrap_or_else(|| wkt.clone());
        let nodata = dataset.rasterband(1)?.no_data_value();

        debug!(
            "Opened {:?}: {}x{} px, {} band(s), {}, nodata={:?}",
            path, size_x, size_y, bands, projection, nodata
        );
        Ok(EtfRaster {
            dataset,
            metadata: RasterMetadata {
                path: path.to_path_buf(),
                size_x: size_x as usize,
                size_y: size_y as usize,
                bands,
                geotransform,
                projection,
                wkt,
                nodata,
            },
        })
    }

    pub fn extent(&self) -> Bounds {
        self.metadata.extent()
    }

    pub fn spatial_ref(&self) -> Result<SpatialRef, RasterError> {
        Ok(self.dataset.spatial_ref()?)
    }

    fn check_band(&self, index: usize) -> Result<(), RasterError> {
        if index == 0 || index > self.metadata.bands {
            return Err(RasterError::BandOutOfRange {
                index,
                bands: self.metadata.bands,
            });
        }
        Ok(())
    }

    /// Read a window of a band (1-based index) as an f64 array of shape (rows, cols)
    pub fn read_window(&self, index: usize, window: &PixelWindow) -> Result<Array2<f64>, RasterError> {
        self.check_band(index)?;
        read_window_as::<f64>(&self.dataset, index, window)
    }

    /// Read a whole band (1-based index) as an f64 array of shape (height, width)
    pub fn read_band(&self, index: usize) -> Result<Array2<f64>, RasterError> {
        let window = PixelWindow {
            col_off: 0,
            row_off: 0,
            cols: self.metadata.size_x,
            rows: self.metadata.size_y,
        };
        self.read_window(index, &window)
    }

    /// Transformer from EPSG:4326 (lon, lat) into this raster's CRS
    pub fn reprojector_from_wgs84(&self) -> Result<Reprojector, RasterError> {
        Reprojector::from_epsg4326_to(&self.spatial_ref()?)
    }

    /// Raster extent as a lon/lat polygon
    pub fn footprint_in_wgs84(&self) -> Result<Polygon<f64>, RasterError> {
        let to_wgs84 = Reprojector::to_epsg4326(&self.spatial_ref()?)?;
        to_wgs84.transform_bounds(&self.extent())
    }
}

/// Read a band window of any GDAL dataset into an ndarray
pub fn read_window_as<T: GdalType + Copy>(
    dataset: &Dataset,
    index: usize,
    window: &PixelWindow,
) -> Result<Array2<T>, RasterError> {
    let band = dataset.rasterband(index)?;
    let buf: Buffer<T> = band.read_as(
        window.offset(),
        window.size(),
        window.size(),
        Some(ResampleAlg::NearestNeighbour),
    )?;
    let data = buf.data().to_vec();
    let len = data.len();
    Array2::from_shape_vec((window.rows, window.cols), data)
        .map_err(|_| RasterError::DimensionMismatch(window.cols, window.rows, len))
}

/// Coordinate transformation with x=lon, y=lat axis order on geographic ends
pub struct Reprojector {
    transform: CoordTransform,
}

fn traditional(srs: &SpatialRef) -> SpatialRef {
    let mut srs = srs.clone();
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    srs
}

impl Reprojector {
    pub fn new(source: &SpatialRef, target: &SpatialRef) -> Result<Self, RasterError> {
        let source = traditional(source);
        let target = traditional(target);
        Ok(Self {
            transform: CoordTransform::new(&source, &target)?,
        })
    }

    pub fn from_epsg4326_to(target: &SpatialRef) -> Result<Self, RasterError> {
        Self::new(&SpatialRef::from_epsg(4326)?, target)
    }

    pub fn to_epsg4326(source: &SpatialRef) -> Result<Self, RasterError> {
        Self::new(source, &SpatialRef::from_epsg(4326)?)
    }

    pub fn transform_ring(&self, ring: &[(f64, f64)]) -> Result<Vec<(f64, f64)>, RasterError> {
        let mut xs: Vec<f64> = ring.iter().map(|p| p.0).collect();
        let mut ys: Vec<f64> = ring.iter().map(|p| p.1).collect();
        let mut zs = vec![0.0; ring.len()];
        self.transform.transform_coords(&mut xs, &mut ys, &mut zs)?;
        Ok(xs.into_iter().zip(ys).collect())
    }

    /// Transform the four corners of `bounds` into a (possibly rotated) polygon
    pub fn transform_bounds(&self, bounds: &Bounds) -> Result<Polygon<f64>, RasterError> {
        let corners = [
            (bounds.min_x, bounds.min_y),
            (bounds.max_x, bounds.min_y),
            (bounds.max_x, bounds.max_y),
            (bounds.min_x, bounds.max_y),
            (bounds.min_x, bounds.min_y),
        ];
        Ok(ring_to_polygon(&self.transform_ring(&corners)?))
    }
}

/// Reproject `input` to EPSG:4326 with gdalwarp. Returns `false` (and writes nothing)
/// when the raster already is in EPSG:4326.
pub fn warp_to_epsg4326(
    input: &Path,
    output: &Path,
    resample: ResampleMethod,
) -> Result<bool, RasterError> {
    let raster = EtfRaster::open(input)?;
    if raster.metadata.is_epsg4326() {
        info!("{:?} already in EPSG:4326, not warping", input);
        return Ok(false);
    }
    drop(raster);

    let args: Vec<String> = vec![
        "-of".into(),
        "GTiff".into(),
        "-overwrite".into(),
        "-r".into(),
        resample.gdal_name().into(),
        "-t_srs".into(),
        "EPSG:4326".into(),
        input.to_string_lossy().into_owned(),
        output.to_string_lossy().into_owned(),
    ];
    debug!("gdalwarp {}", args.join(" "));
    let status = Command::new("gdalwarp")
        .args(args.iter().map(|s| s.as_str()))
        .status()
        .map_err(|e| RasterError::Warp(format!("exec error: {}", e)))?;
    if !status.success() {
        let _ = std::fs::remove_file(output);
        return Err(RasterError::Warp(format!("exit status {}", status)));
    }
    info!("Warped {:?} -> {:?} (EPSG:4326)", input, output);
    Ok(true)
}
