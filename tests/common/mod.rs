#![allow(dead_code)]

use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager, Metadata};
use std::path::Path;

pub const ND: f64 = -9999.0;

/// Write a single-band Float32 GeoTIFF; `data` is row-major, `cols * rows` long
pub fn write_raster(
    path: &Path,
    epsg: u32,
    gt: [f64; 6],
    cols: usize,
    rows: usize,
    data: Vec<f32>,
    nodata: Option<f64>,
) {
    assert_eq!(data.len(), cols * rows);
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut ds = driver
        .create_with_band_type::<f32, _>(path, cols, rows, 1)
        .unwrap();
    ds.set_geo_transform(&gt).unwrap();
    ds.set_spatial_ref(&SpatialRef::from_epsg(epsg).unwrap()).unwrap();
    let mut band = ds.rasterband(1).unwrap();
    if let Some(nd) = nodata {
        band.set_no_data_value(Some(nd)).unwrap();
    }
    let mut buf = Buffer::new((cols, rows), data);
    band.write((0, 0), (cols, rows), &mut buf).unwrap();
}

pub struct Output {
    pub cols: usize,
    pub rows: usize,
    pub data: Vec<f32>,
    pub nodata: Option<f64>,
    pub geotransform: [f64; 6],
    pub dataset: Dataset,
}

impl Output {
    pub fn at(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> Vec<f32> {
        self.data[row * self.cols..(row + 1) * self.cols].to_vec()
    }

    pub fn metadata(&self, key: &str) -> Option<String> {
        self.dataset.metadata_item(key, "")
    }
}

pub fn read_output(path: &Path) -> Output {
    let dataset = Dataset::open(path).unwrap();
    let (cols, rows) = dataset.raster_size();
    let band = dataset.rasterband(1).unwrap();
    let nodata = band.no_data_value();
    let buf = band
        .read_as::<f32>((0, 0), (cols, rows), (cols, rows), None)
        .unwrap();
    let data = buf.data().to_vec();
    let geotransform = dataset.geo_transform().unwrap();
    drop(band);
    Output {
        cols,
        rows,
        data,
        nodata,
        geotransform,
        dataset,
    }
}

/// One DMI grid file line with a lon/lat rectangle as its geometry
pub fn feature_line(cell_id: &str, parameter: &str, value: f64, rect: (f64, f64, f64, f64)) -> String {
    let (x0, y0, x1, y1) = rect;
    format!(
        concat!(
            r#"{{"geometry":{{"coordinates":[[[{x0},{y0}],[{x1},{y0}],[{x1},{y1}],[{x0},{y1}],[{x0},{y0}]]],"type":"Polygon"}},"#,
            r#""properties":{{"cellId":"{id}","from":"2023-05-31T23:00:00+00:00","parameterId":"{param}","qcStatus":"manual","timeResolution":"day","to":"2023-06-01T23:00:00+00:00","value":{value}}},"type":"Feature"}}"#
        ),
        x0 = x0,
        y0 = y0,
        x1 = x1,
        y1 = y1,
        id = cell_id,
        param = parameter,
        value = value
    )
}

pub fn write_grid_day(dir: &Path, date: &str, lines: &[String]) -> std::path::PathBuf {
    let path = dir.join(format!("{}.txt", date));
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}
