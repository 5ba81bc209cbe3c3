mod common;

use chrono::NaiveDate;
use common::{ND, feature_line, read_output, write_grid_day, write_raster};
use etlocal::{
    BatchReport, GridFilter, LocalizationJob, LocalizationParams, filter_grid_directory,
    localize_batch, lookup_grid_value, rasterize_grid_file_to_path, scale_raster_to_path,
};

const PARAM: &str = "pot_evaporation_makkink";

#[test]
fn rasterizes_grid_file_in_epsg4326() {
    let dir = tempfile::tempdir().unwrap();
    let grid = write_grid_day(
        dir.path(),
        "2023-06-01",
        &[
            feature_line("a", PARAM, 1.5, (8.0, 55.0, 8.5, 55.5)),
            feature_line("b", PARAM, 3.0, (8.5, 55.0, 9.0, 55.5)),
            feature_line("a", "mean_temp", 20.0, (8.0, 55.0, 8.5, 55.5)),
        ],
    );
    let out = dir.path().join("grid.tif");
    let burned = rasterize_grid_file_to_path(&grid, PARAM, &out, 0.25, 0.0).unwrap();
    assert_eq!(burned, 2);

    let o = read_output(&out);
    assert_eq!((o.cols, o.rows), (4, 2));
    assert_eq!(o.geotransform, [8.0, 0.25, 0.0, 55.5, 0.0, -0.25]);
    assert_eq!(o.nodata, Some(0.0));
    assert_eq!(o.row(1), vec![1.5, 1.5, 3.0, 3.0]);
    assert!(o.dataset.projection().contains("4326"));
    assert_eq!(o.metadata("ETLOCAL_MODE").as_deref(), Some("rasterize"));
}

#[test]
fn scale_preserves_nodata_and_georeferencing() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("etf.tif");
    let gt = [10.0, 0.5, 0.0, 56.0, 0.0, -0.5];
    write_raster(&src, 4326, gt, 2, 2, vec![2.0, ND as f32, 4.0, 0.5], Some(ND));

    let out = dir.path().join("scaled.tif");
    scale_raster_to_path(&src, &out, 0.5, 1).unwrap();
    let o = read_output(&out);
    assert_eq!(o.data, vec![1.0, ND as f32, 2.0, 0.25]);
    assert_eq!(o.geotransform, gt);
    assert_eq!(o.metadata("MULTIPLIER").as_deref(), Some("0.5"));

    assert!(scale_raster_to_path(&src, &dir.path().join("x.tif"), 2.0, 2).is_err());
}

#[test]
fn filter_then_lookup() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let manual = feature_line("10km_1", PARAM, 1.25, (8.0, 55.0, 8.1, 55.1));
    let auto = manual.replace("\"manual\"", "\"none\"").replace("10km_1", "10km_2");
    write_grid_day(src.path(), "2023-06-01", &[manual.clone(), auto]);
    write_grid_day(src.path(), "2023-06-02", &[manual]);

    let filter = GridFilter::new().with("qcStatus", ["manual"]);
    let report = filter_grid_directory(src.path(), out.path(), &filter).unwrap();
    assert_eq!((report.files, report.lines_read, report.lines_kept), (2, 3, 2));

    let date = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
    assert_eq!(
        lookup_grid_value(out.path(), PARAM, date, "10km_1").unwrap(),
        Some(1.25)
    );
    assert_eq!(lookup_grid_value(out.path(), PARAM, date, "10km_2").unwrap(), None);
    assert_eq!(lookup_grid_value(src.path(), PARAM, date, "10km_2").unwrap(), Some(1.25));
}

#[test]
fn batch_counts_processed_skipped_and_failed() {
    let dir = tempfile::tempdir().unwrap();
    let grid_dir = dir.path().join("grid");
    std::fs::create_dir_all(&grid_dir).unwrap();
    write_grid_day(
        &grid_dir,
        "2023-06-01",
        &[feature_line("a", PARAM, 2.0, (10.0, 55.0, 11.0, 55.5))],
    );
    let etf = dir.path().join("scene_etf.tif");
    write_raster(
        &etf,
        4326,
        [10.0, 0.25, 0.0, 55.5, 0.0, -0.25],
        4,
        2,
        vec![5000.0; 8],
        Some(ND),
    );

    let d1 = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
    let jobs = vec![
        LocalizationJob {
            etf: etf.clone(),
            date: d1,
            output: None,
        },
        LocalizationJob {
            etf: etf.clone(),
            date: NaiveDate::from_ymd_opt(2023, 6, 9).unwrap(),
            output: None,
        },
        LocalizationJob {
            etf: dir.path().join("missing.tif"),
            date: d1,
            output: Some("missing_et.tif".into()),
        },
    ];
    let out_dir = dir.path().join("out");
    let params = LocalizationParams::default();
    let report = localize_batch(&jobs, &grid_dir, &out_dir, &params, true).unwrap();
    assert_eq!(
        report,
        BatchReport {
            processed: 1,
            skipped: 1,
            errors: 1
        }
    );
    assert_eq!(read_output(&out_dir.join("scene_etf_et.tif")).row(0), vec![1.0; 4]);

    assert!(localize_batch(&jobs, &grid_dir, &out_dir, &params, false).is_err());
}
