mod common;

use chrono::NaiveDate;
use common::{ND, feature_line, read_output, write_grid_day, write_raster};
use etlocal::{
    Error, GridError, LocalizationParams, PatchMode, build_pet_raster_to_path,
    localize_etf_to_path, overlapping_cells,
};

const PARAM: &str = "pot_evaporation_makkink";

// 4x2 lon/lat raster of 0.25 degree pixels covering 10..11E, 55..55.5N
const GT_4326: [f64; 6] = [10.0, 0.25, 0.0, 55.5, 0.0, -0.25];

fn june_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 6, 1).unwrap()
}

fn two_cells() -> Vec<String> {
    vec![
        feature_line("10km_1", PARAM, 2.0, (10.0, 55.0, 10.5, 55.5)),
        feature_line("10km_2", PARAM, 4.0, (10.5, 55.0, 11.0, 55.5)),
        // other parameters are ignored
        feature_line("10km_1", "mean_temp", 30.0, (10.0, 55.0, 10.5, 55.5)),
    ]
}

#[test]
fn scales_etf_inside_each_cell() {
    let dir = tempfile::tempdir().unwrap();
    let etf = dir.path().join("etf.tif");
    let mut data = vec![5000.0f32; 8];
    data[5] = ND as f32;
    write_raster(&etf, 4326, GT_4326, 4, 2, data, Some(ND));
    write_grid_day(dir.path(), "2023-06-01", &two_cells());

    let out = dir.path().join("et.tif");
    let report = localize_etf_to_path(
        &etf,
        june_first(),
        dir.path(),
        &out,
        &LocalizationParams::default(),
    )
    .unwrap();

    assert_eq!(report.cells_total, 2);
    assert_eq!(report.cells_applied, 2);
    assert_eq!(report.cells_outside, 0);
    assert_eq!(report.pixels_written, 7);

    let o = read_output(&out);
    assert_eq!((o.cols, o.rows), (4, 2));
    assert_eq!(o.geotransform, GT_4326);
    assert_eq!(o.nodata, Some(ND));
    assert_eq!(o.row(0), vec![1.0, 1.0, 2.0, 2.0]);
    assert_eq!(o.row(1), vec![1.0, ND as f32, 2.0, 2.0]);

    assert_eq!(o.metadata("ETLOCAL_MODE").as_deref(), Some("scale"));
    assert_eq!(o.metadata("DMI_PARAMETER").as_deref(), Some(PARAM));
    assert_eq!(o.metadata("DMI_DATE").as_deref(), Some("2023-06-01"));
    assert_eq!(o.metadata("CELLS_APPLIED").as_deref(), Some("2"));
}

#[test]
fn pet_raster_burns_raw_values() {
    let dir = tempfile::tempdir().unwrap();
    let etf = dir.path().join("etf.tif");
    write_raster(&etf, 4326, GT_4326, 4, 2, vec![1234.0; 8], Some(ND));
    write_grid_day(dir.path(), "2023-06-01", &two_cells());

    let out = dir.path().join("pet.tif");
    let report = build_pet_raster_to_path(&etf, june_first(), dir.path(), &out, PARAM).unwrap();
    assert_eq!(report.pixels_written, 8);
    assert_eq!(report.pixels_clamped, 0);

    let o = read_output(&out);
    assert_eq!(o.row(0), vec![2.0, 2.0, 4.0, 4.0]);
    assert_eq!(o.row(1), vec![2.0, 2.0, 4.0, 4.0]);
    assert_eq!(o.metadata("ETLOCAL_MODE").as_deref(), Some("overwrite"));
}

#[test]
fn cells_outside_raster_give_all_nodata_output() {
    let dir = tempfile::tempdir().unwrap();
    let etf = dir.path().join("etf.tif");
    write_raster(&etf, 4326, GT_4326, 4, 2, vec![5000.0; 8], Some(ND));
    write_grid_day(
        dir.path(),
        "2023-06-01",
        &[feature_line("far", PARAM, 3.0, (12.0, 56.0, 12.5, 56.5))],
    );

    let out = dir.path().join("et.tif");
    let report = localize_etf_to_path(
        &etf,
        june_first(),
        dir.path(),
        &out,
        &LocalizationParams::default(),
    )
    .unwrap();
    assert_eq!(report.cells_outside, 1);
    assert_eq!(report.cells_applied, 0);
    assert!(read_output(&out).data.iter().all(|&v| v == ND as f32));
}

#[test]
fn all_nodata_tiles_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let etf = dir.path().join("etf.tif");
    // western half entirely nodata
    let data = vec![
        ND as f32, ND as f32, 5000.0, 5000.0, //
        ND as f32, ND as f32, 5000.0, 5000.0,
    ];
    write_raster(&etf, 4326, GT_4326, 4, 2, data, Some(ND));
    write_grid_day(dir.path(), "2023-06-01", &two_cells());

    let out = dir.path().join("et.tif");
    let report = localize_etf_to_path(
        &etf,
        june_first(),
        dir.path(),
        &out,
        &LocalizationParams::default(),
    )
    .unwrap();
    assert_eq!(report.cells_all_nodata, 1);
    assert_eq!(report.cells_applied, 1);
    assert_eq!(read_output(&out).row(0), vec![ND as f32, ND as f32, 2.0, 2.0]);
}

#[test]
fn raster_without_nodata_uses_default_nodata() {
    let dir = tempfile::tempdir().unwrap();
    let etf = dir.path().join("etf.tif");
    write_raster(&etf, 4326, GT_4326, 4, 2, vec![5000.0; 8], None);
    write_grid_day(
        dir.path(),
        "2023-06-01",
        &[feature_line("10km_1", PARAM, 2.0, (10.0, 55.0, 10.5, 55.5))],
    );

    let out = dir.path().join("et.tif");
    let mut params = LocalizationParams::default();
    params.sidecar = true;
    localize_etf_to_path(&etf, june_first(), dir.path(), &out, &params).unwrap();

    let o = read_output(&out);
    assert_eq!(o.nodata, Some(ND));
    // pixels outside every cell become nodata
    assert_eq!(o.row(0), vec![1.0, 1.0, ND as f32, ND as f32]);

    let sidecar: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("et.json")).unwrap())
            .unwrap();
    assert_eq!(sidecar["report"]["cells_applied"], 1);
    assert_eq!(sidecar["dmi_parameter"], PARAM);
}

#[test]
fn utm_raster_is_joined_in_its_own_crs() {
    let dir = tempfile::tempdir().unwrap();
    let etf = dir.path().join("etf_utm.tif");
    // 10x10 pixels of 100 m in UTM 32N around (9E, 56N); x = 500000 is the 9E meridian
    let gt = [499_500.0, 100.0, 0.0, 6_206_500.0, 0.0, -100.0];
    let mut data = vec![8000.0f32; 100];
    data[4 * 10 + 4] = ND as f32;
    write_raster(&etf, 32632, gt, 10, 10, data, Some(ND));
    write_grid_day(
        dir.path(),
        "2023-06-01",
        &[
            feature_line("west", PARAM, 2.5, (8.9, 55.95, 9.0, 56.05)),
            feature_line("east", PARAM, 5.0, (9.0, 55.95, 9.1, 56.05)),
        ],
    );

    let out = dir.path().join("et.tif");
    let mut params = LocalizationParams::default();
    params.dynamic_range = Some((0.0, 3.0));
    let report = localize_etf_to_path(&etf, june_first(), dir.path(), &out, &params).unwrap();

    assert_eq!(report.cells_applied, 2);
    assert_eq!(report.pixels_written, 99);
    assert_eq!(report.pixels_clamped, 50);
    assert_eq!(report.pixels_smoothed, 1);

    let o = read_output(&out);
    assert_eq!(o.row(0), vec![2.0, 2.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0, 3.0, 3.0]);
    // hole filled from clamped neighbours: (5 * 2.0 + 3 * 3.0) / 8
    assert_eq!(o.at(4, 4), 2.375);
}

#[test]
fn missing_date_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let etf = dir.path().join("etf.tif");
    write_raster(&etf, 4326, GT_4326, 4, 2, vec![5000.0; 8], Some(ND));
    write_grid_day(dir.path(), "2023-06-02", &two_cells());

    let err = localize_etf_to_path(
        &etf,
        june_first(),
        dir.path(),
        &dir.path().join("et.tif"),
        &LocalizationParams::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Grid(GridError::MissingDate(d)) if d == june_first()));
}

#[test]
fn invalid_scale_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let params = LocalizationParams {
        etf_scale: -1.0,
        mode: PatchMode::Scale,
        ..Default::default()
    };
    let err = localize_etf_to_path(
        &dir.path().join("etf.tif"),
        june_first(),
        dir.path(),
        &dir.path().join("et.tif"),
        &params,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { arg: "etf_scale", .. }));
}

#[test]
fn overlapping_cells_filters_by_footprint() {
    let dir = tempfile::tempdir().unwrap();
    let etf = dir.path().join("etf.tif");
    write_raster(&etf, 4326, GT_4326, 4, 2, vec![5000.0; 8], Some(ND));
    let grid = write_grid_day(
        dir.path(),
        "2023-06-01",
        &[
            feature_line("in", PARAM, 1.0, (10.2, 55.1, 10.3, 55.2)),
            feature_line("touching", PARAM, 1.0, (11.0, 55.0, 11.5, 55.5)),
            feature_line("out", PARAM, 1.0, (13.0, 55.0, 13.5, 55.5)),
        ],
    );
    let ids: Vec<String> = overlapping_cells(&etf, &grid, PARAM)
        .unwrap()
        .into_iter()
        .map(|c| c.cell_id)
        .collect();
    assert_eq!(ids, vec!["in".to_string(), "touching".to_string()]);
}

#[test]
fn raster_footprint_in_wgs84() {
    let dir = tempfile::tempdir().unwrap();
    let etf = dir.path().join("etf.tif");
    write_raster(&etf, 4326, GT_4326, 4, 2, vec![5000.0; 8], Some(ND));
    let raster = etlocal::EtfRaster::open(&etf).unwrap();
    assert_eq!(raster.metadata.projection, "EPSG:4326");
    assert!(raster.metadata.is_epsg4326());

    let footprint = raster.footprint_in_wgs84().unwrap();
    let corners: Vec<(f64, f64)> = footprint.exterior().points().map(|p| p.x_y()).collect();
    for (x, y) in [(10.0, 55.0), (11.0, 55.0), (11.0, 55.5), (10.0, 55.5)] {
        assert!(
            corners
                .iter()
                .any(|c| (c.0 - x).abs() < 1e-9 && (c.1 - y).abs() < 1e-9),
            "missing corner ({x}, {y}) in {corners:?}"
        );
    }
}
