use tracing::info;
use tracing_subscriber::EnvFilter;

use etlocal::api::{
    build_pet_raster_to_path, filter_grid_directory, load_jobs, localize_batch,
    localize_etf_to_path, lookup_grid_value, rasterize_grid_file_to_path, scale_raster_to_path,
    warp_raster_to_epsg4326,
};
use etlocal::io::GridFilter;
use etlocal::{LocalizationParams, LocalizationReport};

use super::args::{CliArgs, Command, LocalizationOptions};
use super::errors::AppError;

/// Defaults, then the `--config` file, then individual flags
fn resolve_params(opts: &LocalizationOptions) -> Result<LocalizationParams, AppError> {
    let mut params = match &opts.config {
        Some(path) => LocalizationParams::from_json_file(path)?,
        None => LocalizationParams::default(),
    };
    if let Some(p) = &opts.parameter {
        params.parameter = p.clone();
    }
    if let Some(s) = opts.etf_scale {
        params.etf_scale = s;
    }
    if let Some(m) = opts.mode {
        params.mode = m;
    }
    if opts.no_clamp {
        params.dynamic_range = None;
    } else if let Some(r) = opts.dynamic_range {
        params.dynamic_range = Some(r);
    }
    if opts.no_smooth {
        params.smooth_nodata = false;
    }
    if let Some(b) = opts.band {
        params.band = b;
    }
    if opts.sidecar {
        params.sidecar = true;
    }
    params.validate()?;
    Ok(params)
}

/// Parse `KEY=V1,V2`; each value is read as JSON when possible, as a string otherwise
fn parse_condition(condition: &str) -> Result<(String, Vec<serde_json::Value>), AppError> {
    let (key, values) = condition
        .split_once('=')
        .filter(|(k, _)| !k.trim().is_empty())
        .ok_or_else(|| AppError::InvalidCriterion {
            criterion: condition.to_string(),
        })?;
    let values = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            serde_json::from_str(v).unwrap_or_else(|_| serde_json::Value::String(v.to_string()))
        })
        .collect();
    Ok((key.trim().to_string(), values))
}

fn log_report(report: &LocalizationReport) {
    info!(
        "cells: total={} outside={} all_nodata={} applied={}; pixels: written={} clamped={} smoothed={}",
        report.cells_total,
        report.cells_outside,
        report.cells_all_nodata,
        report.cells_applied,
        report.pixels_written,
        report.pixels_clamped,
        report.pixels_smoothed
    );
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.log {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match args.command {
        Command::Localize(a) => {
            let params = resolve_params(&a.options)?;
            info!("Localizing {:?} for {} -> {:?}", a.input, a.date, a.output);
            let report = localize_etf_to_path(&a.input, a.date, &a.grid_dir, &a.output, &params)?;
            log_report(&report);
        }
        Command::Batch(a) => {
            let params = resolve_params(&a.options)?;
            let jobs = load_jobs(&a.jobs)?;
            if jobs.is_empty() {
                return Err(AppError::MissingArgument {
                    arg: format!("jobs in {:?}", a.jobs),
                }
                .into());
            }
            info!("Starting batch of {} rasters into {:?}", jobs.len(), a.output_dir);
            let report = localize_batch(&jobs, &a.grid_dir, &a.output_dir, &params, !a.fail_fast)?;
            println!(
                "processed={} skipped={} errors={}",
                report.processed, report.skipped, report.errors
            );
        }
        Command::PetRaster(a) => {
            let report =
                build_pet_raster_to_path(&a.input, a.date, &a.grid_dir, &a.output, &a.parameter)?;
            log_report(&report);
        }
        Command::Rasterize(a) => {
            let burned = rasterize_grid_file_to_path(
                &a.input,
                &a.parameter,
                &a.output,
                a.pixel_size,
                a.nodata,
            )?;
            info!("Burned {} cells into {:?}", burned, a.output);
        }
        Command::Filter(a) => {
            let mut filter = match &a.criteria {
                Some(path) => {
                    let text = std::fs::read_to_string(path).map_err(AppError::from)?;
                    serde_json::from_str::<GridFilter>(&text)?
                }
                None => GridFilter::new(),
            };
            for condition in &a.conditions {
                let (key, values) = parse_condition(condition)?;
                filter = filter.with(key, values);
            }
            let report = filter_grid_directory(&a.input_dir, &a.output_dir, &filter)?;
            println!(
                "files={} lines_read={} lines_kept={}",
                report.files, report.lines_read, report.lines_kept
            );
        }
        Command::Lookup(a) => {
            match lookup_grid_value(&a.grid_dir, &a.parameter, a.date, &a.cell_id)? {
                Some(v) => println!("{}", v),
                None => {
                    return Err(AppError::NotFound {
                        parameter: a.parameter.clone(),
                        cell_id: a.cell_id.clone(),
                        date: a.date.to_string(),
                    }
                    .into());
                }
            }
        }
        Command::Scale(a) => {
            scale_raster_to_path(&a.input, &a.output, a.multiplier, a.band)?;
        }
        Command::Warp(a) => {
            if !warp_raster_to_epsg4326(&a.input, &a.output, a.resample)? {
                println!("{:?} is already EPSG:4326; nothing written", a.input);
            }
        }
    }
    Ok(())
}
