use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use etlocal::types::{DEFAULT_PARAMETER, PatchMode, ResampleMethod};

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

fn parse_range(s: &str) -> Result<(f64, f64), String> {
    let (lo, hi) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LO,HI, got {}", s))?;
    let lo = lo.trim().parse::<f64>().map_err(|e| e.to_string())?;
    let hi = hi.trim().parse::<f64>().map_err(|e| e.to_string())?;
    Ok((lo, hi))
}

#[derive(Parser)]
#[command(name = "etlocal", version, about = "Localize Landsat ETF rasters with DMI climate grids")]
pub struct CliArgs {
    /// Enable logging (level from RUST_LOG, debug by default)
    #[arg(long, global = true, default_value_t = false)]
    pub log: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scale an ETF raster by the grid cell values for its acquisition date
    Localize(LocalizeArgs),
    /// Localize a list of rasters described by a JSON jobs file
    Batch(BatchArgs),
    /// Burn the grid cell values onto an ETF raster's pixel grid
    PetRaster(PetRasterArgs),
    /// Rasterize one grid file to an EPSG:4326 GeoTIFF
    Rasterize(RasterizeArgs),
    /// Copy only the records matching property criteria from a grid directory
    Filter(FilterArgs),
    /// Print the value of one grid cell
    Lookup(LookupArgs),
    /// Multiply a whole raster by a single value
    Scale(ScaleArgs),
    /// Reproject a raster to EPSG:4326 with gdalwarp
    Warp(WarpArgs),
}

/// Options overriding a loaded (or default) localization config
#[derive(Args)]
pub struct LocalizationOptions {
    /// JSON file with localization parameters
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// DMI parameterId to apply
    #[arg(long)]
    pub parameter: Option<String>,

    /// Divisor of etf * value
    #[arg(long)]
    pub etf_scale: Option<f64>,

    /// How the cell value is applied
    #[arg(long, value_enum)]
    pub mode: Option<PatchMode>,

    /// Clamp output into LO,HI
    #[arg(long, value_parser = parse_range, conflicts_with = "no_clamp")]
    pub dynamic_range: Option<(f64, f64)>,

    /// Disable dynamic range clamping
    #[arg(long, default_value_t = false)]
    pub no_clamp: bool,

    /// Disable interior nodata smoothing
    #[arg(long, default_value_t = false)]
    pub no_smooth: bool,

    /// Source band (1-based)
    #[arg(long)]
    pub band: Option<usize>,

    /// Write a JSON sidecar with provenance and the run report
    #[arg(long, default_value_t = false)]
    pub sidecar: bool,
}

#[derive(Args)]
pub struct LocalizeArgs {
    /// Input ETF raster
    #[arg(short, long)]
    pub input: PathBuf,

    /// Acquisition date (YYYY-MM-DD)
    #[arg(short, long, value_parser = parse_date)]
    pub date: NaiveDate,

    /// Directory of YYYY-MM-DD.txt grid files
    #[arg(short, long)]
    pub grid_dir: PathBuf,

    /// Output GeoTIFF
    #[arg(short, long)]
    pub output: PathBuf,

    #[command(flatten)]
    pub options: LocalizationOptions,
}

#[derive(Args)]
pub struct BatchArgs {
    /// JSON array of {"etf": ..., "date": "YYYY-MM-DD", "output": optional}
    #[arg(long)]
    pub jobs: PathBuf,

    #[arg(short, long)]
    pub grid_dir: PathBuf,

    #[arg(long)]
    pub output_dir: PathBuf,

    /// Stop at the first failing job
    #[arg(long, default_value_t = false)]
    pub fail_fast: bool,

    #[command(flatten)]
    pub options: LocalizationOptions,
}

#[derive(Args)]
pub struct PetRasterArgs {
    #[arg(short, long)]
    pub input: PathBuf,

    #[arg(short, long, value_parser = parse_date)]
    pub date: NaiveDate,

    #[arg(short, long)]
    pub grid_dir: PathBuf,

    #[arg(short, long)]
    pub output: PathBuf,

    #[arg(long, default_value = DEFAULT_PARAMETER)]
    pub parameter: String,
}

#[derive(Args)]
pub struct RasterizeArgs {
    /// Grid file (one JSON feature per line)
    #[arg(short, long)]
    pub input: PathBuf,

    #[arg(short, long)]
    pub output: PathBuf,

    #[arg(long, default_value = DEFAULT_PARAMETER)]
    pub parameter: String,

    /// Pixel size in degrees
    #[arg(long, default_value_t = etlocal::core::processing::rasterize::DEFAULT_PIXEL_SIZE)]
    pub pixel_size: f64,

    #[arg(long, default_value_t = etlocal::core::processing::rasterize::DEFAULT_RASTER_NODATA)]
    pub nodata: f64,
}

#[derive(Args)]
pub struct FilterArgs {
    #[arg(long)]
    pub input_dir: PathBuf,

    #[arg(long)]
    pub output_dir: PathBuf,

    /// JSON file with {"criteria": {"key": [values...]}}
    #[arg(long)]
    pub criteria: Option<PathBuf>,

    /// KEY=VALUE[,VALUE...]; may be repeated
    #[arg(long = "where")]
    pub conditions: Vec<String>,
}

#[derive(Args)]
pub struct LookupArgs {
    #[arg(short, long)]
    pub grid_dir: PathBuf,

    #[arg(short, long, value_parser = parse_date)]
    pub date: NaiveDate,

    #[arg(long)]
    pub cell_id: String,

    #[arg(long, default_value = DEFAULT_PARAMETER)]
    pub parameter: String,
}

#[derive(Args)]
pub struct ScaleArgs {
    #[arg(short, long)]
    pub input: PathBuf,

    #[arg(short, long)]
    pub output: PathBuf,

    #[arg(short, long)]
    pub multiplier: f64,

    #[arg(long, default_value_t = 1)]
    pub band: usize,
}

#[derive(Args)]
pub struct WarpArgs {
    #[arg(short, long)]
    pub input: PathBuf,

    #[arg(short, long)]
    pub output: PathBuf,

    #[arg(long, value_enum, default_value_t = ResampleMethod::Nearest)]
    pub resample: ResampleMethod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_localize_with_overrides() {
        let args = CliArgs::try_parse_from([
            "etlocal",
            "--log",
            "localize",
            "-i",
            "etf.tif",
            "-d",
            "2023-06-01",
            "-g",
            "grid",
            "-o",
            "out.tif",
            "--dynamic-range",
            "0,8",
            "--no-smooth",
        ])
        .unwrap();
        assert!(args.log);
        match args.command {
            Command::Localize(a) => {
                assert_eq!(a.date, NaiveDate::from_ymd_opt(2023, 6, 1).unwrap());
                assert_eq!(a.options.dynamic_range, Some((0.0, 8.0)));
                assert!(a.options.no_smooth);
            }
            _ => panic!("expected localize"),
        }
    }

    #[test]
    fn rejects_bad_date() {
        assert!(
            CliArgs::try_parse_from(["etlocal", "lookup", "-g", "g", "-d", "01/06/2023", "--cell-id", "x"])
                .is_err()
        );
    }
}
