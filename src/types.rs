//! Shared types and enums used across etlocal.
//! Includes `PatchMode` (how a cell value is applied to the pixels it covers)
//! and `ResampleMethod` (resampling for reprojection).
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// DMI parameter used for localization unless configured otherwise
pub const DEFAULT_PARAMETER: &str = "pot_evaporation_makkink";

/// Integer scaling of SSEBop ETF products (ETF * 10000)
pub const DEFAULT_ETF_SCALE: f64 = 10000.0;

/// Nodata written when the source raster declares none
pub const DEFAULT_NODATA: f64 = -9999.0;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchMode {
    /// etf * value / etf_scale
    Scale,
    /// Burn the climate value itself (PET raster on the ETF grid)
    Overwrite,
}

impl std::fmt::Display for PatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PatchMode::Scale => "scale",
            PatchMode::Overwrite => "overwrite",
        };
        write!(f, "{}", s)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleMethod {
    Nearest,
    Bilinear,
    Cubic,
    Lanczos,
}

impl ResampleMethod {
    /// Name understood by `gdalwarp -r`
    pub fn gdal_name(&self) -> &'static str {
        match self {
            ResampleMethod::Nearest => "near",
            ResampleMethod::Bilinear => "bilinear",
            ResampleMethod::Cubic => "cubic",
            ResampleMethod::Lanczos => "lanczos",
        }
    }
}

impl std::fmt::Display for ResampleMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResampleMethod::Nearest => write!(f, "Nearest"),
            ResampleMethod::Bilinear => write!(f, "Bilinear"),
            ResampleMethod::Cubic => write!(f, "Cubic"),
            ResampleMethod::Lanczos => write!(f, "Lanczos"),
        }
    }
}
