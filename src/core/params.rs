use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{DEFAULT_ETF_SCALE, DEFAULT_PARAMETER, PatchMode};

/// Localization parameters suitable for config files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizationParams {
    /// DMI `parameterId` whose cell values are applied
    pub parameter: String,
    /// Divisor applied to `etf * value` in scale mode
    pub etf_scale: f64,
    pub mode: PatchMode,
    /// Clamp valid output pixels into `(lo, hi)`; None disables clamping
    pub dynamic_range: Option<(f64, f64)>,
    /// Fill isolated interior nodata pixels from their neighbours
    pub smooth_nodata: bool,
    /// 1-based source band
    pub band: usize,
    /// Also write a `<output>.json` sidecar with provenance and the report
    pub sidecar: bool,
}

impl Default for LocalizationParams {
    fn default() -> Self {
        Self {
            parameter: DEFAULT_PARAMETER.to_string(),
            etf_scale: DEFAULT_ETF_SCALE,
            mode: PatchMode::Scale,
            dynamic_range: Some((0.0, 10.0)),
            smooth_nodata: true,
            band: 1,
            sidecar: false,
        }
    }
}

impl LocalizationParams {
    /// Parameters for burning the raw climate values onto a raster's grid
    pub fn pet_raster(parameter: &str) -> Self {
        Self {
            parameter: parameter.to_string(),
            mode: PatchMode::Overwrite,
            dynamic_range: None,
            smooth_nodata: false,
            ..Default::default()
        }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&text).map_err(Error::external)
    }

    pub fn validate(&self) -> Result<()> {
        if self.parameter.trim().is_empty() {
            return Err(Error::MissingArgument {
                arg: "parameter".to_string(),
            });
        }
        if !self.etf_scale.is_finite() || self.etf_scale <= 0.0 {
            return Err(Error::invalid("etf_scale", self.etf_scale));
        }
        if let Some((lo, hi)) = self.dynamic_range {
            if lo.is_nan() || hi.is_nan() || lo > hi {
                return Err(Error::invalid("dynamic_range", format!("({}, {})", lo, hi)));
            }
        }
        if self.band == 0 {
            return Err(Error::invalid("band", self.band));
        }
        Ok(())
    }
}
