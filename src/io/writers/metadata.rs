use gdal::Dataset;
use gdal::Metadata;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::io::gdal::RasterError;

/// Where an output raster came from, embedded as GDAL metadata items
#[derive(Debug, Clone, Default)]
pub struct Provenance {
    /// `scale`, `overwrite`, `rasterize`, `multiply`
    pub mode: String,
    pub parameter: Option<String>,
    pub date: Option<chrono::NaiveDate>,
    pub grid_file: Option<PathBuf>,
    pub etf_scale: Option<f64>,
    pub multiplier: Option<f64>,
    pub source_raster: Option<PathBuf>,
    pub cells_applied: Option<usize>,
}

impl Provenance {
    pub fn new(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            ..Default::default()
        }
    }
}

/// Flatten provenance into upper-case metadata keys. Absent fields are left out.
pub fn provenance_fields(p: &Provenance) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    fields.insert("ETLOCAL_MODE".to_string(), p.mode.clone());
    if let Some(param) = &p.parameter {
        fields.insert("DMI_PARAMETER".to_string(), param.clone());
    }
    if let Some(date) = p.date {
        fields.insert("DMI_DATE".to_string(), date.format("%Y-%m-%d").to_string());
    }
    if let Some(path) = &p.grid_file {
        fields.insert("DMI_GRID_FILE".to_string(), path.display().to_string());
    }
    if let Some(scale) = p.etf_scale {
        fields.insert("ETF_SCALE".to_string(), scale.to_string());
    }
    if let Some(m) = p.multiplier {
        fields.insert("MULTIPLIER".to_string(), m.to_string());
    }
    if let Some(path) = &p.source_raster {
        fields.insert("SOURCE_RASTER".to_string(), path.display().to_string());
    }
    if let Some(n) = p.cells_applied {
        fields.insert("CELLS_APPLIED".to_string(), n.to_string());
    }

    fields.insert("CONVERSION_TOOL".to_string(), "etlocal".to_string());
    fields.insert(
        "CONVERSION_VERSION".to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    fields.insert(
        "CONVERSION_TIMESTAMP".to_string(),
        chrono::Utc::now().to_rfc3339(),
    );
    fields
}

/// Lower-case keys; values that parse as numbers become JSON numbers
pub fn fields_to_json(fields: &BTreeMap<String, String>) -> Map<String, Value> {
    let mut json = Map::new();
    for (key, value) in fields {
        let json_value = if let Ok(n) = value.parse::<u64>() {
            Value::Number(n.into())
        } else if let Some(n) = value
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
        {
            Value::Number(n)
        } else {
            Value::String(value.clone())
        };
        json.insert(key.to_lowercase(), json_value);
    }
    json
}

/// Set provenance metadata items on an output dataset
pub fn embed_provenance(ds: &mut Dataset, provenance: &Provenance) -> std::result::Result<(), RasterError> {
    for (key, value) in provenance_fields(provenance) {
        ds.set_metadata_item(&key, &value, "")?;
    }
    Ok(())
}

/// Write `<output>.json` next to the raster with the provenance fields and a `report` object
pub fn write_json_sidecar(output_path: &Path, provenance: &Provenance, report: Value) -> Result<PathBuf> {
    let mut json = fields_to_json(&provenance_fields(provenance));
    json.insert("report".to_string(), report);

    let sidecar_path = output_path.with_extension("json");
    let json_string =
        serde_json::to_string_pretty(&Value::Object(json)).map_err(crate::Error::external)?;
    std::fs::write(&sidecar_path, json_string)?;

    info!("Created metadata sidecar: {:?}", sidecar_path);
    Ok(sidecar_path)
}
