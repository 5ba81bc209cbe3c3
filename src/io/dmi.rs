use rayon::prelude::*;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors encountered when reading DMI climate grid files
#[derive(Debug, Error)]
pub enum GridError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON decode error at line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("Missing property `{field}` at line {line}")]
    MissingProperty { field: &'static str, line: usize },
    #[error("Invalid geometry at line {line}: {reason}")]
    Geometry { line: usize, reason: String },
    #[error("No climate grid file for {0}")]
    MissingDate(chrono::NaiveDate),
    #[error("{path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: Box<GridError>,
    },
}

impl GridError {
    fn in_file(self, path: &Path) -> Self {
        GridError::File {
            path: path.to_path_buf(),
            source: Box::new(self),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeatureRecord {
    geometry: Geometry,
    #[serde(default)]
    properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<Vec<Vec<f64>>>,
}

/// One parameter value for one 10km cell, as delivered in a DMI grid file line
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    pub cell_id: String,
    pub parameter_id: String,
    pub value: f64,
    pub time_resolution: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    /// Outer polygon ring in (lon, lat), EPSG:4326
    pub ring: Vec<(f64, f64)>,
    /// Raw properties object, used for criteria filtering
    pub properties: Map<String, Value>,
}

/// Parse a single grid file line
pub fn parse_record(line: &str) -> Result<GridCell, GridError> {
    parse_line(line, 1)
}

fn required_str(
    props: &Map<String, Value>,
    field: &'static str,
    line: usize,
) -> Result<String, GridError> {
    props
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(GridError::MissingProperty { field, line })
}

fn optional_str(props: &Map<String, Value>, field: &str) -> Option<String> {
    props.get(field).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn parse_line(text: &str, line: usize) -> Result<GridCell, GridError> {
    let record: FeatureRecord = serde_json::from_str(text.trim_end())
        .map_err(|source| GridError::Json { line, source })?;

    if record.geometry.kind != "Polygon" {
        return Err(GridError::Geometry {
            line,
            reason: format!("expected Polygon, got {}", record.geometry.kind),
        });
    }
    let outer = record
        .geometry
        .coordinates
        .first()
        .ok_or_else(|| GridError::Geometry {
            line,
            reason: "polygon has no rings".into(),
        })?;
    if outer.len() < 3 {
        return Err(GridError::Geometry {
            line,
            reason: format!("outer ring has {} positions", outer.len()),
        });
    }
    let mut ring = Vec::with_capacity(outer.len());
    for pos in outer {
        match pos.as_slice() {
            [lon, lat, ..] => ring.push((*lon, *lat)),
            _ => {
                return Err(GridError::Geometry {
                    line,
                    reason: "position with fewer than 2 coordinates".into(),
                });
            }
        }
    }

    let props = record.properties;
    let value = props
        .get("value")
        .and_then(Value::as_f64)
        .ok_or(GridError::MissingProperty {
            field: "value",
            line,
        })?;

    Ok(GridCell {
        cell_id: required_str(&props, "cellId", line)?,
        parameter_id: required_str(&props, "parameterId", line)?,
        value,
        time_resolution: optional_str(&props, "timeResolution"),
        from: optional_str(&props, "from"),
        to: optional_str(&props, "to"),
        ring,
        properties: props,
    })
}

/// Parse all records of a grid file, optionally keeping only one parameter.
/// Blank lines are skipped; lines are decoded in parallel and keep file order.
pub fn read_grid_file<P: AsRef<Path>>(
    path: P,
    parameter: Option<&str>,
) -> Result<Vec<GridCell>, GridError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| GridError::from(e).in_file(path))?;

    let lines: Vec<(usize, &str)> = contents
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end()))
        .filter(|(_, l)| !l.is_empty())
        .collect();

    let cells = lines
        .into_par_iter()
        .map(|(no, text)| parse_line(text, no))
        .filter(|res| match (res, parameter) {
            (Ok(cell), Some(p)) => cell.parameter_id == p,
            _ => true,
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.in_file(path))?;

    debug!(
        "read {} grid cells from {:?} (parameter filter: {:?})",
        cells.len(),
        path,
        parameter
    );
    Ok(cells)
}
