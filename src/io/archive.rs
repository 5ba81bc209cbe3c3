//! Directory of per-date DMI climate grid files (`YYYY-MM-DD.txt`), value lookup,
//! and criteria filtering of whole directories.
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::io::dmi::{GridCell, GridError, parse_line};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Path of the grid file for `date` inside `dir`, whether or not it exists
pub fn path_for_date(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}.txt", date.format(DATE_FORMAT)))
}

/// Index of the dated grid files in one directory
#[derive(Debug, Clone)]
pub struct GridArchive {
    pub dir: PathBuf,
    files: BTreeMap<NaiveDate, PathBuf>,
}

impl GridArchive {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, GridError> {
        let dir = dir.as_ref().to_path_buf();
        let mut files = BTreeMap::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            match NaiveDate::parse_from_str(stem, DATE_FORMAT) {
                Ok(date) => {
                    files.insert(date, path);
                }
                Err(_) => debug!("Skipping non-dated grid file: {:?}", path),
            }
        }
        info!("Indexed {} climate grid files in {:?}", files.len(), dir);
        Ok(Self { dir, files })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.files.keys().copied()
    }

    pub fn file_for_date(&self, date: NaiveDate) -> Result<&Path, GridError> {
        self.files
            .get(&date)
            .map(PathBuf::as_path)
            .ok_or(GridError::MissingDate(date))
    }

    /// Value of `parameter` for `cell_id` on `date`; `None` if the file holds no such record
    pub fn lookup(
        &self,
        parameter: &str,
        date: NaiveDate,
        cell_id: &str,
    ) -> crate::Result<Option<f64>> {
        if parameter.is_empty() {
            return Err(crate::Error::invalid("parameter", "<empty>"));
        }
        if cell_id.is_empty() {
            return Err(crate::Error::invalid("cell_id", "<empty>"));
        }
        let path = self.file_for_date(date)?;
        let contents = fs::read_to_string(path)?;
        for (i, text) in contents.lines().enumerate() {
            let text = text.trim_end();
            if text.is_empty() {
                continue;
            }
            let cell = parse_line(text, i + 1).map_err(|e| GridError::File {
                path: path.to_path_buf(),
                source: Box::new(e),
            })?;
            if cell.cell_id == cell_id && cell.parameter_id == parameter {
                return Ok(Some(cell.value));
            }
        }
        warn!(
            "Either {} or {} not in {:?}. Is the climate data filtered too aggressively?",
            cell_id, parameter, path
        );
        Ok(None)
    }
}

/// Property criteria: a record passes when each named property is absent, null,
/// or one of the allowed values. Criteria with no allowed values are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridFilter {
    pub criteria: BTreeMap<String, Vec<Value>>,
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

impl GridFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper: allow `values` for property `key`
    pub fn with<K, I, V>(mut self, key: K, values: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.criteria
            .entry(key.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn matches_properties(&self, props: &serde_json::Map<String, Value>) -> bool {
        self.criteria.iter().all(|(key, allowed)| {
            if allowed.is_empty() {
                return true;
            }
            match props.get(key) {
                None | Some(Value::Null) => true,
                Some(v) => allowed.iter().any(|a| values_equal(a, v)),
            }
        })
    }

    pub fn matches(&self, cell: &GridCell) -> bool {
        self.matches_properties(&cell.properties)
    }

    /// Match a raw grid file line without decoding its geometry
    pub fn matches_line(&self, line: &str) -> Result<bool, serde_json::Error> {
        let record: Value = serde_json::from_str(line)?;
        Ok(match record.get("properties").and_then(Value::as_object) {
            Some(props) => self.matches_properties(props),
            None => self.criteria.values().all(Vec::is_empty),
        })
    }
}

/// Outcome of filtering a directory of grid files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterReport {
    pub files: usize,
    pub lines_read: usize,
    pub lines_kept: usize,
}

fn filter_file(path: &Path, out_dir: &Path, filter: &GridFilter) -> Result<(usize, usize), GridError> {
    let contents = fs::read_to_string(path)?;
    let mut kept = String::new();
    let mut read = 0;
    let mut count = 0;
    // kept lines are copied with their original text and terminator
    for (i, raw) in contents.split_inclusive('\n').enumerate() {
        let line = raw.trim_end();
        if line.is_empty() {
            continue;
        }
        read += 1;
        let keep = filter
            .matches_line(line)
            .map_err(|source| GridError::Json { line: i + 1, source })?;
        if keep {
            kept.push_str(raw);
            count += 1;
        }
    }
    let name = path.file_name().ok_or_else(|| {
        GridError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "grid file path has no file name",
        ))
    })?;
    fs::write(out_dir.join(name), kept)?;
    Ok((read, count))
}

/// Write the matching lines of every `*.txt` in `src_dir` to a same-named file in `out_dir`
pub fn filter_directory(
    src_dir: &Path,
    out_dir: &Path,
    filter: &GridFilter,
) -> Result<FilterReport, GridError> {
    fs::create_dir_all(out_dir)?;

    let mut inputs = Vec::new();
    for entry in fs::read_dir(src_dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("txt") {
            inputs.push(path);
        }
    }
    inputs.sort();

    let counts = inputs
        .par_iter()
        .map(|path| {
            filter_file(path, out_dir, filter).map_err(|e| GridError::File {
                path: path.clone(),
                source: Box::new(e),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let report = counts.iter().fold(
        FilterReport {
            files: counts.len(),
            ..Default::default()
        },
        |mut acc, (read, kept)| {
            acc.lines_read += read;
            acc.lines_kept += kept;
            acc
        },
    );
    info!(
        "Filtered {} grid files: kept {} of {} records",
        report.files, report.lines_kept, report.lines_read
    );
    Ok(report)
}
