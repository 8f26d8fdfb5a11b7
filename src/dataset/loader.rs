//! Loader for `dataset.csv` files.
//!
//! The file must start with a header row. Columns are matched by name, so the
//! order in the file does not matter and extra columns are ignored.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{Dataset, TrainingRecord};
use crate::features::{FEATURE_COUNT, FEATURE_NAMES, FeatureVector};

/// Name of the label column.
pub const LABEL_COLUMN: &str = "is_ransomware";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("{path} not found.")]
    NotFound { path: PathBuf },
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("dataset is missing a header row")]
    MissingHeader,
    #[error("dataset is missing required column `{0}`")]
    MissingColumn(String),
    #[error("line {line}: {message}")]
    InvalidRow { line: usize, message: String },
}

/// Load a labeled dataset from a CSV file.
pub fn load_dataset(path: &Path) -> Result<Dataset, DatasetError> {
    let file = File::open(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => DatasetError::NotFound {
            path: path.to_path_buf(),
        },
        _ => DatasetError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let dataset = parse_dataset(BufReader::new(file)).map_err(|err| match err {
        DatasetError::Io { source, .. } => DatasetError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;
    tracing::info!(
        "Loaded {} rows ({} ransomware) from {}",
        dataset.len(),
        dataset.positives(),
        path.display()
    );
    Ok(dataset)
}

/// Parse CSV text from any reader.
pub fn parse_dataset<R: Read>(reader: BufReader<R>) -> Result<Dataset, DatasetError> {
    let mut lines = reader.lines().enumerate();
    let columns = loop {
        let Some((_, line)) = lines.next() else {
            return Err(DatasetError::MissingHeader);
        };
        let line = line.map_err(io_error)?;
        let line = line.trim_start_matches('\u{feff}');
        if line.trim().is_empty() {
            continue;
        }
        break ColumnMap::from_header(line)?;
    };

    let mut dataset = Dataset::default();
    for (idx, line) in lines {
        let line = line.map_err(io_error)?;
        if line.trim().is_empty() {
            continue;
        }
        let record = columns
            .parse_row(&line)
            .map_err(|message| DatasetError::InvalidRow {
                line: idx + 1,
                message,
            })?;
        dataset.push(record);
    }
    Ok(dataset)
}

fn io_error(source: std::io::Error) -> DatasetError {
    DatasetError::Io {
        path: PathBuf::new(),
        source,
    }
}

/// Positions of the required columns within a row.
#[derive(Debug)]
struct ColumnMap {
    features: [usize; FEATURE_COUNT],
    label: usize,
    width: usize,
}

impl ColumnMap {
    fn from_header(line: &str) -> Result<Self, DatasetError> {
        let names: BTreeMap<String, usize> = split_fields(line)
            .enumerate()
            .map(|(idx, name)| (name.to_ascii_lowercase(), idx))
            .collect();
        let lookup = |name: &str| {
            names
                .get(name)
                .copied()
                .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
        };
        let mut features = [0usize; FEATURE_COUNT];
        for (slot, name) in features.iter_mut().zip(FEATURE_NAMES) {
            *slot = lookup(name)?;
        }
        let label = lookup(LABEL_COLUMN)?;
        let width = features.iter().copied().chain([label]).max().unwrap_or(0) + 1;
        Ok(Self {
            features,
            label,
            width,
        })
    }

    fn parse_row(&self, line: &str) -> Result<TrainingRecord, String> {
        let fields: Vec<&str> = split_fields(line).collect();
        if fields.len() < self.width {
            return Err(format!(
                "expected at least {} fields, found {}",
                self.width,
                fields.len()
            ));
        }
        let mut values = [0.0f64; FEATURE_COUNT];
        for ((value, &column), name) in values.iter_mut().zip(&self.features).zip(FEATURE_NAMES) {
            let raw = fields[column];
            *value = raw
                .parse::<f64>()
                .map_err(|_| format!("invalid {name} value `{raw}`"))?;
        }
        let is_ransomware = parse_label(fields[self.label])?;
        Ok(TrainingRecord {
            features: FeatureVector::from_array(values),
            is_ransomware,
        })
    }
}

fn split_fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(',')
        .map(|field| field.trim().trim_matches('"').trim())
}

fn parse_label(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" => return Ok(true),
        "0" | "false" => return Ok(false),
        _ => {}
    }
    match raw.parse::<f64>() {
        Ok(value) if value == 1.0 => Ok(true),
        Ok(value) if value == 0.0 => Ok(false),
        _ => Err(format!("invalid {LABEL_COLUMN} value `{raw}`")),
    }
}
