//! JSON record loading.
//!
//! Two corpus shapes feed the warehouse:
//! - catalog files hold exactly one JSON document describing a song and its
//!   performing artist
//! - activity log files hold one JSON event per line
//!
//! Either way the output is a flat sequence of key-value records. A malformed
//! line fails its whole file: partial recovery inside a file would silently
//! change which rows a run produces.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A flat key-value record extracted from an input file.
pub type Record = Map<String, Value>;

/// Errors raised while reading and parsing input files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path} at line {line}: {source}")]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Expected a JSON object in {path} at line {line}")]
    NotAnObject { path: PathBuf, line: usize },
}

fn read_to_string(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_object(text: &str, path: &Path, line: usize) -> Result<Record, LoadError> {
    let value: Value = serde_json::from_str(text).map_err(|source| LoadError::Malformed {
        path: path.to_path_buf(),
        line,
        source,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(LoadError::NotAnObject {
            path: path.to_path_buf(),
            line,
        }),
    }
}

/// Parse a whole file as a single JSON document (catalog mode).
pub fn load_document(path: &Path) -> Result<Record, LoadError> {
    let text = read_to_string(path)?;
    parse_object(&text, path, 1)
}

/// Parse each non-empty line of a file as an independent JSON document
/// (activity log mode).
pub fn load_lines(path: &Path) -> Result<Vec<Record>, LoadError> {
    let text = read_to_string(path)?;
    let mut records = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_object(line, path, index + 1)?);
    }
    Ok(records)
}

/// Load one record per file from a catalog file set.
pub fn load_documents(paths: &[PathBuf]) -> Result<Vec<Record>, LoadError> {
    paths.iter().map(|p| load_document(p)).collect()
}

/// Load every line-delimited record from a log file set, in file order.
pub fn load_line_records(paths: &[PathBuf]) -> Result<Vec<Record>, LoadError> {
    let mut records = Vec::new();
    for path in paths {
        records.append(&mut load_lines(path)?);
    }
    Ok(records)
}
