//! Recursive discovery of ETL input files.
//!
//! Both corpora arrive as directory trees of `.json` files nested by hash
//! prefix (e.g. `song_data/A/A/B/TRAABCL128F4286650.json`), so discovery has
//! to recurse to arbitrary depth.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors raised while locating input files.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Data root does not exist or is not a directory: {0}")]
    RootNotFound(PathBuf),

    #[error("Failed to traverse data tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to resolve path {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Collect every file under `root` whose name ends with `suffix`, at any
/// depth. Returned paths are absolute and sorted, so runs over an unchanged
/// tree always process files in the same order.
///
/// A missing root is a hard error rather than an empty result: a typo'd data
/// path should abort the run before any insert, not produce an empty
/// warehouse.
pub fn collect_files(root: &Path, suffix: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    if !root.is_dir() {
        return Err(DiscoveryError::RootNotFound(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if !entry.file_name().to_string_lossy().ends_with(suffix) {
            continue;
        }
        let path = entry.into_path();
        let absolute = path
            .canonicalize()
            .map_err(|source| DiscoveryError::Resolve {
                path: path.clone(),
                source,
            })?;
        files.push(absolute);
    }

    files.sort();
    Ok(files)
}
