//! Data validation utilities.
//!
//! Every `.ron` file under a path is parsed as a catalog and checked the
//! same way the engine checks catalogs it loads, so a file that passes
//! here loads in the game.

use std::path::{Path, PathBuf};

use tycoon_core::catalog::Catalog;
use tycoon_core::error::{GameError, Result};

/// Outcome of validating one or more data files.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Files that loaded cleanly.
    pub passed: Vec<PathBuf>,
    /// Files that failed, with the reason.
    pub failed: Vec<(PathBuf, GameError)>,
}

impl ValidationReport {
    /// Whether every file passed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of files checked.
    #[must_use]
    pub fn checked(&self) -> usize {
        self.passed.len() + self.failed.len()
    }
}

/// Validate a single catalog file.
///
/// # Errors
///
/// Returns [`GameError::DataParseError`] if the file cannot be read,
/// does not parse, or fails catalog validation.
pub fn validate_file(path: &Path) -> Result<Catalog> {
    Catalog::from_ron_file(path)
}

/// Validate a catalog file, or every `.ron` file in a directory tree.
///
/// Individual file failures are collected in the report rather than
/// returned, so one bad file does not hide the others.
///
/// # Errors
///
/// Returns [`GameError::DataParseError`] if the path does not exist or a
/// directory cannot be listed.
pub fn validate_data_path(path: &Path) -> Result<ValidationReport> {
    if !path.exists() {
        return Err(GameError::DataParseError {
            path: path.display().to_string(),
            message: "path does not exist".to_string(),
        });
    }

    let files = if path.is_dir() {
        let mut files = Vec::new();
        collect_ron_files(path, &mut files)?;
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut report = ValidationReport::default();
    for file in files {
        match validate_file(&file) {
            Ok(catalog) => {
                tracing::info!(
                    path = %file.display(),
                    resources = catalog.resources().len(),
                    buildings = catalog.models().len(),
                    achievements = catalog.achievements().len(),
                    events = catalog.events().len(),
                    "OK"
                );
                report.passed.push(file);
            }
            Err(e) => {
                tracing::error!(path = %file.display(), "{e}");
                report.failed.push((file, e));
            }
        }
    }
    Ok(report)
}

fn collect_ron_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let listing_error = |e: std::io::Error| GameError::DataParseError {
        path: dir.display().to_string(),
        message: e.to_string(),
    };

    for entry in std::fs::read_dir(dir).map_err(listing_error)? {
        let path = entry.map_err(listing_error)?.path();
        if path.is_dir() {
            collect_ron_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "ron") {
            files.push(path);
        }
    }
    Ok(())
}

/// Write the standard catalog as RON, a starting point for custom data.
///
/// # Errors
///
/// Returns [`GameError::DataParseError`] if encoding or writing fails.
pub fn export_standard_catalog(path: &Path) -> Result<()> {
    let write_error = |message: String| GameError::DataParseError {
        path: path.display().to_string(),
        message,
    };

    let config = ron::ser::PrettyConfig::default().struct_names(true);
    let text = ron::ser::to_string_pretty(&Catalog::standard().to_data(), config)
        .map_err(|e| write_error(e.to_string()))?;
    std::fs::write(path, text).map_err(|e| write_error(e.to_string()))
}
