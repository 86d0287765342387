//! Utility functions for error handling
//!
//! Helpers for opening source files and for swallowing cleanup failures.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{ParWindowError, Result};

/// Open a source file read-only, mapping a missing file to `NotFound`
///
/// # Arguments
/// * `path` - The path to the file to open
///
/// # Returns
/// * `Result<fs::File>` - The opened file or a detailed error
pub fn open_source_file(path: &Path) -> Result<fs::File> {
    if !path.exists() {
        return Err(ParWindowError::NotFound {
            path: path.to_path_buf(),
        });
    }

    if !path.is_file() {
        return Err(ParWindowError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Path is not a file: {}", path.display()),
        )));
    }

    match fs::File::open(path) {
        Ok(file) => Ok(file),
        // Removed between the existence check and the open
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ParWindowError::NotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(ParWindowError::Io(e).with_path(path)),
    }
}

/// Log and discard an error raised while releasing a resource
///
/// Cleanup must never mask the primary result of an operation, so failures
/// here are reported at warn level only.
pub fn swallow_cleanup_error(what: &str, result: Result<()>) {
    if let Err(e) = result {
        log::warn!("Failed to release {what}: {e}");
    }
}
