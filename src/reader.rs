//! File reader: loads the Markdown source, the template, and stylesheets.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::ConvertError;

/// Reads named resources into memory as UTF-8 text.
///
/// A missing path and an unreadable path are reported as different errors so
/// the caller can tell "typo in the path" apart from "permissions".
#[derive(Debug, Clone, Copy, Default)]
pub struct FileReader;

impl FileReader {
    pub fn new() -> Self {
        Self
    }

    /// Read the whole file at `path`. The handle is closed before returning.
    pub fn read(&self, path: &Path) -> Result<String, ConvertError> {
        log::debug!("reading '{}'", path.display());
        match fs::read_to_string(path) {
            Ok(text) => {
                log::debug!("read {} bytes from '{}'", text.len(), path.display());
                Ok(text)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ConvertError::InputNotFound {
                path: path.to_path_buf(),
            }),
            Err(e) => Err(ConvertError::InputUnreadable {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}
