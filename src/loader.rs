// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Loading of BMW CarData JSON exports.
//!
//! The portal exports are read as a generic JSON tree rather than a fixed
//! schema: the same tool handles charging history, tyre diagnostics and any
//! other export the portal produces. Object keys keep the order they have
//! in the file.
//!
//! # Example
//!
//! ```
//! use bmw_cardata::loader::parse_document;
//!
//! let doc = parse_document(r#"[{"mileage": 12345}]"#).unwrap();
//! assert_eq!(doc[0]["mileage"], 12345);
//! ```

use serde_json::Value;
use snafu::prelude::*;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Error type for loading an export file.
#[derive(Debug, Snafu)]
pub enum LoadError {
    /// The input file does not exist.
    #[snafu(display("{}: file not found", path.display()))]
    NotFound {
        /// The missing file.
        path: PathBuf,
    },

    /// The input file exists but could not be read.
    #[snafu(display("failed to read {}: {source}", path.display()))]
    Read {
        /// The unreadable file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The content is not valid JSON.
    #[snafu(display("failed to parse {}: {source}", path.display()))]
    Parse {
        /// The file with malformed content, empty for in-memory input.
        path: PathBuf,
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the file this error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path } | Self::Read { path, .. } | Self::Parse { path, .. } => path,
        }
    }
}

/// Parses JSON text into a document tree.
///
/// # Errors
///
/// Returns [`LoadError::Parse`] with an empty path if `json` is not valid JSON.
pub fn parse_document(json: &str) -> Result<Value, LoadError> {
    serde_json::from_str(json).context(ParseSnafu {
        path: PathBuf::new(),
    })
}

/// Reads and parses the export file at `path`.
///
/// # Errors
///
/// Returns [`LoadError::NotFound`] if the file does not exist,
/// [`LoadError::Read`] if it cannot be read, and [`LoadError::Parse`] if
/// its content is not valid JSON.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == ErrorKind::NotFound => return NotFoundSnafu { path }.fail(),
        Err(e) => return Err(e).context(ReadSnafu { path }),
    };
    log::debug!("read {} bytes from {}", json.len(), path.display());

    serde_json::from_str(&json).context(ParseSnafu { path })
}
