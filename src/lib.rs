// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Print and export data from BMW CarData JSON exports.
//!
//! The BMW CarData portal exports vehicle telemetry as JSON files. This
//! crate loads such an export as a generic JSON tree and reports on it,
//! either by dumping the tree to a bounded depth or by extracting the two
//! record shapes it knows: charging-history sessions and tyre-diagnostics
//! readings.
//!
//! # Overview
//!
//! 1. [`loader`] reads and parses one export file
//! 2. [`walker`] traverses the document depth-first, up to a recursion limit
//! 3. [`records`] recognizes charging sessions and tyre readings
//! 4. [`report`] writes text or CSV to an output sink
//!
//! # Example
//!
//! ```no_run
//! use bmw_cardata::{loader, records::RecordFilter, report};
//! use std::path::Path;
//!
//! let doc = loader::load_document(Path::new("ladehistorie.json")).unwrap();
//!
//! let opts = report::ReportOptions {
//!     records: Some(RecordFilter::ChargingHistory),
//!     format: report::OutputFormat::Csv,
//!     ..Default::default()
//! };
//!
//! let mut reporter = report::Reporter::new(std::io::stdout(), opts);
//! reporter.report(&doc).unwrap();
//! reporter.finish().unwrap();
//! ```

#![deny(missing_docs)]

pub mod loader;
pub mod records;
pub mod report;
pub mod walker;
