// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Text and CSV output for loaded exports.
//!
//! A [`Reporter`] owns the output sink for a whole run and is fed one
//! document at a time. Output is written as it is produced.
//!
//! # Output Format
//!
//! Without a record filter the document itself is printed:
//!
//! - text: one `key = value` line per node, indented by depth, containers
//!   shown as `{...}` or `[...]`
//! - CSV: one `path,value` row per scalar
//!
//! With a record filter only matched records are printed:
//!
//! - text: a short summary block per record
//! - CSV: one row per record, with a fixed column order per record kind
//!
//! # Example
//!
//! ```
//! use bmw_cardata::report::{ReportOptions, Reporter};
//! use serde_json::json;
//!
//! let opts = ReportOptions {
//!     limit: Some(1),
//!     ..Default::default()
//! };
//! let mut reporter = Reporter::new(Vec::new(), opts);
//! reporter.report(&json!({"a": {"b": 1, "c": 2}})).unwrap();
//!
//! let out = String::from_utf8(reporter.finish().unwrap()).unwrap();
//! assert_eq!(out, "a = {...}\n");
//! ```

use crate::records::{ChargingSession, Record, RecordFilter, TyreDiagnosis, find_records};
use crate::walker::{Node, PathSegment, leaves, walk};
use chrono::{DateTime, SecondsFormat, TimeZone};
use serde::Serialize;
use serde_json::Value;
use snafu::prelude::*;
use std::fmt::Display;
use std::io::Write;

/// Error type for writing a report.
#[derive(Debug, Snafu)]
pub enum ReportError {
    /// Writing to the output sink failed.
    #[snafu(display("failed to write output: {source}"))]
    Write {
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Writing a CSV row failed.
    #[snafu(display("failed to write CSV output: {source}"))]
    Csv {
        /// The underlying CSV error.
        source: csv::Error,
    },
}

/// Output representation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// Comma-separated values with a header row.
    Csv,
}

/// Configuration options for a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// Maximum traversal depth below the document root, `None` for no limit.
    pub limit: Option<usize>,

    /// Record kinds to extract.
    ///
    /// `None` prints the document tree instead of records.
    pub records: Option<RecordFilter>,

    /// Text or CSV.
    pub format: OutputFormat,
}

enum Sink<W: Write> {
    Text(W),
    Csv(csv::Writer<W>),
}

/// Writes reports for a sequence of documents to one sink.
///
/// In CSV mode the header row is written once, before the first row of the
/// run, so all documents of a run must produce rows of the same layout.
pub struct Reporter<W: Write> {
    sink: Sink<W>,
    options: ReportOptions,
}

impl<W: Write> Reporter<W> {
    /// Creates a reporter writing to `writer`.
    pub fn new(writer: W, options: ReportOptions) -> Self {
        let sink = match options.format {
            OutputFormat::Text => Sink::Text(writer),
            OutputFormat::Csv => Sink::Csv(csv::Writer::from_writer(writer)),
        };
        Self { sink, options }
    }

    /// Writes the report for one document and flushes the sink.
    ///
    /// Returns the number of records written when a record filter is set,
    /// otherwise the number of lines (text) or rows (CSV).
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the sink fails, including rows still
    /// buffered from this document.
    pub fn report(&mut self, doc: &Value) -> Result<usize, ReportError> {
        let count = match self.options.records {
            Some(filter) => self.report_records(doc, filter),
            None => self.report_tree(doc),
        }?;

        // Write failures belong to the document that produced the rows.
        let flushed = match &mut self.sink {
            Sink::Text(out) => out.flush(),
            Sink::Csv(out) => out.flush(),
        };
        flushed.context(WriteSnafu)?;
        Ok(count)
    }

    /// Flushes the sink and returns the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn finish(self) -> Result<W, ReportError> {
        match self.sink {
            Sink::Text(mut out) => {
                out.flush().context(WriteSnafu)?;
                Ok(out)
            }
            Sink::Csv(out) => out
                .into_inner()
                .map_err(csv::IntoInnerError::into_error)
                .context(WriteSnafu),
        }
    }

    fn report_records(&mut self, doc: &Value, filter: RecordFilter) -> Result<usize, ReportError> {
        let mut count = 0;
        for (index, record) in find_records(doc, self.options.limit, filter).enumerate() {
            match &mut self.sink {
                Sink::Text(out) => write_record_text(out, index, &record).context(WriteSnafu)?,
                Sink::Csv(out) => write_record_csv(out, &record).context(CsvSnafu)?,
            }
            count += 1;
        }
        Ok(count)
    }

    fn report_tree(&mut self, doc: &Value) -> Result<usize, ReportError> {
        let mut count = 0;
        match &mut self.sink {
            Sink::Text(out) => {
                for node in walk(doc, self.options.limit) {
                    // A container root has no line of its own.
                    if node.depth() == 0 && !node.is_leaf() {
                        continue;
                    }
                    write_node_text(out, &node).context(WriteSnafu)?;
                    count += 1;
                }
            }
            Sink::Csv(out) => {
                for node in leaves(doc, self.options.limit) {
                    out.serialize(LeafRow {
                        path: node.path.to_string(),
                        value: scalar_text(node.value),
                    })
                    .context(CsvSnafu)?;
                    count += 1;
                }
            }
        }
        Ok(count)
    }
}

fn write_node_text(out: &mut impl Write, node: &Node<'_>) -> std::io::Result<()> {
    let value = match node.value {
        Value::Object(_) => "{...}".to_owned(),
        Value::Array(_) => "[...]".to_owned(),
        scalar => scalar.to_string(),
    };

    let indent = "  ".repeat(node.depth().saturating_sub(1));
    match node.path.last() {
        Some(PathSegment::Key(key)) => writeln!(out, "{indent}{key} = {value}"),
        Some(PathSegment::Index(index)) => writeln!(out, "{indent}[{index}] = {value}"),
        None => writeln!(out, "{value}"),
    }
}

/// Returns the CSV cell text for a scalar: strings unquoted, others as JSON.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_time<Z: TimeZone>(time: Option<DateTime<Z>>, fmt: &str) -> String
where
    Z::Offset: Display,
{
    time.map_or_else(
        || "(invalid time)".to_owned(),
        |dt| dt.format(fmt).to_string(),
    )
}

fn csv_time<Z: TimeZone>(time: Option<DateTime<Z>>) -> String
where
    Z::Offset: Display,
{
    time.map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn write_record_text(out: &mut impl Write, index: usize, record: &Record) -> std::io::Result<()> {
    match record {
        Record::Charging(session) => write_charging_text(out, index, session),
        Record::Tyre(tyre) => write_tyre_text(out, index, tyre),
    }
}

fn write_charging_text(
    out: &mut impl Write,
    index: usize,
    session: &ChargingSession,
) -> std::io::Result<()> {
    writeln!(
        out,
        "[{index}] Charging session {} / {} min",
        format_time(session.start(), "%Y-%m-%d %H:%M"),
        session.duration_minutes()
    )?;
    writeln!(
        out,
        "  {} {}",
        session.mileage,
        session.mileage_units.to_lowercase()
    )?;
    writeln!(
        out,
        "  {}% -> {}%  {:.2} grid {:.2} battery kWh, loss {:.1}%",
        session.displayed_start_soc,
        session.displayed_soc,
        session.energy_consumed_from_power_grid_kwh,
        session.energy_increase_hvb_kwh,
        session.loss_percent()
    )
}

fn write_tyre_text(out: &mut impl Write, index: usize, tyre: &TyreDiagnosis) -> std::io::Result<()> {
    match tyre.time() {
        Some(time) => writeln!(
            out,
            "[{index}] Tyre {} / {}",
            tyre.wheel_position,
            format_time(Some(time), "%Y-%m-%d %H:%M UTC")
        )?,
        None => writeln!(out, "[{index}] Tyre {}", tyre.wheel_position)?,
    }

    write!(
        out,
        "  {:.2} bar (target {:.2} bar, {:+.2}), {:.1} °C",
        tyre.current_pressure,
        tyre.target_pressure,
        tyre.deviation(),
        tyre.temperature
    )?;
    if let Some(depth) = tyre.tread_depth {
        write!(out, ", tread {depth:.1} mm")?;
    }
    writeln!(out)
}

fn write_record_csv<W: Write>(out: &mut csv::Writer<W>, record: &Record) -> csv::Result<()> {
    match record {
        Record::Charging(session) => out.serialize(ChargingRow::from(session)),
        Record::Tyre(tyre) => out.serialize(TyreRow::from(tyre)),
    }
}

#[derive(Serialize)]
struct LeafRow {
    path: String,
    value: String,
}

#[derive(Serialize)]
struct ChargingRow<'a> {
    start: String,
    end: String,
    time_zone: &'a str,
    duration_min: i64,
    mileage: i64,
    mileage_units: &'a str,
    start_soc: f64,
    end_soc: f64,
    grid_kwh: f64,
    battery_kwh: f64,
    loss_pct: String,
    preconditioning: bool,
}

impl<'a> From<&'a ChargingSession> for ChargingRow<'a> {
    fn from(session: &'a ChargingSession) -> Self {
        Self {
            start: csv_time(session.start()),
            end: csv_time(session.end()),
            time_zone: &session.time_zone,
            duration_min: session.duration_minutes(),
            mileage: session.mileage,
            mileage_units: &session.mileage_units,
            start_soc: session.displayed_start_soc,
            end_soc: session.displayed_soc,
            grid_kwh: session.energy_consumed_from_power_grid_kwh,
            battery_kwh: session.energy_increase_hvb_kwh,
            loss_pct: format!("{:.1}", session.loss_percent()),
            preconditioning: session.is_preconditioning_activated,
        }
    }
}

#[derive(Serialize)]
struct TyreRow<'a> {
    timestamp: String,
    wheel_position: &'a str,
    current_pressure: f64,
    target_pressure: f64,
    deviation: String,
    temperature: f64,
    tread_depth: Option<f64>,
}

impl<'a> From<&'a TyreDiagnosis> for TyreRow<'a> {
    fn from(tyre: &'a TyreDiagnosis) -> Self {
        Self {
            timestamp: csv_time(tyre.time()),
            wheel_position: &tyre.wheel_position,
            current_pressure: tyre.current_pressure,
            target_pressure: tyre.target_pressure,
            deviation: format!("{:.2}", tyre.deviation()),
            temperature: tyre.temperature,
            tread_depth: tyre.tread_depth,
        }
    }
}
