// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Recognition of the record shapes found in CarData exports.
//!
//! Two shapes are known:
//!
//! - **Charging history** ("Ladehistorie"): one object per charging session,
//!   with state of charge, energy drawn from the grid and energy stored in
//!   the high-voltage battery.
//! - **Tyre diagnostics** ("Reifendiagnose"): one object per wheel with the
//!   current and target pressure (bar) and the tyre temperature (°C).
//!
//! An object is a record when it carries the full key set of a shape and
//! the values have the expected types. Records are searched anywhere in the
//! document, so it does not matter whether the export wraps them in a list
//! or in another object.
//!
//! # Example
//!
//! ```
//! use bmw_cardata::records::{find_records, Record, RecordFilter};
//! use serde_json::json;
//!
//! let doc = json!([{
//!     "wheelPosition": "FRONT_LEFT",
//!     "currentPressure": 2.3,
//!     "targetPressure": 2.5,
//!     "temperature": 18.0
//! }]);
//!
//! let records: Vec<Record> = find_records(&doc, None, RecordFilter::All).collect();
//! assert_eq!(records.len(), 1);
//! ```

use crate::walker::{Walk, walk};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

/// The record shapes this tool understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A charging-history session.
    ChargingSession,
    /// A tyre-diagnostics reading for one wheel.
    TyreDiagnosis,
}

impl RecordKind {
    /// Keys an object must contain to be considered this kind of record.
    #[must_use]
    pub const fn required_keys(self) -> &'static [&'static str] {
        match self {
            Self::ChargingSession => &[
                "displayedSoc",
                "displayedStartSoc",
                "endTime",
                "energyConsumedFromPowerGridKwh",
                "energyIncreaseHvbKwh",
                "isPreconditioningActivated",
                "mileage",
                "mileageUnits",
                "startTime",
                "timeZone",
                "totalChargingDurationSec",
            ],
            Self::TyreDiagnosis => &[
                "wheelPosition",
                "currentPressure",
                "targetPressure",
                "temperature",
            ],
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ChargingSession => "charging session",
            Self::TyreDiagnosis => "tyre diagnosis",
        })
    }
}

/// Which record kinds to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFilter {
    /// Both charging sessions and tyre diagnoses.
    All,
    /// Charging sessions only (`-L`).
    ChargingHistory,
    /// Tyre diagnoses only (`-R`).
    TyreDiagnostics,
}

impl RecordFilter {
    /// Returns `true` if records of `kind` pass this filter.
    #[must_use]
    pub const fn accepts(self, kind: RecordKind) -> bool {
        matches!(
            (self, kind),
            (Self::All, _)
                | (Self::ChargingHistory, RecordKind::ChargingSession)
                | (Self::TyreDiagnostics, RecordKind::TyreDiagnosis)
        )
    }

    /// The kinds this filter accepts, in matching order.
    fn kinds(self) -> impl Iterator<Item = RecordKind> {
        [RecordKind::ChargingSession, RecordKind::TyreDiagnosis]
            .into_iter()
            .filter(move |kind| self.accepts(*kind))
    }
}

/// One charging session from the charging history.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingSession {
    /// State of charge in percent when charging started.
    pub displayed_start_soc: f64,
    /// State of charge in percent when charging ended.
    pub displayed_soc: f64,
    /// Unix timestamp (seconds) of the session start.
    #[serde(deserialize_with = "truncated_integer")]
    pub start_time: i64,
    /// Unix timestamp (seconds) of the session end.
    #[serde(deserialize_with = "truncated_integer")]
    pub end_time: i64,
    /// IANA time zone name of the charging location, e.g. `Europe/Berlin`.
    pub time_zone: String,
    /// Total time spent charging, in seconds.
    #[serde(deserialize_with = "truncated_integer")]
    pub total_charging_duration_sec: i64,
    /// Energy drawn from the grid, in kWh.
    pub energy_consumed_from_power_grid_kwh: f64,
    /// Energy stored in the high-voltage battery, in kWh.
    pub energy_increase_hvb_kwh: f64,
    /// Whether battery preconditioning was active.
    pub is_preconditioning_activated: bool,
    /// Odometer reading at the start of the session.
    #[serde(deserialize_with = "truncated_integer")]
    pub mileage: i64,
    /// Unit of [`mileage`](Self::mileage), e.g. `KM`.
    pub mileage_units: String,
}

/// Reads any JSON number as an integer, dropping a fractional part.
#[allow(clippy::cast_possible_truncation)]
fn truncated_integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let number = serde_json::Number::deserialize(deserializer)?;
    number
        .as_i64()
        .or_else(|| {
            number
                .as_f64()
                .filter(|f| f.is_finite() && f.abs() < 9.2e18)
                .map(|f| f.trunc() as i64)
        })
        .ok_or_else(|| D::Error::custom(format!("{number} is out of range")))
}

impl ChargingSession {
    /// Time zone of the charging location.
    ///
    /// `None` if [`time_zone`](Self::time_zone) is not a known IANA name.
    #[must_use]
    pub fn zone(&self) -> Option<Tz> {
        self.time_zone.parse().ok()
    }

    /// Session start in the local time of the charging location.
    ///
    /// Falls back to UTC for an unknown zone; `None` if the timestamp is out
    /// of range.
    #[must_use]
    pub fn start(&self) -> Option<DateTime<Tz>> {
        self.local_time(self.start_time)
    }

    /// Session end in the local time of the charging location, see [`start`](Self::start).
    #[must_use]
    pub fn end(&self) -> Option<DateTime<Tz>> {
        self.local_time(self.end_time)
    }

    fn local_time(&self, timestamp: i64) -> Option<DateTime<Tz>> {
        let zone = self.zone().unwrap_or(Tz::UTC);
        DateTime::from_timestamp(timestamp, 0).map(|dt| dt.with_timezone(&zone))
    }

    /// Charging duration in whole minutes, truncated.
    #[must_use]
    pub const fn duration_minutes(&self) -> i64 {
        self.total_charging_duration_sec / 60
    }

    /// Share of grid energy that did not reach the battery, in percent.
    ///
    /// Zero when no grid energy was recorded.
    #[must_use]
    pub fn loss_percent(&self) -> f64 {
        let consumed = self.energy_consumed_from_power_grid_kwh;
        if consumed > 0.0 {
            (consumed - self.energy_increase_hvb_kwh) / consumed * 100.0
        } else {
            0.0
        }
    }
}

/// One tyre-diagnostics reading.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TyreDiagnosis {
    /// Wheel the reading belongs to, e.g. `FRONT_LEFT`.
    pub wheel_position: String,
    /// Measured pressure in bar.
    pub current_pressure: f64,
    /// Recommended pressure in bar.
    pub target_pressure: f64,
    /// Tyre temperature in °C.
    pub temperature: f64,
    /// Unix timestamp (seconds) of the reading, if exported.
    pub timestamp: Option<i64>,
    /// Remaining tread depth in mm, if exported.
    pub tread_depth: Option<f64>,
}

impl TyreDiagnosis {
    /// Time of the reading, `None` if absent or out of range.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }

    /// Measured minus target pressure, in bar.
    #[must_use]
    pub fn deviation(&self) -> f64 {
        self.current_pressure - self.target_pressure
    }
}

/// A record recognized in a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// A charging-history session.
    Charging(ChargingSession),
    /// A tyre-diagnostics reading.
    Tyre(TyreDiagnosis),
}

impl Record {
    /// The shape of this record.
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Charging(_) => RecordKind::ChargingSession,
            Self::Tyre(_) => RecordKind::TyreDiagnosis,
        }
    }

    /// Interprets `value` as a record of a kind accepted by `filter`.
    ///
    /// Returns `None` if `value` is not an object, lacks the key set of
    /// every accepted kind, or has values of the wrong type.
    #[must_use]
    pub fn from_value(value: &Value, filter: RecordFilter) -> Option<Self> {
        let Value::Object(map) = value else {
            return None;
        };

        for kind in filter.kinds() {
            if !kind.required_keys().iter().all(|key| map.contains_key(*key)) {
                continue;
            }
            let parsed = match kind {
                RecordKind::ChargingSession => ChargingSession::deserialize(value).map(Self::Charging),
                RecordKind::TyreDiagnosis => TyreDiagnosis::deserialize(value).map(Self::Tyre),
            };
            match parsed {
                Ok(Self::Charging(session)) if session.zone().is_none() => {
                    log::warn!(
                        "unknown time zone '{}', showing charging times in UTC",
                        session.time_zone
                    );
                    return Some(Self::Charging(session));
                }
                Ok(record) => return Some(record),
                Err(e) => log::warn!("skipping object with {kind} keys: {e}"),
            }
        }
        None
    }
}

/// Lazy iterator over the records of a document.
///
/// Created by [`find_records`].
#[derive(Debug)]
pub struct Records<'a> {
    walk: Walk<'a>,
    filter: RecordFilter,
}

impl Iterator for Records<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.walk.next() {
            if let Some(record) = Record::from_value(node.value, self.filter) {
                log::debug!("found {} at '{}'", record.kind(), node.path);
                // Records do not nest.
                self.walk.skip_subtree();
                return Some(record);
            }
        }
        None
    }
}

/// Finds the records accepted by `filter` in `doc`, in document order.
///
/// Objects below the recursion `limit` are not searched.
#[must_use]
pub fn find_records(doc: &Value, limit: Option<usize>, filter: RecordFilter) -> Records<'_> {
    Records {
        walk: walk(doc, limit),
        filter,
    }
}
