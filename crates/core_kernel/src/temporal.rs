//! Business date handling
//!
//! Statements and invoice listings are filtered by calendar dates chosen by a
//! user, while ledger entries carry instants. This module resolves the former
//! into the latter:
//! - [`Timezone`] fixes which calendar the business works in
//! - [`DateRange`] is an inclusive, optionally open-ended range of dates
//! - [`TimeWindow`] is the half-open instant window a store filters on

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// Timezone wrapper for the business calendar
///
/// Wraps chrono_tz::Tz with string serialization ("Europe/Istanbul").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Tz::from_str(&s)
            .map(Timezone)
            .map_err(|_| serde::de::Error::custom(format!("Invalid timezone: {}", s)))
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Converts a UTC instant to the business calendar
    pub fn to_local(&self, utc: DateTime<Utc>) -> DateTime<Tz> {
        utc.with_timezone(&self.0)
    }

    /// Returns the business date an instant falls on
    pub fn date_of(&self, utc: DateTime<Utc>) -> NaiveDate {
        self.to_local(utc).date_naive()
    }

    /// Gets the first instant of `date` in this timezone as UTC
    ///
    /// Falls back to midnight UTC when local midnight is skipped by a DST gap.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        match self.0.from_local_datetime(&midnight).earliest() {
            Some(local) => local.with_timezone(&Utc),
            None => self.0.from_utc_datetime(&midnight).with_timezone(&Utc),
        }
    }

    /// Gets the first instant *after* `date` in this timezone as UTC
    ///
    /// Used as the exclusive upper bound of an inclusive end date.
    pub fn end_of_day_exclusive(&self, date: NaiveDate) -> DateTime<Utc> {
        match date.succ_opt() {
            Some(next) => self.start_of_day(next),
            None => self.start_of_day(date) + Duration::days(1),
        }
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::UTC)
    }
}

/// Errors related to date handling
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange {
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

/// Inclusive range of business dates with optional bounds
///
/// `end` covers the whole day: an entry stamped 23:59 on the end date is in
/// range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

/// Unvalidated bounds, checked by [`DateRange::new`] when deserializing
#[derive(Deserialize)]
struct RawDateRange {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = TemporalError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        DateRange::new(raw.start, raw.end)
    }
}

impl DateRange {
    /// Creates a range, rejecting a start after the end
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, TemporalError> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(TemporalError::InvalidRange { start, end });
            }
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    /// A range with neither bound
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Both dates inclusive
    pub fn between(start: NaiveDate, end: NaiveDate) -> Result<Self, TemporalError> {
        Self::new(Some(start), Some(end))
    }

    /// Parses optional `YYYY-MM-DD` strings as sent by callers
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, TemporalError> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| TemporalError::InvalidDate(s.to_string()))
        };
        Self::new(start.map(parse).transpose()?, end.map(parse).transpose()?)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }

    /// Resolves the dates to instants in the given business timezone
    pub fn to_window(&self, tz: &Timezone) -> TimeWindow {
        TimeWindow {
            from: self.start.map(|d| tz.start_of_day(d)),
            until: self.end.map(|d| tz.end_of_day_exclusive(d)),
        }
    }
}

/// Half-open window of instants: `from <= t < until`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// The window covering all of history
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| instant >= from)
            && self.until.map_or(true, |until| instant < until)
    }
}
