//! Cycle anchors
//!
//! A cycle is one calendar month of league scoring. Its anchor id is
//! `year * 12 + month` with `month` in `1..=12`, which makes consecutive
//! months consecutive integers (December 2025 = 24312, January 2026 = 24313).

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Identifies one scoring cycle and the date it started
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CycleAnchor {
    /// `year * 12 + month`
    pub id: i64,
    /// First day of the cycle's month
    pub starts_on: NaiveDate,
}

impl CycleAnchor {
    /// Anchor of the month containing `date`
    pub fn from_date(date: NaiveDate) -> Self {
        let id = i64::from(date.year()) * 12 + i64::from(date.month());
        // Day 1 of a month that `date` belongs to always exists.
        let starts_on = date.with_day(1).unwrap_or(date);
        Self { id, starts_on }
    }

    /// Anchor for a cycle id
    pub fn from_id(id: i64) -> Result<Self, TypesError> {
        let zero_based = id - 1;
        let year = i32::try_from(zero_based.div_euclid(12))
            .map_err(|_| TypesError::InvalidCycle(format!("cycle id {} out of range", id)))?;
        let month = (zero_based.rem_euclid(12) + 1) as u32;
        let starts_on = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| TypesError::InvalidCycle(format!("cycle id {} out of range", id)))?;
        Ok(Self { id, starts_on })
    }

    /// Anchor of the current month
    pub fn current() -> Self {
        Self::at(Utc::now())
    }

    /// Anchor of the month containing `instant`
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self::from_date(instant.date_naive())
    }

    /// The cycle after this one
    pub fn next(&self) -> Result<Self, TypesError> {
        Self::from_id(self.id + 1)
    }

    /// The cycle before this one
    pub fn previous(&self) -> Result<Self, TypesError> {
        Self::from_id(self.id - 1)
    }

    /// Calendar year of the cycle
    pub fn year(&self) -> i32 {
        self.starts_on.year()
    }

    /// Calendar month of the cycle (1-12)
    pub fn month(&self) -> u32 {
        self.starts_on.month()
    }

    /// `YYYY-MM` label
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year(), self.month())
    }
}

impl fmt::Display for CycleAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.label(), self.id)
    }
}

impl FromStr for CycleAnchor {
    type Err = TypesError;

    /// Parse a `YYYY-MM` label
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| TypesError::InvalidCycle(format!("expected YYYY-MM, got '{}'", s)))?;
        let year: i32 = year
            .parse()
            .map_err(|_| TypesError::InvalidCycle(format!("invalid year in '{}'", s)))?;
        let month: u32 = month
            .parse()
            .map_err(|_| TypesError::InvalidCycle(format!("invalid month in '{}'", s)))?;
        let date = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| TypesError::InvalidCycle(format!("no such month '{}'", s)))?;
        Ok(Self::from_date(date))
    }
}
