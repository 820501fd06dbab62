#![forbid(unsafe_code)]

//! Compact genealogical dates.
//!
//! Dates travel as `YYYYMMDD` strings, optionally prefixed with `-` to mark a
//! year before the common era. A `00` month or day means "unknown". Anything
//! else (wrong length, non-digits, month 13, year 0000) is treated as no date
//! at all rather than an error, so a single bad record never blocks a layout.
//!
//! # Invariants
//!
//! 1. `parse_date` never fails; malformed input yields [`DateParts::NONE`].
//! 2. A date with an unknown year has no month or day either.
//! 3. [`compare_date`] sorts every real date before every missing one.

use std::cmp::Ordering;

/// Marker prefix for years before the common era.
pub const BCE_MARKER: char = '-';

/// A parsed date with independently optional components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DateParts {
    pub year: Option<i32>,
    pub month: Option<u8>,
    pub day: Option<u8>,
}

impl DateParts {
    /// The "no date" value.
    pub const NONE: Self = Self {
        year: None,
        month: None,
        day: None,
    };

    /// True when at least the year is known.
    #[inline]
    pub const fn is_known(&self) -> bool {
        self.year.is_some()
    }

    /// Numeric sort key `year*10000 + month*100 + day`, unknown parts as 0.
    ///
    /// Returns `None` when the year is unknown.
    pub fn sort_key(&self) -> Option<i64> {
        let year = i64::from(self.year?);
        let month = i64::from(self.month.unwrap_or(0));
        let day = i64::from(self.day.unwrap_or(0));
        Some(year * 10_000 + month * 100 + day)
    }
}

/// Parse a `[-]YYYYMMDD` string.
#[must_use]
pub fn parse_date(raw: Option<&str>) -> DateParts {
    let Some(raw) = raw.map(str::trim) else {
        return DateParts::NONE;
    };
    let (negative, digits) = match raw.strip_prefix(BCE_MARKER) {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return DateParts::NONE;
    }

    let (Ok(year), Ok(month), Ok(day)) = (
        digits[0..4].parse::<i32>(),
        digits[4..6].parse::<u8>(),
        digits[6..8].parse::<u8>(),
    ) else {
        return DateParts::NONE;
    };
    if year == 0 || month > 12 || day > 31 {
        return DateParts::NONE;
    }

    let month = (month != 0).then_some(month);
    DateParts {
        year: Some(if negative { -year } else { year }),
        month,
        // A day without a month carries no ordering information.
        day: month.and((day != 0).then_some(day)),
    }
}

/// Chronological comparison; missing dates sort last.
#[must_use]
pub fn compare_date(a: &DateParts, b: &DateParts) -> Ordering {
    match (a.sort_key(), b.sort_key()) {
        (Some(ka), Some(kb)) => ka.cmp(&kb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Whether the raw string carries a real (year-bearing) date.
#[inline]
#[must_use]
pub fn has_actual_date(raw: Option<&str>) -> bool {
    parse_date(raw).is_known()
}
