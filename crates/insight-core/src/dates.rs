//! Invoice-date normalisation.
//!
//! Turns one raw cell of unknown representation into a canonical
//! `YYYY-MM-DD` key, or `None`. Resolution order, first success wins:
//!
//! 1. empty cell → `None`
//! 2. number → spreadsheet serial decomposition, then the epoch-offset
//!    fallback (`serial - 25569` days after 1970-01-01)
//! 3. general date/time text
//! 4. a `YYYY[/-]M[M][/-]D[D]` pattern anywhere in the text
//!
//! Month and day are always zero-padded, so string order is date order.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use regex::Regex;

use crate::models::CellValue;

/// Days between the spreadsheet epoch (serial 0 = 1899-12-30) and 1970-01-01.
pub const SPREADSHEET_EPOCH_OFFSET_DAYS: f64 = 25569.0;

/// Largest serial the decomposition accepts (9999-12-31).
const MAX_SERIAL: f64 = 2_958_465.0;

/// The phantom 1900-02-29 the 1900 date system carries.
const PHANTOM_LEAP_SERIAL: i64 = 60;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Largest absolute millisecond timestamp treated as a valid instant.
const MAX_TIMESTAMP_MILLIS: f64 = 8.64e15;

/// Written years below this are a short year misread by a `%Y` layout.
const MIN_TEXT_YEAR: i32 = 1000;

/// Keys stay fixed-width, so string order is date order.
const MAX_KEY_YEAR: i32 = 9999;

/// Offset-less date/time layouts, tried in order.
///
/// Two-digit-year layouts come first: chrono's `%Y` also takes one or two
/// digits and would read `12/1/10` as year 12.
const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%y %I:%M:%S %p",
    "%m/%d/%y %I:%M %p",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%b %d %Y %H:%M:%S",
    "%a %b %d %Y %H:%M:%S",
];

/// Date-only layouts, tried after [`DATETIME_FORMATS`].
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%a %b %d %Y",
];

/// Converts raw invoice-date cells into canonical day keys.
///
/// Instants (epoch-offset fallback, text with an explicit UTC offset) are
/// read in the configured timezone; naive text is taken as written.
#[derive(Debug, Clone)]
pub struct DateNormalizer {
    tz: Tz,
    ymd_pattern: Regex,
}

impl DateNormalizer {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            ymd_pattern: Regex::new(r"(\d{4})[/\-](\d{1,2})[/\-](\d{1,2})").expect("regex is valid"),
        }
    }

    /// Normalise one cell. Never fails; unrecognised input yields `None`.
    pub fn normalize(&self, cell: &CellValue) -> Option<String> {
        if cell.is_empty() {
            return None;
        }
        let text = match cell {
            CellValue::Empty => return None,
            CellValue::Text(s) => s.clone(),
            CellValue::Number(serial) => {
                let day = decompose_serial(*serial).or_else(|| self.epoch_offset_date(*serial));
                if let Some(day) = day {
                    return Some(day);
                }
                cell.to_string()
            }
        };

        self.parse_text(&text)
            .and_then(canonical)
            .or_else(|| self.match_ymd_pattern(&text))
    }

    /// Fallback for serials the decomposition rejects: treat the number as a
    /// day count from the spreadsheet epoch and read the instant in `tz`.
    fn epoch_offset_date(&self, serial: f64) -> Option<String> {
        let millis = ((serial - SPREADSHEET_EPOCH_OFFSET_DAYS) * SECONDS_PER_DAY * 1000.0).round();
        if !millis.is_finite() || millis.abs() > MAX_TIMESTAMP_MILLIS {
            return None;
        }
        let instant = DateTime::<Utc>::from_timestamp_millis(millis as i64)?;
        canonical(instant.with_timezone(&self.tz).date_naive())
    }

    /// General date/time text: RFC 3339, RFC 2822, then the naive layouts.
    fn parse_text(&self, text: &str) -> Option<NaiveDate> {
        let s = text.trim();
        if s.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&self.tz).date_naive());
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(dt.with_timezone(&self.tz).date_naive());
        }

        let written = |date: &NaiveDate| date.year() >= MIN_TEXT_YEAR;
        DATETIME_FORMATS
            .iter()
            .filter_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(|dt| dt.date())
            .find(written)
            .or_else(|| {
                DATE_FORMATS
                    .iter()
                    .filter_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                    .find(written)
            })
    }

    /// Last resort: `YYYY/M/D` or `YYYY-MM-DD` anywhere in the text.
    /// Month and day are padded but not range-checked.
    fn match_ymd_pattern(&self, text: &str) -> Option<String> {
        let caps = self.ymd_pattern.captures(text)?;
        Some(format!("{}-{:0>2}-{:0>2}", &caps[1], &caps[2], &caps[3]))
    }
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

/// Decompose a 1900-system serial into a calendar day.
///
/// Accepts `[1, 2958465]`. Serial 60 is the phantom 1900-02-29, later serials
/// are shifted back one day to skip it. A time fraction within 0.0001 s of
/// midnight rolls over to the next day, as long as that day is still in range.
pub fn decompose_serial(serial: f64) -> Option<String> {
    if !serial.is_finite() || !(1.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }

    let whole = serial.trunc();
    let mut day = whole as i64;
    let frac_secs = (serial - whole) * SECONDS_PER_DAY;
    let mut secs = frac_secs.floor();
    if frac_secs - secs > 0.9999 {
        secs += 1.0;
    }
    if secs >= SECONDS_PER_DAY {
        day += 1;
    }
    if day > MAX_SERIAL as i64 {
        return None;
    }

    if day == PHANTOM_LEAP_SERIAL {
        return Some("1900-02-29".to_string());
    }
    if day > PHANTOM_LEAP_SERIAL {
        day -= 1;
    }

    // Serial 1 is 1900-01-01.
    let base = NaiveDate::from_ymd_opt(1899, 12, 31)?;
    let date = base.checked_add_days(chrono::Days::new(u64::try_from(day).ok()?))?;
    canonical(date)
}

/// `YYYY-MM-DD` with zero-padded month and day; `None` outside years 0..=9999.
fn canonical(date: NaiveDate) -> Option<String> {
    if !(0..=MAX_KEY_YEAR).contains(&date.year()) {
        return None;
    }
    Some(format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
