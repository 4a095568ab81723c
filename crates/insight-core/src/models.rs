//! Core data types shared by every insight crate.
//!
//! Cells arrive from the workbook decoder as a closed [`CellValue`] variant;
//! the aggregation output is an [`AggregationResult`] that the presentation
//! layer consumes read-only.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ── CellValue ─────────────────────────────────────────────────────────────────

/// A single decoded spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    Text(String),
    Number(f64),
    #[default]
    Empty,
}

impl CellValue {
    /// `true` for [`CellValue::Empty`] and for text that is empty.
    ///
    /// Whitespace-only text is *not* empty here; callers trim first when
    /// that matters.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Stringify the cell and trim surrounding whitespace.
    pub fn trimmed_text(&self) -> String {
        self.to_string().trim().to_string()
    }
}

impl fmt::Display for CellValue {
    /// Integral numbers print without a fractional part (`17850.0` → `"17850"`),
    /// which keeps customer identifiers stable whether the decoder typed them
    /// as int or float.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e21 {
                    write!(f, "{}", *n as i128)
                } else {
                    write!(f, "{}", n)
                }
            }
            CellValue::Empty => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// One table row: an ordered sequence of cells, possibly shorter than the
/// header. Missing trailing cells read as [`CellValue::Empty`].
pub type RawRow = Vec<CellValue>;

// ── Aggregation output ────────────────────────────────────────────────────────

/// Distinct-customer count for one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryCount {
    pub country: String,
    pub customers: u64,
}

/// Final, immutable output of one aggregation run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    /// Countries in first-encounter order.
    pub countries: Vec<CountryCount>,
    /// Invoice rows per canonical `YYYY-MM-DD` day.
    pub date_counts: BTreeMap<String, u64>,
    /// Number of data rows consumed (header excluded).
    pub rows_processed: usize,
}

impl AggregationResult {
    /// `true` when the table held no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows_processed == 0
    }

    /// Country → distinct-customer count as a map.
    pub fn country_customer_counts(&self) -> BTreeMap<String, u64> {
        self.countries
            .iter()
            .map(|c| (c.country.clone(), c.customers))
            .collect()
    }

    /// Countries sorted by descending count; ties keep encounter order.
    pub fn ranked_countries(&self) -> Vec<CountryCount> {
        let mut ranked = self.countries.clone();
        // `sort_by` is stable.
        ranked.sort_by(|a, b| b.customers.cmp(&a.customers));
        ranked
    }

    /// `YYYY-MM` → sum of the day counts in that month.
    pub fn month_counts(&self) -> BTreeMap<String, u64> {
        let mut months: BTreeMap<String, u64> = BTreeMap::new();
        for (day, count) in &self.date_counts {
            *months.entry(month_key(day).to_string()).or_insert(0) += count;
        }
        months
    }

    /// Day entries whose month prefix equals `month`, ascending.
    pub fn days_in_month(&self, month: &str) -> Vec<(String, u64)> {
        self.date_counts
            .iter()
            .filter(|(day, _)| month_key(day) == month)
            .map(|(day, count)| (day.clone(), *count))
            .collect()
    }

    /// Sum of all day counts (rows with a recognised invoice date).
    pub fn dated_rows(&self) -> u64 {
        self.date_counts.values().sum()
    }
}

/// First seven characters of a canonical date key (`"2011-03-04"` → `"2011-03"`).
pub fn month_key(day: &str) -> &str {
    day.get(..7).unwrap_or(day)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
