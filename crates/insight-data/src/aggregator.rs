//! Streaming per-country and per-day aggregation.

use std::collections::{BTreeMap, HashMap, HashSet};

use insight_core::columns::{cell_at, HeaderIndex};
use insight_core::dates::DateNormalizer;
use insight_core::models::{AggregationResult, CountryCount, RawRow};

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Consumes data rows one at a time in input order.
///
/// Tracks the set of distinct customer identifiers per country (countries in
/// first-encounter order) and the number of rows per canonical invoice day.
#[derive(Debug, Clone)]
pub struct Aggregator {
    header: HeaderIndex,
    normalizer: DateNormalizer,
    countries: Vec<(String, HashSet<String>)>,
    country_slots: HashMap<String, usize>,
    date_counts: BTreeMap<String, u64>,
    rows_processed: usize,
}

impl Aggregator {
    pub fn new(header: HeaderIndex, normalizer: DateNormalizer) -> Self {
        Self {
            header,
            normalizer,
            countries: Vec::new(),
            country_slots: HashMap::new(),
            date_counts: BTreeMap::new(),
            rows_processed: 0,
        }
    }

    /// Fold one data row into the running state.
    ///
    /// Empty countries are skipped; an empty customer still registers the
    /// country. Rows whose invoice date does not normalise only miss the
    /// day count.
    pub fn ingest(&mut self, row: &RawRow) {
        let country = cell_at(row, self.header.country).trimmed_text();
        let customer = cell_at(row, self.header.customer_id).trimmed_text();

        if !country.is_empty() {
            let slot = match self.country_slots.get(&country) {
                Some(&slot) => slot,
                None => {
                    self.countries.push((country.clone(), HashSet::new()));
                    self.country_slots.insert(country, self.countries.len() - 1);
                    self.countries.len() - 1
                }
            };
            if !customer.is_empty() {
                self.countries[slot].1.insert(customer);
            }
        }

        if let Some(day) = self.normalizer.normalize(cell_at(row, self.header.invoice_date)) {
            *self.date_counts.entry(day).or_insert(0) += 1;
        }

        self.rows_processed += 1;
    }

    pub fn rows_processed(&self) -> usize {
        self.rows_processed
    }

    /// Freeze the state into an [`AggregationResult`].
    pub fn finalize(self) -> AggregationResult {
        AggregationResult {
            countries: self
                .countries
                .into_iter()
                .map(|(country, customers)| CountryCount {
                    country,
                    customers: customers.len() as u64,
                })
                .collect(),
            date_counts: self.date_counts,
            rows_processed: self.rows_processed,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use insight_core::models::CellValue;

    fn header() -> HeaderIndex {
        HeaderIndex {
            country: Some(0),
            customer_id: Some(1),
            invoice_date: Some(2),
        }
    }

    fn row(country: &str, customer: CellValue, date: CellValue) -> RawRow {
        vec![CellValue::from(country), customer, date]
    }

    fn aggregate(rows: &[RawRow]) -> AggregationResult {
        let mut agg = Aggregator::new(header(), DateNormalizer::default());
        for r in rows {
            agg.ingest(r);
        }
        agg.finalize()
    }

    #[test]
    fn test_duplicate_customers_do_not_inflate_count() {
        let result = aggregate(&[
            row("France", 12680.0.into(), "2011-01-04".into()),
            row("France", 12680.0.into(), "2011-01-05".into()),
            row("France", "12680".into(), "2011-01-05".into()),
            row("France", 12681.0.into(), "2011-01-05".into()),
        ]);
        assert_eq!(result.country_customer_counts().get("France"), Some(&2));
        assert_eq!(result.rows_processed, 4);
    }

    #[test]
    fn test_country_without_customers_is_kept_with_zero() {
        let result = aggregate(&[row("Iceland", CellValue::Empty, CellValue::Empty)]);
        assert_eq!(result.country_customer_counts().get("Iceland"), Some(&0));
    }

    #[test]
    fn test_empty_country_excluded_but_date_counted() {
        let result = aggregate(&[row("   ", 1.0.into(), "2011/3/4".into())]);
        assert!(result.countries.is_empty());
        assert_eq!(result.date_counts.get("2011-03-04"), Some(&1));
    }

    #[test]
    fn test_country_trimmed_and_case_preserved() {
        let result = aggregate(&[
            row(" Germany ", 1.0.into(), CellValue::Empty),
            row("germany", 2.0.into(), CellValue::Empty),
        ]);
        let counts = result.country_customer_counts();
        assert_eq!(counts.get("Germany"), Some(&1));
        assert_eq!(counts.get("germany"), Some(&1));
    }

    #[test]
    fn test_encounter_order_preserved() {
        let result = aggregate(&[
            row("Spain", 1.0.into(), CellValue::Empty),
            row("EIRE", 2.0.into(), CellValue::Empty),
            row("Spain", 3.0.into(), CellValue::Empty),
        ]);
        let names: Vec<&str> = result.countries.iter().map(|c| c.country.as_str()).collect();
        assert_eq!(names, vec!["Spain", "EIRE"]);
    }

    #[test]
    fn test_unparseable_dates_are_dropped() {
        let result = aggregate(&[
            row("UK", 1.0.into(), "not a date".into()),
            row("UK", 1.0.into(), 40513.4.into()),
            row("UK", 1.0.into(), "12/1/2010 9:01".into()),
        ]);
        assert_eq!(result.date_counts.len(), 1);
        assert_eq!(result.date_counts.get("2010-12-01"), Some(&2));
        assert_eq!(result.rows_processed, 3);
    }

    #[test]
    fn test_absent_columns_read_as_empty() {
        let mut agg = Aggregator::new(HeaderIndex::default(), DateNormalizer::default());
        agg.ingest(&vec![CellValue::from("UK"), 1.0.into(), 40513.0.into()]);
        assert_eq!(agg.rows_processed(), 1);
        let result = agg.finalize();
        assert!(result.countries.is_empty());
        assert!(result.date_counts.is_empty());
    }

    #[test]
    fn test_short_rows_padded() {
        let result = aggregate(&[vec![CellValue::from("Japan")]]);
        assert_eq!(result.country_customer_counts().get("Japan"), Some(&0));
        assert!(result.date_counts.is_empty());
    }
}
