//! Completion percentages at a bounded cadence.

/// Emits a percentage roughly every 5% of rows and always on the last row.
///
/// Percentages are `round(processed / total * 100)`, so the emitted sequence
/// never decreases and a completed run always ends at exactly 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressReporter {
    total: usize,
    stride: usize,
}

impl ProgressReporter {
    /// Reporter for a run of `total` data rows.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            stride: (total / 20).max(1),
        }
    }

    /// Rows between two periodic emissions.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Emission owed before any row is processed: `Some(100)` for a run
    /// with no data rows, otherwise `None`.
    pub fn start(&self) -> Option<u8> {
        (self.total == 0).then_some(100)
    }

    /// Emission owed after the `processed`-th row (1-based), if any.
    pub fn on_row(&self, processed: usize) -> Option<u8> {
        if processed == 0 || processed > self.total {
            return None;
        }
        if processed % self.stride == 0 || processed == self.total {
            Some(percent(processed, self.total))
        } else {
            None
        }
    }
}

/// `round(done / total * 100)` with half-up rounding, in integers.
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let done = done.min(total) as u128;
    let total = total as u128;
    ((done * 200 + total) / (total * 2)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emissions(total: usize) -> Vec<u8> {
        let reporter = ProgressReporter::new(total);
        let mut out: Vec<u8> = reporter.start().into_iter().collect();
        out.extend((1..=total).filter_map(|i| reporter.on_row(i)));
        out
    }

    #[test]
    fn test_zero_rows_emits_single_hundred() {
        assert_eq!(emissions(0), vec![100]);
    }

    #[test]
    fn test_small_run_reports_every_row() {
        assert_eq!(emissions(3), vec![33, 67, 100]);
    }

    #[test]
    fn test_stride_is_five_percent() {
        assert_eq!(ProgressReporter::new(1000).stride(), 50);
        assert_eq!(ProgressReporter::new(19).stride(), 1);
        let out = emissions(1000);
        assert_eq!(out.len(), 20);
        assert_eq!(out.first(), Some(&5));
    }

    #[test]
    fn test_last_row_always_reported() {
        // 41 rows: stride 2, row 41 is odd.
        let out = emissions(41);
        assert_eq!(out.last(), Some(&100));
    }

    #[test]
    fn test_sequence_non_decreasing() {
        for total in [1, 7, 20, 21, 99, 541, 1234] {
            let out = emissions(total);
            assert!(out.windows(2).all(|w| w[0] <= w[1]), "total = {total}");
            assert_eq!(out.last(), Some(&100), "total = {total}");
        }
    }

    #[test]
    fn test_percent_rounds_half_up() {
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(5, 5), 100);
    }
}
