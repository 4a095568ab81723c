//! Header-row column resolution.

use crate::models::{CellValue, RawRow};

/// Header text of the country column.
pub const COUNTRY: &str = "Country";
/// Header text of the customer identifier column.
pub const CUSTOMER_ID: &str = "CustomerID";
/// Header text of the invoice date column.
pub const INVOICE_DATE: &str = "InvoiceDate";

/// Zero-based positions of the required columns; `None` when the header
/// lacks that column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderIndex {
    pub country: Option<usize>,
    pub customer_id: Option<usize>,
    pub invoice_date: Option<usize>,
}

impl HeaderIndex {
    /// Resolve the required columns against `header`.
    ///
    /// Each header cell is stringified and trimmed, then matched exactly
    /// (case-sensitive). The first matching cell wins.
    pub fn resolve(header: &[CellValue]) -> Self {
        let names: Vec<String> = header.iter().map(CellValue::trimmed_text).collect();
        let find = |wanted: &str| names.iter().position(|n| n == wanted);

        Self {
            country: find(COUNTRY),
            customer_id: find(CUSTOMER_ID),
            invoice_date: find(INVOICE_DATE),
        }
    }

    /// Names of the required columns missing from the header.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (COUNTRY, self.country),
            (CUSTOMER_ID, self.customer_id),
            (INVOICE_DATE, self.invoice_date),
        ]
        .into_iter()
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Cell at `idx` in `row`; absent indices and short rows read as empty.
pub fn cell_at(row: &RawRow, idx: Option<usize>) -> &CellValue {
    idx.and_then(|i| row.get(i)).unwrap_or(&EMPTY_CELL)
}

static EMPTY_CELL: CellValue = CellValue::Empty;
