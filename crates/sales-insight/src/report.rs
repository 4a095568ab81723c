//! Console and JSON presentation of a finished run.

use std::io::Write;

use insight_core::formatting::{format_count, percentage, render_bar};
use insight_core::models::AggregationResult;
use insight_core::view::{MonthView, ViewState};
use insight_runtime::messages::RunMessage;

const BAR_WIDTH: usize = 30;
const PROGRESS_WIDTH: usize = 20;

// ── Progress line ─────────────────────────────────────────────────────────────

/// Redraws a single `progress:` line on stderr as messages arrive.
pub struct ProgressLine {
    enabled: bool,
    drawn: bool,
}

impl ProgressLine {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            drawn: false,
        }
    }

    pub fn observe(&mut self, msg: &RunMessage) {
        if !self.enabled {
            return;
        }
        let mut err = std::io::stderr().lock();
        match msg {
            RunMessage::Progress { percent } => {
                let _ = write!(
                    err,
                    "\rprogress: {:>3}% {}",
                    percent,
                    render_bar(u64::from(*percent), 100, PROGRESS_WIDTH)
                );
                let _ = err.flush();
                self.drawn = true;
            }
            RunMessage::Result(_) | RunMessage::Error { .. } => {
                if self.drawn {
                    let _ = writeln!(err);
                    self.drawn = false;
                }
            }
        }
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// Render the current view as plain text.
///
/// `top` limits the country list; 0 lists every country.
pub fn render_table(result: &AggregationResult, view: &MonthView, top: usize) -> String {
    if result.is_empty() {
        return "No data rows found.\n".to_string();
    }
    match view.state() {
        ViewState::Overview => render_overview(result, view, top),
        ViewState::MonthDetail(month) => render_month_detail(view, &month),
    }
}

fn render_overview(result: &AggregationResult, view: &MonthView, top: usize) -> String {
    let mut out = String::new();
    let dated = result.dated_rows();
    out.push_str(&format!(
        "Rows: {} (with a recognised invoice date: {}, {}%)\n",
        format_count(result.rows_processed as u64),
        format_count(dated),
        percentage(dated, result.rows_processed as u64, 1)
    ));

    let ranked = result.ranked_countries();
    let shown = if top == 0 { ranked.len() } else { top.min(ranked.len()) };
    let max = ranked.first().map(|c| c.customers).unwrap_or(0);
    let name_width = ranked[..shown].iter().map(|c| c.country.chars().count()).max().unwrap_or(0);

    out.push_str("\nDistinct customers by country\n");
    for c in &ranked[..shown] {
        out.push_str(&format!(
            "  {:<name_width$}  {:>9}  {}\n",
            c.country,
            format_count(c.customers),
            render_bar(c.customers, max, BAR_WIDTH),
        ));
    }
    if shown < ranked.len() {
        out.push_str(&format!("  … {} more\n", ranked.len() - shown));
    }

    out.push_str("\nInvoices by month\n");
    push_series(&mut out, view.month_counts().iter().map(|(k, v)| (k.as_str(), *v)));

    out.push_str("\nInvoices by day\n");
    push_series(&mut out, result.date_counts.iter().map(|(k, v)| (k.as_str(), *v)));
    out
}

fn render_month_detail(view: &MonthView, month: &str) -> String {
    let total = view.month_counts().get(month).copied().unwrap_or(0);
    let position = view.selected_index().map(|i| i + 1).unwrap_or(0);

    let mut out = format!(
        "{} · {} invoices  [{} of {}]\n",
        month,
        format_count(total),
        position,
        view.months().len()
    );
    let days = view.daily_breakdown();
    push_series(&mut out, days.iter().map(|(k, v)| (k.as_str(), *v)));
    out
}

fn push_series<'a>(out: &mut String, series: impl Iterator<Item = (&'a str, u64)> + Clone) {
    let max = series.clone().map(|(_, v)| v).max().unwrap_or(0);
    for (key, value) in series {
        out.push_str(&format!(
            "  {:<10}  {:>9}  {}\n",
            key,
            format_count(value),
            render_bar(value, max, BAR_WIDTH)
        ));
    }
}

// ── JSON ──────────────────────────────────────────────────────────────────────

/// Render the aggregates and current view as pretty JSON.
pub fn render_json(result: &AggregationResult, view: &MonthView) -> anyhow::Result<String> {
    let ranking: Vec<serde_json::Value> = result
        .ranked_countries()
        .into_iter()
        .map(|c| serde_json::json!({ "country": c.country, "customers": c.customers }))
        .collect();

    let doc = serde_json::json!({
        "rowsProcessed": result.rows_processed,
        "countryCustomerCounts": result.country_customer_counts(),
        "countryRanking": ranking,
        "dateCounts": result.date_counts,
        "monthCounts": view.month_counts(),
        "view": view.state(),
        "dailyBreakdown": view
            .daily_breakdown()
            .into_iter()
            .map(|(day, count)| serde_json::json!({ "date": day, "count": count }))
            .collect::<Vec<_>>(),
    });
    Ok(serde_json::to_string_pretty(&doc)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use insight_core::models::CountryCount;
    use insight_core::view::NavAction;

    fn result() -> AggregationResult {
        AggregationResult {
            countries: vec![
                CountryCount { country: "France".to_string(), customers: 87 },
                CountryCount { country: "United Kingdom".to_string(), customers: 3950 },
                CountryCount { country: "EIRE".to_string(), customers: 3 },
            ],
            date_counts: [("2010-12-01", 3108), ("2010-12-02", 2109), ("2011-01-04", 1012)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            rows_processed: 6300,
        }
    }

    #[test]
    fn test_overview_lists_ranked_countries() {
        let r = result();
        let text = render_table(&r, &MonthView::new(&r), 2);
        let uk = text.find("United Kingdom").expect("uk listed");
        let fr = text.find("France").expect("france listed");
        assert!(uk < fr);
        assert!(!text.contains("EIRE"));
        assert!(text.contains("… 1 more"));
        assert!(text.contains("3,950"));
        assert!(text.contains("2010-12"));
        assert!(text.contains("2011-01-04"));
    }

    #[test]
    fn test_top_zero_lists_all() {
        let r = result();
        let text = render_table(&r, &MonthView::new(&r), 0);
        assert!(text.contains("EIRE"));
        assert!(!text.contains("more"));
    }

    #[test]
    fn test_month_detail_lists_days_of_month() {
        let r = result();
        let mut view = MonthView::new(&r);
        view.select("2010-12");
        let text = render_table(&r, &view, 10);
        assert!(text.starts_with("2010-12 · 5,217 invoices  [1 of 2]"));
        assert!(text.contains("2010-12-02"));
        assert!(!text.contains("2011-01-04"));

        view.apply(NavAction::Next);
        assert!(render_table(&r, &view, 10).contains("2011-01-04"));
    }

    #[test]
    fn test_empty_result() {
        let r = AggregationResult::default();
        assert_eq!(render_table(&r, &MonthView::new(&r), 10), "No data rows found.\n");
    }

    #[test]
    fn test_json_document() {
        let r = result();
        let mut view = MonthView::new(&r);
        view.select("2011-01");
        let json: serde_json::Value = serde_json::from_str(&render_json(&r, &view).unwrap()).unwrap();

        assert_eq!(json["countryCustomerCounts"]["United Kingdom"], 3950);
        assert_eq!(json["countryRanking"][0]["country"], "United Kingdom");
        assert_eq!(json["monthCounts"]["2010-12"], 5217);
        assert_eq!(json["view"]["state"], "monthDetail");
        assert_eq!(json["view"]["month"], "2011-01");
        assert_eq!(json["dailyBreakdown"][0]["date"], "2011-01-04");
    }
}
