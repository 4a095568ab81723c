//! Month drill-down state for the presentation layer.
//!
//! Kept apart from the aggregation result: a fresh result always starts a
//! new [`MonthView`] in [`ViewState::Overview`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{month_key, AggregationResult};

/// What the presentation layer is showing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "month", rename_all = "camelCase")]
pub enum ViewState {
    /// Country ranking, daily series and monthly roll-up.
    #[default]
    Overview,
    /// Daily breakdown of a single `YYYY-MM` month.
    MonthDetail(String),
}

/// A user-driven navigation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Previous,
    Next,
    Back,
}

impl std::str::FromStr for NavAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prev" | "previous" => Ok(NavAction::Previous),
            "next" => Ok(NavAction::Next),
            "back" => Ok(NavAction::Back),
            other => Err(format!("unknown navigation action \"{}\"", other)),
        }
    }
}

/// Month drill-down state machine over a snapshot of month and day counts.
#[derive(Debug, Clone)]
pub struct MonthView {
    months: Vec<String>,
    month_counts: BTreeMap<String, u64>,
    date_counts: BTreeMap<String, u64>,
    selected: Option<usize>,
}

impl MonthView {
    /// Start a view over `result` in [`ViewState::Overview`].
    pub fn new(result: &AggregationResult) -> Self {
        let month_counts = result.month_counts();
        Self {
            months: month_counts.keys().cloned().collect(),
            month_counts,
            date_counts: result.date_counts.clone(),
            selected: None,
        }
    }

    /// Replace the snapshot with a fresh result and reset to overview.
    pub fn reset(&mut self, result: &AggregationResult) {
        *self = Self::new(result);
    }

    pub fn state(&self) -> ViewState {
        match self.selected {
            None => ViewState::Overview,
            Some(i) => ViewState::MonthDetail(self.months[i].clone()),
        }
    }

    /// Index of the selected month in [`MonthView::months`].
    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    /// Month keys in ascending order.
    pub fn months(&self) -> &[String] {
        &self.months
    }

    pub fn month_counts(&self) -> &BTreeMap<String, u64> {
        &self.month_counts
    }

    /// Select a month by key. Unknown keys leave the state unchanged and
    /// return `false`.
    pub fn select(&mut self, month: &str) -> bool {
        match self.months.iter().position(|m| m == month) {
            Some(i) => {
                self.selected = Some(i);
                true
            }
            None => false,
        }
    }

    /// Select a month by position. Out-of-range indices are ignored.
    pub fn select_index(&mut self, index: usize) -> bool {
        if index < self.months.len() {
            self.selected = Some(index);
            true
        } else {
            false
        }
    }

    /// Apply a navigation action. Previous/next clamp at the ends and do
    /// nothing in overview.
    pub fn apply(&mut self, action: NavAction) {
        let Some(i) = self.selected else {
            return;
        };
        self.selected = match action {
            NavAction::Previous => Some(i.saturating_sub(1)),
            NavAction::Next => Some((i + 1).min(self.months.len().saturating_sub(1))),
            NavAction::Back => None,
        };
    }

    /// Daily breakdown for the selected month, ascending; empty in overview.
    pub fn daily_breakdown(&self) -> Vec<(String, u64)> {
        let Some(i) = self.selected else {
            return Vec::new();
        };
        let month = &self.months[i];
        self.date_counts
            .iter()
            .filter(|(day, _)| month_key(day) == month)
            .map(|(day, count)| (day.clone(), *count))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> AggregationResult {
        AggregationResult {
            countries: vec![],
            date_counts: [
                ("2011-01-05", 4),
                ("2011-01-20", 1),
                ("2011-02-11", 2),
                ("2011-03-02", 6),
                ("2011-03-01", 3),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
            rows_processed: 16,
        }
    }

    #[test]
    fn test_initial_state_is_overview() {
        let view = MonthView::new(&result());
        assert_eq!(view.state(), ViewState::Overview);
        assert_eq!(view.months(), ["2011-01", "2011-02", "2011-03"]);
        assert!(view.daily_breakdown().is_empty());
    }

    #[test]
    fn test_previous_clamps_at_first_month() {
        let mut view = MonthView::new(&result());
        assert!(view.select_index(0));
        view.apply(NavAction::Previous);
        assert_eq!(view.selected_index(), Some(0));
    }

    #[test]
    fn test_next_moves_forward_and_clamps() {
        let mut view = MonthView::new(&result());
        view.select_index(0);
        view.apply(NavAction::Next);
        assert_eq!(view.selected_index(), Some(1));
        view.apply(NavAction::Next);
        view.apply(NavAction::Next);
        assert_eq!(view.state(), ViewState::MonthDetail("2011-03".to_string()));
    }

    #[test]
    fn test_back_returns_to_overview() {
        let mut view = MonthView::new(&result());
        view.select("2011-02");
        view.apply(NavAction::Back);
        assert_eq!(view.state(), ViewState::Overview);
    }

    #[test]
    fn test_navigation_in_overview_is_noop() {
        let mut view = MonthView::new(&result());
        view.apply(NavAction::Next);
        assert_eq!(view.state(), ViewState::Overview);
    }

    #[test]
    fn test_select_unknown_month_is_rejected() {
        let mut view = MonthView::new(&result());
        assert!(!view.select("2012-07"));
        assert!(!view.select_index(3));
        assert_eq!(view.state(), ViewState::Overview);
    }

    #[test]
    fn test_daily_breakdown_sorted() {
        let mut view = MonthView::new(&result());
        view.select("2011-03");
        assert_eq!(
            view.daily_breakdown(),
            vec![("2011-03-01".to_string(), 3), ("2011-03-02".to_string(), 6)]
        );
    }

    #[test]
    fn test_reset_on_new_result() {
        let mut view = MonthView::new(&result());
        view.select("2011-03");
        view.reset(&AggregationResult::default());
        assert_eq!(view.state(), ViewState::Overview);
        assert!(view.months().is_empty());
    }

    #[test]
    fn test_nav_action_from_str() {
        assert_eq!("prev".parse::<NavAction>(), Ok(NavAction::Previous));
        assert_eq!(" Next ".parse::<NavAction>(), Ok(NavAction::Next));
        assert_eq!("back".parse::<NavAction>(), Ok(NavAction::Back));
        assert!("up".parse::<NavAction>().is_err());
    }
}
