use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::debug;

use crate::column::{ColumnDef, find_column};
use crate::value::{CellValue, parse_date};

/// A constraint on a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnFilter {
    /// Exact match on the value's text, for enumerated fields like status.
    Equals(String),
    Contains(String),
    NumberRange { min: Option<f64>, max: Option<f64> },
    DateRange {
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    },
}

impl ColumnFilter {
    /// An unset filter constrains nothing.
    pub fn is_unset(&self) -> bool {
        match self {
            ColumnFilter::Equals(s) | ColumnFilter::Contains(s) => s.is_empty(),
            ColumnFilter::NumberRange { min, max } => min.is_none() && max.is_none(),
            ColumnFilter::DateRange { from, to } => from.is_none() && to.is_none(),
        }
    }

    /// Parses command line input.
    ///
    /// `lo..hi` with either side optional is a numeric range when the present
    /// bounds are numbers, otherwise a date range when they are dates. `=x` is
    /// an exact match and everything else a substring match.
    pub fn parse(input: &str) -> ColumnFilter {
        let input = input.trim();
        if let Some(exact) = input.strip_prefix('=') {
            return ColumnFilter::Equals(exact.to_string());
        }
        if let Some((lo, hi)) = input.split_once("..") {
            let (lo, hi) = (lo.trim(), hi.trim());
            let lo = (!lo.is_empty()).then_some(lo);
            let hi = (!hi.is_empty()).then_some(hi);
            if lo.is_none() && hi.is_none() {
                return ColumnFilter::NumberRange { min: None, max: None };
            }
            let nums = (lo.map(str::parse::<f64>), hi.map(str::parse::<f64>));
            if let (Some(Ok(_)) | None, Some(Ok(_)) | None) = nums {
                return ColumnFilter::NumberRange {
                    min: nums.0.and_then(Result::ok),
                    max: nums.1.and_then(Result::ok),
                };
            }
            let dates = (lo.map(parse_date), hi.map(parse_date));
            if let (Some(Some(_)) | None, Some(Some(_)) | None) = dates {
                return ColumnFilter::DateRange {
                    from: dates.0.flatten(),
                    to: dates.1.flatten(),
                };
            }
        }
        ColumnFilter::Contains(input.to_string())
    }

    pub fn matches(&self, value: &CellValue, case_sensitive: bool) -> bool {
        if self.is_unset() {
            return true;
        }
        match self {
            ColumnFilter::Equals(expected) => value.to_text() == *expected,
            ColumnFilter::Contains(term) => contains(&value.to_text(), term, case_sensitive),
            ColumnFilter::NumberRange { min, max } => match value.as_number() {
                Some(n) => min.is_none_or(|m| n >= m) && max.is_none_or(|m| n <= m),
                None => false,
            },
            ColumnFilter::DateRange { from, to } => match value.as_date() {
                Some(d) => from.is_none_or(|f| d >= f) && to.is_none_or(|t| d <= t),
                None => false,
            },
        }
    }
}

/// Free text search plus per column constraints. Lives only in the view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub global_text: String,
    pub case_sensitive: bool,
    pub per_column: BTreeMap<String, ColumnFilter>,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self.global_text.is_empty() && self.per_column.values().all(ColumnFilter::is_unset)
    }

    pub fn set_column(&mut self, column_id: impl Into<String>, filter: ColumnFilter) {
        let column_id = column_id.into();
        if filter.is_unset() {
            self.per_column.remove(&column_id);
        } else {
            self.per_column.insert(column_id, filter);
        }
    }

    pub fn clear(&mut self) {
        self.global_text.clear();
        self.per_column.clear();
    }
}

fn contains(haystack: &str, needle: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        haystack.contains(needle)
    } else {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }
}

fn row_matches<T>(row: &T, state: &FilterState, columns: &[ColumnDef<T>], needle: &str) -> bool {
    if !needle.is_empty() {
        let hit = columns.iter().filter(|c| c.filterable()).any(|c| {
            let text = c.value(row).to_text();
            if state.case_sensitive {
                text.contains(needle)
            } else {
                text.to_lowercase().contains(needle)
            }
        });
        if !hit {
            return false;
        }
    }
    state.per_column.iter().all(|(id, f)| match find_column(columns, id) {
        Some(column) => f.matches(&column.value(row), state.case_sensitive),
        None => true,
    })
}

/// Indices into `rows` of every row passing the global and all column
/// filters, in input order.
pub fn filter_indices<T: Sync>(rows: &[T], state: &FilterState, columns: &[ColumnDef<T>]) -> Vec<usize> {
    for id in state.per_column.keys() {
        if find_column(columns, id).is_none() {
            debug!("Ignoring filter on unknown column \"{id}\"");
        }
    }
    if state.is_empty() {
        return (0..rows.len()).collect();
    }
    let needle = if state.case_sensitive {
        state.global_text.clone()
    } else {
        state.global_text.to_lowercase()
    };

    // Indexed parallel iterators keep their order on collect.
    rows.par_iter()
        .enumerate()
        .filter(|(_, row)| row_matches(*row, state, columns, &needle))
        .map(|(idx, _)| idx)
        .collect()
}

pub fn filter<'a, T: Sync>(rows: &'a [T], state: &FilterState, columns: &[ColumnDef<T>]) -> Vec<&'a T> {
    filter_indices(rows, state, columns)
        .into_iter()
        .map(|idx| &rows[idx])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Txn {
        id: &'static str,
        status: &'static str,
        amount: f64,
        at: &'static str,
    }

    fn rows() -> Vec<Txn> {
        vec![
            Txn { id: "T-1", status: "completed", amount: 100.0, at: "2024-01-20T10:30:00Z" },
            Txn { id: "T-2", status: "pending", amount: 250.0, at: "2024-01-19T14:22:00Z" },
            Txn { id: "T-3", status: "completed", amount: 75.0, at: "2024-01-17T16:45:00Z" },
            Txn { id: "T-4", status: "Failed", amount: 500.0, at: "2024-01-12T17:10:00Z" },
        ]
    }

    fn columns() -> Vec<ColumnDef<Txn>> {
        vec![
            ColumnDef::new("id", |t: &Txn| t.id.into()),
            ColumnDef::new("status", |t: &Txn| t.status.into()),
            ColumnDef::new("amount", |t: &Txn| t.amount.into()),
            ColumnDef::new("at", |t: &Txn| CellValue::date_or_text(t.at)),
        ]
    }

    fn ids(rows: Vec<&Txn>) -> Vec<&'static str> {
        rows.into_iter().map(|t| t.id).collect()
    }

    #[test]
    fn empty_state_keeps_everything() {
        let rows = rows();
        let kept = filter(&rows, &FilterState::default(), &columns());
        assert_eq!(ids(kept), vec!["T-1", "T-2", "T-3", "T-4"]);
    }

    #[test]
    fn global_text_is_case_insensitive_by_default() {
        let rows = rows();
        let mut state = FilterState { global_text: "failed".into(), ..Default::default() };
        assert_eq!(ids(filter(&rows, &state, &columns())), vec!["T-4"]);

        state.case_sensitive = true;
        assert!(filter(&rows, &state, &columns()).is_empty());
    }

    #[test]
    fn global_text_matches_numbers_as_text() {
        let rows = rows();
        let state = FilterState { global_text: "250".into(), ..Default::default() };
        assert_eq!(ids(filter(&rows, &state, &columns())), vec!["T-2"]);
    }

    #[test]
    fn column_filters_are_anded() {
        let rows = rows();
        let mut state = FilterState::default();
        state.set_column("status", ColumnFilter::Equals("completed".into()));
        state.set_column("amount", ColumnFilter::NumberRange { min: Some(80.0), max: None });
        assert_eq!(ids(filter(&rows, &state, &columns())), vec!["T-1"]);
    }

    #[test]
    fn ranges_are_inclusive() {
        let rows = rows();
        let mut state = FilterState::default();
        state.set_column("amount", ColumnFilter::NumberRange { min: Some(75.0), max: Some(250.0) });
        assert_eq!(ids(filter(&rows, &state, &columns())), vec!["T-1", "T-2", "T-3"]);

        let mut state = FilterState::default();
        state.set_column(
            "at",
            ColumnFilter::DateRange {
                from: parse_date("2024-01-17T16:45:00Z"),
                to: parse_date("2024-01-19T14:22:00Z"),
            },
        );
        assert_eq!(ids(filter(&rows, &state, &columns())), vec!["T-2", "T-3"]);
    }

    #[test]
    fn unset_filters_are_dropped() {
        let mut state = FilterState::default();
        state.set_column("status", ColumnFilter::Equals(String::new()));
        assert!(state.per_column.is_empty());
        assert!(state.is_empty());
    }

    #[test]
    fn unknown_columns_are_ignored() {
        let rows = rows();
        let mut state = FilterState::default();
        state.set_column("nope", ColumnFilter::Equals("x".into()));
        assert_eq!(filter(&rows, &state, &columns()).len(), 4);
    }

    #[test]
    fn filtering_is_idempotent() {
        let rows = rows();
        let mut state = FilterState { global_text: "T-".into(), ..Default::default() };
        state.set_column("status", ColumnFilter::Contains("COMP".into()));
        let once: Vec<Txn> = filter(&rows, &state, &columns()).into_iter().cloned().collect();
        let twice = filter(&once, &state, &columns());
        assert_eq!(ids(twice), vec!["T-1", "T-3"]);
        assert_eq!(once.iter().map(|t| t.id).collect::<Vec<_>>(), vec!["T-1", "T-3"]);
    }

    #[test]
    fn parses_command_line_filters() {
        assert_eq!(ColumnFilter::parse("=pending"), ColumnFilter::Equals("pending".into()));
        assert_eq!(ColumnFilter::parse("pend"), ColumnFilter::Contains("pend".into()));
        assert_eq!(
            ColumnFilter::parse("100..250"),
            ColumnFilter::NumberRange { min: Some(100.0), max: Some(250.0) }
        );
        assert_eq!(
            ColumnFilter::parse("..250"),
            ColumnFilter::NumberRange { min: None, max: Some(250.0) }
        );
        assert_eq!(
            ColumnFilter::parse("2024-01-10..2024-01-18"),
            ColumnFilter::DateRange {
                from: parse_date("2024-01-10"),
                to: parse_date("2024-01-18"),
            }
        );
        assert_eq!(ColumnFilter::parse("a..b"), ColumnFilter::Contains("a..b".into()));
        assert!(ColumnFilter::parse("..").is_unset());
    }
}
