use std::cmp::Ordering;

use tracing::{trace, warn};

use crate::column::{ColumnDef, find_column};
use crate::value::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// The single active sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub column_id: String,
    pub direction: SortDirection,
}

impl SortState {
    pub fn asc(column_id: impl Into<String>) -> Self {
        SortState { column_id: column_id.into(), direction: SortDirection::Asc }
    }

    pub fn desc(column_id: impl Into<String>) -> Self {
        SortState { column_id: column_id.into(), direction: SortDirection::Desc }
    }

    /// Header click semantics: off -> asc -> desc -> off. Clicking another
    /// column starts over at asc.
    pub fn toggle(current: Option<&SortState>, column_id: &str) -> Option<SortState> {
        match current {
            Some(s) if s.column_id == column_id => match s.direction {
                SortDirection::Asc => Some(SortState::desc(column_id)),
                SortDirection::Desc => None,
            },
            _ => Some(SortState::asc(column_id)),
        }
    }
}

/// Missing values go last whatever the direction; the direction only flips
/// the order of present values.
fn compare(a: &CellValue, b: &CellValue, direction: SortDirection) -> Ordering {
    match (a.is_missing(), b.is_missing()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = a.compare(b);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
    }
}

fn sort_column<'c, T>(sort: &SortState, columns: &'c [ColumnDef<T>]) -> Option<&'c ColumnDef<T>> {
    let Some(column) = find_column(columns, &sort.column_id) else {
        warn!("Cannot sort by unknown column \"{}\"", sort.column_id);
        return None;
    };
    if !column.sortable() {
        trace!("Column \"{}\" is not sortable", sort.column_id);
        return None;
    }
    Some(column)
}

// Accessors are evaluated once per row, then the (index, value) pairs are sorted.
fn ordered(mut keyed: Vec<(usize, CellValue)>, direction: SortDirection) -> Vec<usize> {
    keyed.sort_by(|(_, a), (_, b)| compare(a, b, direction));
    keyed.into_iter().map(|(idx, _)| idx).collect()
}

/// Reorders `indices` (positions in `rows`) by the sort column. Stable.
pub fn sort_indices<T>(
    rows: &[T],
    indices: &mut [usize],
    sort: Option<&SortState>,
    columns: &[ColumnDef<T>],
) {
    let Some(sort) = sort else {
        return;
    };
    if let Some(column) = sort_column(sort, columns) {
        let keyed = indices.iter().map(|&idx| (idx, column.value(&rows[idx]))).collect();
        indices.copy_from_slice(&ordered(keyed, sort.direction));
    }
}

pub fn sort<'a, T>(rows: &[&'a T], sort: Option<&SortState>, columns: &[ColumnDef<T>]) -> Vec<&'a T> {
    let Some(column) = sort.and_then(|s| sort_column(s, columns)) else {
        return rows.to_vec();
    };
    let direction = sort.map(|s| s.direction).unwrap_or(SortDirection::Asc);
    let keyed = rows.iter().enumerate().map(|(idx, row)| (idx, column.value(row))).collect();
    ordered(keyed, direction).into_iter().map(|idx| rows[idx]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pay {
        id: &'static str,
        amount: Option<f64>,
        method: &'static str,
    }

    fn rows() -> Vec<Pay> {
        vec![
            Pay { id: "A", amount: Some(250000.0), method: "card" },
            Pay { id: "B", amount: Some(150000.0), method: "bank" },
            Pay { id: "C", amount: None, method: "card" },
            Pay { id: "D", amount: Some(500000.0), method: "wallet" },
            Pay { id: "E", amount: Some(75000.0), method: "bank" },
        ]
    }

    fn columns() -> Vec<ColumnDef<Pay>> {
        vec![
            ColumnDef::new("amount", |p: &Pay| p.amount.into()),
            ColumnDef::new("method", |p: &Pay| p.method.into()),
            ColumnDef::new("id", |p: &Pay| p.id.into()).can_sort(false),
        ]
    }

    fn ids(rows: Vec<&Pay>) -> Vec<&'static str> {
        rows.into_iter().map(|p| p.id).collect()
    }

    #[test]
    fn no_sort_is_identity() {
        let rows = rows();
        let refs: Vec<&Pay> = rows.iter().collect();
        assert_eq!(ids(sort(&refs, None, &columns())), vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn numbers_descending_with_missing_last() {
        let rows = rows();
        let refs: Vec<&Pay> = rows.iter().collect();
        let sorted = sort(&refs, Some(&SortState::desc("amount")), &columns());
        assert_eq!(ids(sorted), vec!["D", "A", "B", "E", "C"]);
        let sorted = sort(&refs, Some(&SortState::asc("amount")), &columns());
        assert_eq!(ids(sorted), vec!["E", "B", "A", "D", "C"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let rows = rows();
        let refs: Vec<&Pay> = rows.iter().collect();
        let sorted = sort(&refs, Some(&SortState::asc("method")), &columns());
        assert_eq!(ids(sorted), vec!["B", "E", "A", "C", "D"]);
        let sorted = sort(&refs, Some(&SortState::desc("method")), &columns());
        assert_eq!(ids(sorted), vec!["D", "A", "C", "B", "E"]);
    }

    #[test]
    fn unsortable_and_unknown_columns_are_identity() {
        let rows = rows();
        let mut idx: Vec<usize> = vec![4, 3, 2, 1, 0];
        sort_indices(&rows, &mut idx, Some(&SortState::asc("id")), &columns());
        assert_eq!(idx, vec![4, 3, 2, 1, 0]);
        sort_indices(&rows, &mut idx, Some(&SortState::asc("nope")), &columns());
        assert_eq!(idx, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn sorting_a_subset_of_indices() {
        let rows = rows();
        let mut idx: Vec<usize> = vec![0, 3, 4];
        sort_indices(&rows, &mut idx, Some(&SortState::asc("amount")), &columns());
        assert_eq!(idx, vec![4, 0, 3]);
    }

    #[test]
    fn mixed_number_and_text_column_sorts_by_kind() {
        struct Cell(CellValue);
        // Deterministic scramble of numbers and numeric looking text
        let cells: Vec<Cell> = (0..2000u64)
            .map(|i| {
                let n = (i * 7919) % 1000;
                if i % 3 == 0 { Cell(CellValue::text(n.to_string())) } else { Cell(CellValue::Number(n as f64)) }
            })
            .collect();
        let refs: Vec<&Cell> = cells.iter().collect();
        let cols = vec![ColumnDef::new("v", |c: &Cell| c.0.clone())];

        let sorted = sort(&refs, Some(&SortState::asc("v")), &cols);
        assert_eq!(sorted.len(), cells.len());
        let first_text = sorted.iter().position(|c| matches!(c.0, CellValue::Text(_))).unwrap();
        assert!(sorted[..first_text].iter().all(|c| matches!(c.0, CellValue::Number(_))));
        assert!(sorted[first_text..].iter().all(|c| matches!(c.0, CellValue::Text(_))));
        for pair in sorted.windows(2) {
            assert_ne!(pair[0].0.compare(&pair[1].0), Ordering::Greater);
        }
    }

    #[test]
    fn toggle_cycles_through_directions() {
        let s = SortState::toggle(None, "amount");
        assert_eq!(s, Some(SortState::asc("amount")));
        let s = SortState::toggle(s.as_ref(), "amount");
        assert_eq!(s, Some(SortState::desc("amount")));
        assert_eq!(SortState::toggle(s.as_ref(), "amount"), None);
        assert_eq!(SortState::toggle(s.as_ref(), "method"), Some(SortState::asc("method")));
    }
}
