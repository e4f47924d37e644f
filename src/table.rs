use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::column::{ColumnDef, ColumnVisibility, find_column};
use crate::domain::TVError;
use crate::export::{ExportScope, export_to_file, export_workbook};
use crate::filter::{ColumnFilter, FilterState, filter_indices};
use crate::pagination::{Page, Pagination};
use crate::selection::Selection;
use crate::sort::{SortState, sort_indices};

pub type KeyFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// Named row callbacks a page hands to the table.
///
/// The table never interprets them. Each returns an optional status message
/// for the front end to show.
pub trait RowActions<T> {
    fn view(&mut self, _row: &T) -> Option<String> {
        None
    }
    fn copy_id(&mut self, _key: &str) -> Option<String> {
        None
    }
    fn download(&mut self, _row: &T) -> Option<String> {
        None
    }
    fn delete(&mut self, _row: &T) -> Option<String> {
        None
    }
    fn retry(&mut self, _row: &T) -> Option<String> {
        None
    }
}

/// The current page with everything a renderer needs.
pub struct PageView<'a, T> {
    pub rows: Vec<&'a T>,
    pub page_index: usize,
    pub page_count: usize,
    /// Rows passing the filters, over all pages.
    pub filtered_count: usize,
    pub total_count: usize,
}

/// Source rows plus the explicit view state derived from them.
///
/// Every accessor recomputes `paginate(sort(filter(rows)))` from the current
/// state; nothing derived is cached.
pub struct DataTable<T> {
    rows: Vec<T>,
    columns: Vec<ColumnDef<T>>,
    key_fn: KeyFn<T>,
    filter: FilterState,
    sort: Option<SortState>,
    pagination: Pagination,
    visibility: ColumnVisibility,
    selection: Selection<String>,
}

impl<T: Sync> DataTable<T> {
    pub fn new<K>(rows: Vec<T>, columns: Vec<ColumnDef<T>>, key_fn: K) -> Self
    where
        K: Fn(&T) -> String + Send + Sync + 'static,
    {
        DataTable {
            rows,
            columns,
            key_fn: Arc::new(key_fn),
            filter: FilterState::default(),
            sort: None,
            pagination: Pagination::default(),
            visibility: ColumnVisibility::default(),
            selection: Selection::default(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Result<Self, TVError> {
        self.pagination = Pagination::new(page_size)?;
        Ok(self)
    }

    pub fn key(&self, row: &T) -> String {
        (self.key_fn)(row)
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn columns(&self) -> &[ColumnDef<T>] {
        &self.columns
    }

    /// Replaces the source rows. Selection is kept; keys of removed rows
    /// simply stop matching anything.
    pub fn set_rows(&mut self, rows: Vec<T>) {
        debug!("Replacing {} rows with {}", self.rows.len(), rows.len());
        self.rows = rows;
        self.clamp_page();
    }

    /// Drops the row with `key` from the source rows and its key from the
    /// selection. Returns false when no row has that key.
    pub fn remove_row(&mut self, key: &str) -> bool {
        let rows = std::mem::take(&mut self.rows);
        let before = rows.len();
        let kept: Vec<T> = rows.into_iter().filter(|r| (self.key_fn)(r) != key).collect();
        let removed = kept.len() != before;
        if removed {
            self.selection.remove(key);
        }
        self.set_rows(kept);
        removed
    }

    // ------------------------------ filtering ------------------------------ //

    pub fn filter_state(&self) -> &FilterState {
        &self.filter
    }

    pub fn set_global_filter(&mut self, text: impl Into<String>) {
        self.filter.global_text = text.into();
        self.clamp_page();
    }

    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        self.filter.case_sensitive = case_sensitive;
        self.clamp_page();
    }

    pub fn set_column_filter(&mut self, column_id: &str, filter: ColumnFilter) {
        self.filter.set_column(column_id, filter);
        self.clamp_page();
    }

    pub fn clear_column_filter(&mut self, column_id: &str) {
        self.filter.per_column.remove(column_id);
        self.clamp_page();
    }

    pub fn reset_filters(&mut self) {
        self.filter.clear();
        self.clamp_page();
    }

    fn filtered_indices(&self) -> Vec<usize> {
        filter_indices(&self.rows, &self.filter, &self.columns)
    }

    /// Filtered rows in source order.
    pub fn filtered_rows(&self) -> Vec<&T> {
        self.filtered_indices().into_iter().map(|idx| &self.rows[idx]).collect()
    }

    pub fn filtered_count(&self) -> usize {
        self.filtered_indices().len()
    }

    // ------------------------------- sorting ------------------------------- //

    pub fn sort_state(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    pub fn set_sort(&mut self, sort: Option<SortState>) {
        self.sort = sort;
    }

    /// Cycles the sort on `column_id` through asc, desc and off.
    pub fn toggle_sort(&mut self, column_id: &str) {
        match find_column(&self.columns, column_id) {
            Some(c) if c.sortable() => {
                self.sort = SortState::toggle(self.sort.as_ref(), column_id);
                trace!("Sort is now {:?}", self.sort);
            }
            _ => trace!("Ignoring sort toggle on \"{column_id}\""),
        }
    }

    fn sorted_indices(&self) -> Vec<usize> {
        let mut indices = self.filtered_indices();
        sort_indices(&self.rows, &mut indices, self.sort.as_ref(), &self.columns);
        indices
    }

    /// Filtered rows in sorted order, over all pages.
    pub fn sorted_rows(&self) -> Vec<&T> {
        self.sorted_indices().into_iter().map(|idx| &self.rows[idx]).collect()
    }

    // ------------------------------ pagination ----------------------------- //

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn page(&self) -> PageView<'_, T> {
        let sorted = self.sorted_rows();
        let Page { rows, page_index, page_count } = self.pagination.page(&sorted);
        PageView {
            rows: rows.to_vec(),
            page_index,
            page_count,
            filtered_count: sorted.len(),
            total_count: self.rows.len(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pagination.page_count(self.filtered_count())
    }

    pub fn page_keys(&self) -> Vec<String> {
        self.page().rows.into_iter().map(|r| self.key(r)).collect()
    }

    pub fn first_page(&mut self) {
        self.pagination.first();
    }

    pub fn previous_page(&mut self) {
        self.pagination.previous();
    }

    pub fn next_page(&mut self) {
        let count = self.filtered_count();
        self.pagination.next(count);
    }

    pub fn last_page(&mut self) {
        let count = self.filtered_count();
        self.pagination.last(count);
    }

    pub fn set_page_index(&mut self, page_index: usize) {
        let count = self.filtered_count();
        self.pagination.set_page_index(page_index, count);
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), TVError> {
        let count = self.filtered_count();
        self.pagination.set_page_size(page_size, count)
    }

    fn clamp_page(&mut self) {
        let count = self.filtered_count();
        self.pagination.clamp(count);
    }

    // ------------------------------ selection ------------------------------ //

    pub fn selection(&self) -> &Selection<String> {
        &self.selection
    }

    pub fn toggle_row(&mut self, key: &str) -> bool {
        self.selection.toggle(key.to_string())
    }

    /// Selects (or deselects) the rows on the current page only.
    pub fn toggle_all_on_page(&mut self) {
        let keys = self.page_keys();
        self.selection.toggle_all_on_page(&keys);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, row: &T) -> bool {
        self.selection.is_selected(&self.key(row))
    }

    /// Selected rows that still exist in the source, in source order.
    pub fn selected_rows(&self) -> Vec<&T> {
        self.selection.selected_rows(&self.rows, |r| self.key(r))
    }

    pub fn selected_sum<V>(&self, value_fn: V) -> f64
    where
        V: Fn(&T) -> f64,
    {
        self.selection.selected_sum(&self.rows, |r| self.key(r), value_fn)
    }

    // --------------------------- column visibility ------------------------- //

    pub fn visible_columns(&self) -> Vec<&ColumnDef<T>> {
        self.visibility.visible(&self.columns)
    }

    pub fn is_column_visible(&self, column_id: &str) -> bool {
        self.visibility.is_visible(column_id)
    }

    /// Flips visibility of a hideable column. Returns the new visibility.
    pub fn toggle_column_visibility(&mut self, column_id: &str) -> bool {
        match find_column(&self.columns, column_id) {
            Some(c) if c.hideable() => {
                let visible = !self.visibility.is_visible(column_id);
                // Keep at least one column on screen.
                if !visible && self.visible_columns().len() <= 1 {
                    return true;
                }
                self.visibility.set_visible(column_id, visible);
                visible
            }
            Some(_) => true,
            None => false,
        }
    }

    pub fn show_all_columns(&mut self) {
        self.visibility.show_all();
    }

    // -------------------------------- export ------------------------------- //

    fn export_rows(&self, scope: ExportScope) -> Vec<&T> {
        let sorted = self.sorted_rows();
        match scope {
            ExportScope::Filtered => sorted,
            ExportScope::Selected => {
                let keys = self.selection.selected_keys();
                sorted.into_iter().filter(|r| keys.contains(&self.key(r))).collect()
            }
        }
    }

    /// XLSX bytes of the visible columns for the rows in `scope`.
    pub fn export(&self, scope: ExportScope) -> Result<Vec<u8>, TVError> {
        export_workbook(&self.export_rows(scope), &self.visible_columns())
    }

    pub fn export_file(&self, scope: ExportScope, dir: &Path, name: &str) -> Result<PathBuf, TVError> {
        export_to_file(&self.export_rows(scope), &self.visible_columns(), dir, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CellValue;

    struct User {
        id: u32,
        name: &'static str,
        role: &'static str,
    }

    fn table(page_size: usize) -> DataTable<User> {
        let users = (1..=12)
            .map(|id| User {
                id,
                name: if id % 2 == 0 { "even" } else { "odd" },
                role: if id % 3 == 0 { "admin" } else { "user" },
            })
            .collect();
        let columns = vec![
            ColumnDef::new("id", |u: &User| CellValue::Number(u.id as f64)).can_hide(false),
            ColumnDef::new("name", |u: &User| u.name.into()),
            ColumnDef::new("role", |u: &User| u.role.into()),
        ];
        DataTable::new(users, columns, |u| u.id.to_string())
            .with_page_size(page_size)
            .unwrap()
    }

    fn page_ids(t: &DataTable<User>) -> Vec<u32> {
        t.page().rows.iter().map(|u| u.id).collect()
    }

    #[test]
    fn pipeline_filters_sorts_then_pages() {
        let mut t = table(2);
        t.set_column_filter("role", ColumnFilter::Equals("user".into()));
        t.toggle_sort("id");
        t.toggle_sort("id");
        assert_eq!(t.filtered_count(), 8);
        assert_eq!(page_ids(&t), vec![11, 10]);
        t.next_page();
        assert_eq!(page_ids(&t), vec![8, 7]);
    }

    #[test]
    fn narrowing_filter_clamps_page() {
        let mut t = table(5);
        t.last_page();
        assert_eq!(t.pagination().page_index(), 2);
        t.set_column_filter("role", ColumnFilter::Equals("admin".into()));
        assert_eq!(t.pagination().page_index(), 0);
        assert_eq!(page_ids(&t), vec![3, 6, 9, 12]);
    }

    #[test]
    fn select_all_is_page_scoped() {
        let mut t = table(5);
        t.toggle_all_on_page();
        assert_eq!(t.selection().len(), 5);
        t.next_page();
        assert_eq!(t.selection().len(), 5);
        assert!(!t.page().rows.iter().any(|u| t.is_selected(u)));
    }

    #[test]
    fn hidden_columns_leave_the_export() {
        let mut t = table(5);
        assert!(!t.toggle_column_visibility("name"));
        assert!(t.toggle_column_visibility("id"));
        let ids: Vec<&str> = t.visible_columns().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["id", "role"]);
        t.show_all_columns();
        assert_eq!(t.visible_columns().len(), 3);
    }

    #[test]
    fn export_selected_only() {
        let mut t = table(5);
        t.toggle_row("4");
        t.toggle_row("9");
        assert_eq!(t.export_rows(ExportScope::Selected).len(), 2);
        assert_eq!(t.export_rows(ExportScope::Filtered).len(), 12);
        assert!(t.export(ExportScope::Selected).is_ok());
    }

    #[test]
    fn set_rows_drops_stale_selection_from_aggregates() {
        let mut t = table(5);
        t.toggle_row("12");
        t.toggle_row("1");
        assert_eq!(t.selected_sum(|u| u.id as f64), 13.0);
        t.last_page();
        t.set_rows(vec![User { id: 1, name: "odd", role: "user" }]);
        assert_eq!(t.pagination().page_index(), 0);
        assert_eq!(t.selected_sum(|u| u.id as f64), 1.0);
        assert_eq!(t.selection().len(), 2);
    }

    #[test]
    fn removing_the_last_row_of_the_last_page_clamps() {
        let mut t = table(5);
        t.toggle_row("11");
        t.last_page();
        t.set_column_filter("role", ColumnFilter::Equals("user".into()));
        assert_eq!(t.page_count(), 2);
        t.last_page();
        assert!(t.remove_row("10"));
        assert!(t.remove_row("11"));
        assert!(!t.remove_row("11"));
        assert_eq!(t.filtered_count(), 6);
        assert_eq!(t.pagination().page_index(), 1);
        assert!(t.remove_row("8"));
        assert_eq!(t.pagination().page_index(), 0);
        assert!(t.selection().is_empty());
        assert_eq!(t.rows().len(), 9);
    }

    struct Recorder(Vec<String>);

    impl RowActions<User> for Recorder {
        fn delete(&mut self, row: &User) -> Option<String> {
            self.0.push(format!("delete {}", row.id));
            Some("deleted".to_string())
        }
    }

    #[test]
    fn row_actions_default_to_no_op() {
        let mut r = Recorder(Vec::new());
        let u = User { id: 7, name: "odd", role: "user" };
        assert_eq!(r.view(&u), None);
        assert_eq!(r.delete(&u), Some("deleted".to_string()));
        assert_eq!(r.0, vec!["delete 7"]);
    }
}
