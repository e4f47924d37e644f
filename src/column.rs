use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use derive_setters::Setters;

use crate::value::CellValue;

pub type Accessor<T> = Arc<dyn Fn(&T) -> CellValue + Send + Sync>;
pub type Renderer<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// How one field is extracted from, and shown for, every row of type `T`.
///
/// Column definitions are supplied once by whoever composes the table and are
/// not changed afterwards.
///
/// ```ignore
/// let amount = ColumnDef::new("amount", |p: &Payment| p.amount.into())
///     .header("Amount")
///     .size(12u16);
/// ```
#[derive(Setters)]
pub struct ColumnDef<T> {
    #[setters(skip)]
    id: String,
    #[setters(skip)]
    accessor: Accessor<T>,
    #[setters(skip)]
    renderer: Option<Renderer<T>>,
    #[setters(strip_option, into)]
    header: Option<String>,
    #[setters(strip_option)]
    size: Option<u16>,
    can_hide: bool,
    can_sort: bool,
    /// Whether the global text filter looks at this column.
    can_filter: bool,
}

impl<T> ColumnDef<T> {
    pub fn new<F>(id: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&T) -> CellValue + Send + Sync + 'static,
    {
        ColumnDef {
            id: id.into(),
            accessor: Arc::new(accessor),
            renderer: None,
            header: None,
            size: None,
            can_hide: true,
            can_sort: true,
            can_filter: true,
        }
    }

    pub fn render_with<F>(mut self, renderer: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The header label, falling back to the column id.
    pub fn label(&self) -> &str {
        self.header.as_deref().unwrap_or(&self.id)
    }

    pub fn width(&self) -> Option<u16> {
        self.size
    }

    pub fn hideable(&self) -> bool {
        self.can_hide
    }

    pub fn sortable(&self) -> bool {
        self.can_sort
    }

    pub fn filterable(&self) -> bool {
        self.can_filter
    }

    pub fn value(&self, row: &T) -> CellValue {
        (self.accessor)(row)
    }

    /// Display text for a cell. Uses the renderer when one is set.
    pub fn render(&self, row: &T) -> String {
        match &self.renderer {
            Some(r) => r(row),
            None => self.value(row).to_text(),
        }
    }
}

impl<T> Clone for ColumnDef<T> {
    fn clone(&self) -> Self {
        ColumnDef {
            id: self.id.clone(),
            accessor: Arc::clone(&self.accessor),
            renderer: self.renderer.clone(),
            header: self.header.clone(),
            size: self.size,
            can_hide: self.can_hide,
            can_sort: self.can_sort,
            can_filter: self.can_filter,
        }
    }
}

impl<T> fmt::Debug for ColumnDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("id", &self.id)
            .field("header", &self.header)
            .field("size", &self.size)
            .field("can_hide", &self.can_hide)
            .field("can_sort", &self.can_sort)
            .field("can_filter", &self.can_filter)
            .finish()
    }
}

pub fn find_column<'a, T>(columns: &'a [ColumnDef<T>], id: &str) -> Option<&'a ColumnDef<T>> {
    columns.iter().find(|c| c.id == id)
}

/// Column id to visibility. Columns without an entry are visible.
#[derive(Debug, Default, Clone)]
pub struct ColumnVisibility {
    hidden: HashMap<String, bool>,
}

impl ColumnVisibility {
    pub fn is_visible(&self, id: &str) -> bool {
        !self.hidden.get(id).copied().unwrap_or(false)
    }

    pub fn set_visible(&mut self, id: &str, visible: bool) {
        self.hidden.insert(id.to_string(), !visible);
    }

    pub fn show_all(&mut self) {
        self.hidden.clear();
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden.values().filter(|&&h| h).count()
    }

    /// The visible columns in declaration order.
    pub fn visible<'a, T>(&self, columns: &'a [ColumnDef<T>]) -> Vec<&'a ColumnDef<T>> {
        columns.iter().filter(|c| self.is_visible(&c.id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item {
        name: &'static str,
        qty: f64,
    }

    fn columns() -> Vec<ColumnDef<Item>> {
        vec![
            ColumnDef::new("name", |i: &Item| i.name.into()).header("Name"),
            ColumnDef::new("qty", |i: &Item| i.qty.into())
                .render_with(|i| format!("{} pcs", i.qty))
                .can_hide(false),
        ]
    }

    #[test]
    fn label_falls_back_to_id() {
        let cols = columns();
        assert_eq!(cols[0].label(), "Name");
        assert_eq!(cols[1].label(), "qty");
    }

    #[test]
    fn renderer_does_not_change_accessed_value() {
        let cols = columns();
        let item = Item { name: "bolt", qty: 3.0 };
        assert_eq!(cols[1].render(&item), "3 pcs");
        assert_eq!(cols[1].value(&item), CellValue::Number(3.0));
        assert_eq!(cols[0].render(&item), "bolt");
    }

    #[test]
    fn visibility_keeps_declaration_order() {
        let cols = columns();
        let mut vis = ColumnVisibility::default();
        assert_eq!(vis.visible(&cols).len(), 2);
        vis.set_visible("name", false);
        let visible: Vec<&str> = vis.visible(&cols).iter().map(|c| c.id()).collect();
        assert_eq!(visible, vec!["qty"]);
        assert_eq!(vis.hidden_count(), 1);
        vis.show_all();
        assert_eq!(vis.visible(&cols).len(), 2);
    }
}
