//! Client side table view: filter, sort, paginate, select and export rows
//! of any type through explicit state, plus the terminal front end driving it.

pub mod column;
pub mod controller;
pub mod domain;
pub mod export;
pub mod filter;
pub mod inputter;
pub mod model;
pub mod pagination;
pub mod selection;
pub mod sort;
pub mod source;
pub mod table;
pub mod ui;
pub mod value;

pub use column::{ColumnDef, ColumnVisibility};
pub use domain::{TVConfig, TVError};
pub use export::{ExportScope, export_records, export_workbook};
pub use filter::{ColumnFilter, FilterState, filter, filter_indices};
pub use pagination::{Page, Pagination, page_count, paginate};
pub use selection::Selection;
pub use sort::{SortDirection, SortState, sort, sort_indices};
pub use table::{DataTable, PageView, RowActions};
pub use value::CellValue;
