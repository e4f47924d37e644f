use std::io::Error;
use std::path::PathBuf;

use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use rust_xlsxwriter::XlsxError;
use thiserror::Error;

/// Errors surfaced by loading, exporting and the terminal front end.
///
/// The table pipeline itself (filter, sort, paginate, select) is total and
/// never produces one of these.
#[derive(Debug, Error)]
pub enum TVError {
    #[error("i/o error: {0}")]
    IoError(#[from] Error),
    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("spreadsheet error: {0}")]
    XlsxError(#[from] XlsxError),
    #[error("loading failed: {0}")]
    LoadingFailed(String),
    #[error("page size must be positive")]
    InvalidPageSize,
    #[error("file not found")]
    FileNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("unknown file type")]
    UnknownFileType,
}

#[derive(Debug, Clone)]
pub struct TVConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub page_size: usize,
    /// Terminals narrower than this render rows as stacked cards.
    pub card_breakpoint: usize,
    pub case_sensitive: bool,
    pub export_dir: PathBuf,
    pub export_name: String,
}

impl Default for TVConfig {
    fn default() -> Self {
        TVConfig {
            event_poll_time: 100,
            max_column_width: 32,
            page_size: 10,
            card_breakpoint: 80,
            case_sensitive: false,
            export_dir: PathBuf::from("."),
            export_name: "data".to_string(),
        }
    }
}

/// What the command line is currently collecting input for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    GlobalFilter,
    ColumnFilter,
    PageSize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    FirstPage,
    PreviousPage,
    NextPage,
    LastPage,
    Sort,
    ToggleRow,
    TogglePage,
    ClearSelection,
    HideColumn,
    ShowAllColumns,
    ToggleCaseSensitive,
    ToggleLayout,
    GlobalFilter,
    ColumnFilter,
    PageSize,
    ResetFilters,
    ExportFiltered,
    ExportSelected,
    CopyCell,
    CopyRow,
    CopyId,
    ViewRow,
    DownloadRow,
    DeleteRow,
    RetryRow,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
q          quit
j/k ↓/↑    move row cursor
h/l ←/→    move column cursor
n/p        next / previous page
g/G        first / last page
s          cycle sort on current column (asc, desc, off)
space      toggle selection of current row
a          toggle selection of all rows on the page
c          clear selection
/          global filter (empty input clears)
f          filter current column: text, =exact, min..max
r          reset all filters
i          toggle case sensitive matching
z          set page size
x          hide current column
X          show all columns
v          switch table / card layout
e          export filtered rows to xlsx
E          export selected rows to xlsx
y          copy cell, Y copy row, I copy row id
Enter/o    view current row
D          download current row
d/Del      delete current row
R          retry current row (failed payments)
?          this help
Esc        close popup";
