use std::sync::Arc;
use std::time::Instant;

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, error, info, trace};

use crate::domain::{CMDMode, HELP_TEXT, Message, TVConfig, TVError};
use crate::export::ExportScope;
use crate::filter::ColumnFilter;
use crate::inputter::{InputResult, Inputter};
use crate::sort::SortDirection;
use crate::table::{DataTable, RowActions};
use crate::ui::COLUMN_WIDTH_MARGIN;

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
}

/// Sum shown in the status line for the selected rows, e.g. total amount.
pub struct SelectionAggregate<T> {
    pub label: String,
    pub value: Arc<dyn Fn(&T) -> f64 + Send + Sync>,
}

/// Row actions the terminal can perform itself.
#[derive(Default)]
pub struct ClipboardActions {
    clipboard: Option<Clipboard>,
}

impl ClipboardActions {
    fn copy(&mut self, text: String) -> Result<(), String> {
        if self.clipboard.is_none() {
            self.clipboard = Some(Clipboard::new().map_err(|e| e.to_string())?);
        }
        match self.clipboard.as_mut() {
            Some(cb) => cb.set_text(text).map_err(|e| e.to_string()),
            None => Err("no clipboard".to_string()),
        }
    }

    pub fn copy_text(&mut self, what: &str, text: String) -> String {
        match self.copy(text) {
            Ok(_) => {
                trace!("Copied {what} to clipboard.");
                format!("Copied {what}")
            }
            Err(e) => {
                error!("Error copying to clipboard: {e}");
                format!("Clipboard unavailable: {e}")
            }
        }
    }
}

impl<T> RowActions<T> for ClipboardActions {
    fn copy_id(&mut self, key: &str) -> Option<String> {
        Some(self.copy_text(&format!("id {key}"), key.to_string()))
    }
}

/// Datasets without actions of their own.
struct NoActions;

impl<T> RowActions<T> for NoActions {}

/// Everything the UI needs to draw one frame.
#[derive(Debug, Clone)]
pub struct UIData {
    pub name: String,
    pub summary: String,
    pub headers: Vec<String>,
    pub widths: Vec<usize>,
    pub rows: Vec<Vec<String>>,
    pub selected: Vec<bool>,
    pub selected_row: usize,
    pub selected_column: usize,
    pub page_index: usize,
    pub page_count: usize,
    pub filtered_count: usize,
    pub total_count: usize,
    pub selected_count: usize,
    pub selected_sum: Option<String>,
    pub filter_summary: String,
    pub card_layout: bool,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            summary: String::new(),
            headers: Vec::new(),
            widths: Vec::new(),
            rows: Vec::new(),
            selected: Vec::new(),
            selected_row: 0,
            selected_column: 0,
            page_index: 0,
            page_count: 1,
            filtered_count: 0,
            total_count: 0,
            selected_count: 0,
            selected_sum: None,
            filter_summary: String::new(),
            card_layout: false,
            show_popup: false,
            popup_message: String::new(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
            last_update: Instant::now(),
        }
    }
}

pub struct Model<T> {
    name: String,
    summary: String,
    config: TVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    table: DataTable<T>,
    aggregate: Option<SelectionAggregate<T>>,
    actions: ClipboardActions,
    row_actions: Box<dyn RowActions<T>>,
    curser_row: usize,
    curser_column: usize, // Index into the visible columns
    width: usize,
    layout_override: Option<bool>,
    uidata: UIData,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
}

impl<T: Sync> Model<T> {
    pub fn init(
        name: impl Into<String>,
        table: DataTable<T>,
        config: &TVConfig,
        ui_width: usize,
    ) -> Result<Self, TVError> {
        let mut table = table;
        table.set_page_size(config.page_size)?;
        table.set_case_sensitive(config.case_sensitive);

        let mut model = Self {
            name: name.into(),
            summary: String::new(),
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            table,
            aggregate: None,
            actions: ClipboardActions::default(),
            row_actions: Box::new(NoActions),
            curser_row: 0,
            curser_column: 0,
            width: ui_width,
            layout_override: None,
            uidata: UIData::empty(),
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: String::new(),
        };
        let total = model.table.rows().len();
        model.set_status_message(format!("Loaded {total} rows. Press ? for help."));
        model.update_table_data();
        Ok(model)
    }

    pub fn with_aggregate(mut self, label: impl Into<String>, value: impl Fn(&T) -> f64 + Send + Sync + 'static) -> Self {
        self.aggregate = Some(SelectionAggregate {
            label: label.into(),
            value: Arc::new(value),
        });
        self.update_table_data();
        self
    }

    /// View, download, delete and retry handlers for the rows.
    pub fn with_actions(mut self, actions: impl RowActions<T> + 'static) -> Self {
        self.row_actions = Box::new(actions);
        self
    }

    /// Headline numbers shown next to the title.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self.update_table_data();
        self
    }

    pub fn table(&self) -> &DataTable<T> {
        &self.table
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_update = Instant::now();
    }

    fn card_layout(&self) -> bool {
        self.layout_override
            .unwrap_or(self.width < self.config.card_breakpoint)
    }

    fn current_column_id(&self) -> Option<String> {
        self.table
            .visible_columns()
            .get(self.curser_column)
            .map(|c| c.id().to_string())
    }

    fn current_row_key(&self) -> Option<String> {
        let page = self.table.page();
        page.rows.get(self.curser_row).map(|r| self.table.key(r))
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), TVError> {
        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveUp => self.move_row(-1),
                    Message::MoveDown => self.move_row(1),
                    Message::MoveLeft => self.move_column(-1),
                    Message::MoveRight => self.move_column(1),
                    Message::FirstPage => self.change_page(|t| t.first_page()),
                    Message::PreviousPage => self.change_page(|t| t.previous_page()),
                    Message::NextPage => self.change_page(|t| t.next_page()),
                    Message::LastPage => self.change_page(|t| t.last_page()),
                    Message::Sort => self.sort_current_column(),
                    Message::ToggleRow => self.toggle_current_row(),
                    Message::TogglePage => self.toggle_page(),
                    Message::ClearSelection => {
                        self.table.clear_selection();
                        self.set_status_message("Selection cleared");
                    }
                    Message::HideColumn => self.hide_current_column(),
                    Message::ShowAllColumns => self.table.show_all_columns(),
                    Message::ToggleCaseSensitive => self.toggle_case_sensitive(),
                    Message::ToggleLayout => {
                        self.layout_override = Some(!self.card_layout());
                    }
                    Message::GlobalFilter => self.enter_cmd_mode(CMDMode::GlobalFilter),
                    Message::ColumnFilter => self.enter_cmd_mode(CMDMode::ColumnFilter),
                    Message::PageSize => self.enter_cmd_mode(CMDMode::PageSize),
                    Message::ResetFilters => {
                        self.table.reset_filters();
                        self.set_status_message("Filters reset");
                    }
                    Message::ExportFiltered => self.export(ExportScope::Filtered),
                    Message::ExportSelected => self.export(ExportScope::Selected),
                    Message::CopyCell => self.copy_cell(),
                    Message::CopyRow => self.copy_row(),
                    Message::CopyId => self.copy_id(),
                    Message::ViewRow | Message::DownloadRow | Message::DeleteRow | Message::RetryRow => {
                        self.row_action(msg)
                    }
                    Message::Help => self.show_help(),
                    Message::Resize(width, _height) => self.width = width,
                    _ => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Resize(width, _height) => self.width = width,
                    Message::Exit | Message::Help => self.exit(),
                    _ => (),
                },
                Modus::CMDINPUT => {
                    if let Message::RawKey(key) = msg {
                        self.raw_input(key)
                    }
                }
            }
        }
        self.update_table_data();
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn move_row(&mut self, step: isize) {
        let rows_on_page = self.table.page().rows.len();
        if rows_on_page == 0 {
            self.curser_row = 0;
            return;
        }
        let target = self.curser_row as isize + step;
        if target < 0 {
            if self.table.pagination().can_previous() {
                self.table.previous_page();
                self.curser_row = self.table.page().rows.len().saturating_sub(1);
            }
        } else if target as usize >= rows_on_page {
            let before = self.table.pagination().page_index();
            self.table.next_page();
            if self.table.pagination().page_index() != before {
                self.curser_row = 0;
            }
        } else {
            self.curser_row = target as usize;
        }
    }

    fn move_column(&mut self, step: isize) {
        let ncols = self.table.visible_columns().len();
        let target = self.curser_column as isize + step;
        self.curser_column = target.clamp(0, ncols.saturating_sub(1) as isize) as usize;
    }

    fn change_page(&mut self, nav: impl FnOnce(&mut DataTable<T>)) {
        nav(&mut self.table);
        self.curser_row = 0;
    }

    fn sort_current_column(&mut self) {
        let Some(column_id) = self.current_column_id() else {
            return;
        };
        self.table.toggle_sort(&column_id);
        let message = match self.table.sort_state() {
            Some(s) if s.direction == SortDirection::Asc => format!("Sorted by {column_id} ascending"),
            Some(_) => format!("Sorted by {column_id} descending"),
            None => "Sort cleared".to_string(),
        };
        self.set_status_message(message);
    }

    fn toggle_current_row(&mut self) {
        if let Some(key) = self.current_row_key() {
            let selected = self.table.toggle_row(&key);
            trace!("Row {key} selected: {selected}");
        }
    }

    fn toggle_page(&mut self) {
        self.table.toggle_all_on_page();
        let count = self.table.selection().len();
        self.set_status_message(format!("{count} rows selected"));
    }

    fn hide_current_column(&mut self) {
        let Some(column_id) = self.current_column_id() else {
            return;
        };
        if self.table.toggle_column_visibility(&column_id) {
            self.set_status_message(format!("Column {column_id} cannot be hidden"));
        } else {
            self.set_status_message(format!("Column {column_id} hidden, X shows all"));
        }
        self.move_column(0);
    }

    fn toggle_case_sensitive(&mut self) {
        let case_sensitive = !self.table.filter_state().case_sensitive;
        self.table.set_case_sensitive(case_sensitive);
        self.set_status_message(if case_sensitive {
            "Case sensitive matching"
        } else {
            "Case insensitive matching"
        });
    }

    fn export(&mut self, scope: ExportScope) {
        let name = match scope {
            ExportScope::Filtered => self.config.export_name.clone(),
            ExportScope::Selected => format!("{}-selected", self.config.export_name),
        };
        match self.table.export_file(scope, &self.config.export_dir, &name) {
            Ok(path) => self.set_status_message(format!("Exported to {}", path.display())),
            Err(e) => {
                error!("Export failed: {e}");
                self.set_status_message(format!("Export failed: {e}"));
            }
        }
    }

    fn copy_cell(&mut self) {
        let page = self.table.page();
        let columns = self.table.visible_columns();
        let (Some(row), Some(column)) = (page.rows.get(self.curser_row), columns.get(self.curser_column)) else {
            return;
        };
        let cell = column.value(row).to_text();
        let message = self.actions.copy_text("cell", cell);
        self.set_status_message(message);
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = c.to_string();

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_escaping || needs_wrapping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn copy_row(&mut self) {
        let page = self.table.page();
        let Some(row) = page.rows.get(self.curser_row) else {
            return;
        };
        let content = self
            .table
            .visible_columns()
            .iter()
            .map(|c| Self::wrap_cell_content(&c.value(row).to_text()))
            .collect::<Vec<String>>()
            .join(",");
        let message = self.actions.copy_text("row", content);
        self.set_status_message(message);
    }

    fn copy_id(&mut self) {
        if let Some(key) = self.current_row_key()
            && let Some(message) = RowActions::<T>::copy_id(&mut self.actions, &key)
        {
            self.set_status_message(message);
        }
    }

    fn row_action(&mut self, msg: Message) {
        let (key, what, result) = {
            let page = self.table.page();
            let Some(&row) = page.rows.get(self.curser_row) else {
                return;
            };
            let (what, result) = match msg {
                Message::ViewRow => ("view", self.row_actions.view(row)),
                Message::DownloadRow => ("download", self.row_actions.download(row)),
                Message::DeleteRow => ("delete", self.row_actions.delete(row)),
                Message::RetryRow => ("retry", self.row_actions.retry(row)),
                _ => return,
            };
            (self.table.key(row), what, result)
        };
        let Some(message) = result else {
            self.set_status_message(format!("No {what} action for {key}"));
            return;
        };
        // Removal goes through set_rows, which clamps the page index
        if msg == Message::DeleteRow && self.table.remove_row(&key) {
            debug!("Removed row {key}");
        }
        self.set_status_message(message);
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
    }

    fn exit(&mut self) {
        if self.modus == Modus::POPUP {
            trace!("Close popup ...");
            self.modus = self.previous_modus;
            self.previous_modus = Modus::POPUP;
            self.uidata.show_popup = false;
        }
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if self.active_cmdinput {
            self.last_input = self.input.read(key);
            if self.last_input.finished {
                self.handle_cmd_input();
            }
        }
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {mode:?} ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;
        self.input.clear();

        // Start from what is currently in effect
        match mode {
            CMDMode::GlobalFilter => {
                let current = self.table.filter_state().global_text.clone();
                self.input.set(&current);
            }
            CMDMode::PageSize => {
                let current = self.table.pagination().page_size().to_string();
                self.input.set(&current);
            }
            CMDMode::ColumnFilter => {}
        }
        self.last_input = self.input.get();
    }

    fn handle_cmd_input(&mut self) {
        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        let mode = self.cmd_mode.take();
        if self.last_input.canceled {
            trace!("Command input canceled");
            return;
        }
        let cmd_input = self.last_input.input.clone();
        debug!("Handle cmd input {mode:?}: \"{cmd_input}\"");
        match mode {
            Some(CMDMode::GlobalFilter) => {
                self.table.set_global_filter(cmd_input.trim());
                self.curser_row = 0;
                let n = self.table.filtered_count();
                self.set_status_message(format!("{n} matching rows"));
            }
            Some(CMDMode::ColumnFilter) => {
                let Some(column_id) = self.current_column_id() else {
                    return;
                };
                let filter = ColumnFilter::parse(&cmd_input);
                if filter.is_unset() {
                    self.table.clear_column_filter(&column_id);
                } else {
                    self.table.set_column_filter(&column_id, filter);
                }
                self.curser_row = 0;
                let n = self.table.filtered_count();
                self.set_status_message(format!("{n} matching rows"));
            }
            Some(CMDMode::PageSize) => match cmd_input.trim().parse::<usize>() {
                Ok(size) => match self.table.set_page_size(size) {
                    Ok(_) => self.set_status_message(format!("Page size {size}")),
                    Err(e) => self.set_status_message(e.to_string()),
                },
                Err(_) => self.set_status_message(format!("Not a page size: {cmd_input}")),
            },
            None => info!("Cmd mode is none!"),
        }
    }

    fn filter_summary(&self) -> String {
        let state = self.table.filter_state();
        let mut parts = Vec::new();
        if !state.global_text.is_empty() {
            parts.push(format!("/{}", state.global_text));
        }
        for (id, f) in &state.per_column {
            let desc = match f {
                ColumnFilter::Equals(s) => format!("{id}={s}"),
                ColumnFilter::Contains(s) => format!("{id}~{s}"),
                ColumnFilter::NumberRange { min, max } => format!(
                    "{id}:{}..{}",
                    min.map(|m| m.to_string()).unwrap_or_default(),
                    max.map(|m| m.to_string()).unwrap_or_default()
                ),
                ColumnFilter::DateRange { from, to } => format!(
                    "{id}:{}..{}",
                    from.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
                    to.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
                ),
            };
            parts.push(desc);
        }
        if state.case_sensitive {
            parts.push("Aa".to_string());
        }
        parts.join(" ")
    }

    /// Recomputes the page and everything the UI shows from current state.
    fn update_table_data(&mut self) {
        let page = self.table.page();
        let columns = self.table.visible_columns();

        self.curser_row = self.curser_row.min(page.rows.len().saturating_sub(1));
        self.curser_column = self.curser_column.min(columns.len().saturating_sub(1));

        let rows: Vec<Vec<String>> = page
            .rows
            .iter()
            .map(|r| columns.iter().map(|c| c.render(r)).collect())
            .collect();
        let selected: Vec<bool> = page.rows.iter().map(|r| self.table.is_selected(r)).collect();

        let sort = self.table.sort_state();
        let headers: Vec<String> = columns
            .iter()
            .map(|c| match sort {
                Some(s) if s.column_id == c.id() => match s.direction {
                    SortDirection::Asc => format!("{} ▲", c.label()),
                    SortDirection::Desc => format!("{} ▼", c.label()),
                },
                _ => c.label().to_string(),
            })
            .collect();

        let widths: Vec<usize> = columns
            .iter()
            .enumerate()
            .map(|(cidx, c)| match c.width() {
                Some(w) => w as usize,
                None => {
                    let content = rows.iter().map(|r| r[cidx].chars().count()).max().unwrap_or(0);
                    let width = content.max(headers[cidx].chars().count()) + COLUMN_WIDTH_MARGIN;
                    width.min(self.config.max_column_width)
                }
            })
            .collect();

        let selected_sum = self.aggregate.as_ref().map(|agg| {
            let sum = self.table.selected_sum(|r| (agg.value)(r));
            format!("{} {}", agg.label, sum)
        });

        let uidata = UIData {
            name: self.name.clone(),
            summary: self.summary.clone(),
            headers,
            widths,
            rows,
            selected,
            selected_row: self.curser_row,
            selected_column: self.curser_column,
            page_index: page.page_index,
            page_count: page.page_count,
            filtered_count: page.filtered_count,
            total_count: page.total_count,
            selected_count: self.table.selected_rows().len(),
            selected_sum,
            filter_summary: self.filter_summary(),
            card_layout: self.card_layout(),
            show_popup: self.modus == Modus::POPUP,
            popup_message: self.uidata.popup_message.clone(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            status_message: self.status_message.clone(),
            last_update: Instant::now(),
        };
        self.uidata = uidata;
    }
}
