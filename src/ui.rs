use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use crate::domain::{CMDMode, TVConfig};
use crate::model::{Model, UIData};

pub const CMDLINE_HEIGH: u16 = 1;
pub const STATUSLINE_HEIGHT: u16 = 1;
pub const TITLE_HEIGHT: u16 = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;
pub const SELECTION_MARKER_WIDTH: u16 = 3;

const POPUP_WIDTH: u16 = 64;
const POPUP_HEIGHT: u16 = 30;

pub struct TableUI {
    table_state: TableState,
    max_column_width: usize,
}

impl TableUI {
    pub fn new(config: &TVConfig) -> Self {
        Self {
            table_state: TableState::default(),
            max_column_width: config.max_column_width,
        }
    }

    pub fn draw<T: Sync>(&mut self, model: &Model<T>, frame: &mut Frame) {
        let uidata = model.get_uidata();

        let [title_area, body_area, status_area, cmd_area] = Layout::vertical([
            Constraint::Length(TITLE_HEIGHT),
            Constraint::Min(0),
            Constraint::Length(STATUSLINE_HEIGHT),
            Constraint::Length(CMDLINE_HEIGH),
        ])
        .areas(frame.area());

        self.draw_title(uidata, frame, title_area);
        if uidata.card_layout {
            self.draw_cards(uidata, frame, body_area);
        } else {
            self.draw_table(uidata, frame, body_area);
        }
        self.draw_status(uidata, frame, status_area);
        self.draw_cmdline(uidata, frame, cmd_area);

        if uidata.show_popup {
            self.draw_popup(uidata, frame);
        }
    }

    fn draw_title(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::from(format!(" {} ", uidata.name)).bold().reversed()];
        if !uidata.summary.is_empty() {
            spans.push(Span::from(format!(" {} ", uidata.summary)).cyan());
        }
        if !uidata.filter_summary.is_empty() {
            spans.push(Span::from(" filter: ").dark_gray());
            spans.push(Span::from(uidata.filter_summary.clone()).yellow());
        }
        frame.render_widget(Line::from(spans), area);
    }

    fn draw_table(&mut self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.rows.is_empty() {
            let msg = if uidata.total_count == 0 {
                "No rows"
            } else {
                "No rows match the current filters"
            };
            frame.render_widget(Paragraph::new(msg).centered().dark_gray(), area);
            return;
        }

        let header = std::iter::once(Cell::from(""))
            .chain(uidata.headers.iter().map(|h| Cell::from(h.clone())))
            .collect::<Row>()
            .bold()
            .underlined();

        let rows = uidata.rows.iter().zip(&uidata.selected).map(|(row, selected)| {
            let marker = if *selected { "[x]" } else { "[ ]" };
            let style = if *selected {
                Style::new().fg(Color::Green)
            } else {
                Style::new()
            };
            std::iter::once(Cell::from(marker))
                .chain(row.iter().map(|c| Cell::from(c.clone())))
                .collect::<Row>()
                .style(style)
        });

        let widths = std::iter::once(Constraint::Length(SELECTION_MARKER_WIDTH)).chain(
            uidata
                .widths
                .iter()
                .map(|w| Constraint::Length(*w.min(&self.max_column_width.max(1)) as u16)),
        );

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(1)
            .row_highlight_style(Style::new().bg(Color::DarkGray))
            .cell_highlight_style(Style::new().add_modifier(Modifier::REVERSED));

        self.table_state.select(Some(uidata.selected_row));
        // Column 0 is the selection marker.
        self.table_state.select_column(Some(uidata.selected_column + 1));
        frame.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn draw_cards(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.rows.is_empty() {
            frame.render_widget(Paragraph::new("No rows").centered().dark_gray(), area);
            return;
        }

        // Borders plus one line per field
        let card_height = uidata.headers.len() as u16 + 2;
        let fits = (area.height / card_height.max(1)).max(1) as usize;
        // Keep the cursor card on screen
        let first = uidata.selected_row.saturating_sub(fits - 1);
        let visible = uidata.rows.len().saturating_sub(first).min(fits);

        let areas = Layout::vertical(vec![Constraint::Length(card_height); visible]).split(area);
        for (slot, ridx) in (first..first + visible).enumerate() {
            let row = &uidata.rows[ridx];
            let selected = uidata.selected.get(ridx).copied().unwrap_or(false);
            let marker = if selected { "[x]" } else { "[ ]" };
            let title = format!(" {marker} {} ", row.first().map(String::as_str).unwrap_or(""));

            let mut block = Block::bordered().title(title);
            if ridx == uidata.selected_row {
                block = block.border_style(Style::new().fg(Color::Yellow));
            }

            let lines: Vec<Line> = uidata
                .headers
                .iter()
                .zip(row)
                .enumerate()
                .map(|(cidx, (h, v))| {
                    let value = if ridx == uidata.selected_row && cidx == uidata.selected_column {
                        Span::from(v.clone()).reversed()
                    } else {
                        Span::from(v.clone())
                    };
                    Line::from(vec![Span::from(format!("{h}: ")).dark_gray(), value])
                })
                .collect();

            frame.render_widget(Paragraph::new(lines).block(block), areas[slot]);
        }
    }

    fn draw_status(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::from(format!(" Page {}/{} ", uidata.page_index + 1, uidata.page_count)).reversed(),
            Span::from(format!(" {}/{} rows ", uidata.filtered_count, uidata.total_count)),
        ];
        if uidata.selected_count > 0 {
            spans.push(Span::from(format!("| {} selected ", uidata.selected_count)).green());
            if let Some(sum) = &uidata.selected_sum {
                spans.push(Span::from(format!("| {sum} ")).green());
            }
        }
        if !uidata.status_message.is_empty() {
            spans.push(Span::from(format!("| {}", uidata.status_message)).dark_gray());
        }
        frame.render_widget(Line::from(spans), area);
    }

    fn draw_cmdline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if !uidata.active_cmdinput {
            frame.render_widget(Line::from(" ? help  q quit").dark_gray(), area);
            return;
        }
        let prompt = match uidata.cmd_mode {
            Some(CMDMode::GlobalFilter) => "/",
            Some(CMDMode::ColumnFilter) => "filter column: ",
            Some(CMDMode::PageSize) => "page size: ",
            None => ":",
        };
        let line = Line::from(vec![
            Span::from(prompt).bold(),
            Span::from(uidata.cmdinput.input.clone()),
        ]);
        frame.render_widget(line, area);

        let x = area.x + (prompt.chars().count() + uidata.cmdinput.curser_pos) as u16;
        frame.set_cursor_position(Position::new(x.min(area.right().saturating_sub(1)), area.y));
    }

    fn draw_popup(&self, uidata: &UIData, frame: &mut Frame) {
        let area = popup_area(frame.area(), POPUP_WIDTH, POPUP_HEIGHT);
        let block = Block::bordered().title(" Help ").title_bottom(Line::from(" Esc to close ").centered());
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(uidata.popup_message.clone())
                .block(block)
                .wrap(Wrap { trim: false }),
            area,
        );
    }
}

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let [area] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(area);
    area
}
