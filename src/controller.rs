use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, TVConfig, TVError};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &TVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event<T: Sync>(&self, model: &Model<T>) -> Result<Option<Message>, TVError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    if model.raw_keyevents() {
                        return Ok(Some(Message::RawKey(key)));
                    }
                    return Ok(self.handle_key(key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('j') | KeyCode::Down, _) => Some(Message::MoveDown),
            (KeyCode::Char('k') | KeyCode::Up, _) => Some(Message::MoveUp),
            (KeyCode::Char('h') | KeyCode::Left, _) => Some(Message::MoveLeft),
            (KeyCode::Char('l') | KeyCode::Right, _) => Some(Message::MoveRight),
            (KeyCode::Char('n') | KeyCode::PageDown, _) => Some(Message::NextPage),
            (KeyCode::Char('p') | KeyCode::PageUp, _) => Some(Message::PreviousPage),
            (KeyCode::Char('g') | KeyCode::Home, _) => Some(Message::FirstPage),
            (KeyCode::Char('G') | KeyCode::End, _) => Some(Message::LastPage),
            (KeyCode::Char('s'), _) => Some(Message::Sort),
            (KeyCode::Char(' '), _) => Some(Message::ToggleRow),
            (KeyCode::Char('a'), _) => Some(Message::TogglePage),
            (KeyCode::Char('c'), _) => Some(Message::ClearSelection),
            (KeyCode::Char('x'), _) => Some(Message::HideColumn),
            (KeyCode::Char('X'), _) => Some(Message::ShowAllColumns),
            (KeyCode::Char('i'), _) => Some(Message::ToggleCaseSensitive),
            (KeyCode::Char('v'), _) => Some(Message::ToggleLayout),
            (KeyCode::Char('/'), _) => Some(Message::GlobalFilter),
            (KeyCode::Char('f'), _) => Some(Message::ColumnFilter),
            (KeyCode::Char('z'), _) => Some(Message::PageSize),
            (KeyCode::Char('r'), _) => Some(Message::ResetFilters),
            (KeyCode::Char('e'), _) => Some(Message::ExportFiltered),
            (KeyCode::Char('E'), _) => Some(Message::ExportSelected),
            (KeyCode::Char('y'), _) => Some(Message::CopyCell),
            (KeyCode::Char('Y'), _) => Some(Message::CopyRow),
            (KeyCode::Char('I'), _) => Some(Message::CopyId),
            (KeyCode::Enter | KeyCode::Char('o'), _) => Some(Message::ViewRow),
            (KeyCode::Char('D'), _) => Some(Message::DownloadRow),
            (KeyCode::Char('d') | KeyCode::Delete, _) => Some(Message::DeleteRow),
            (KeyCode::Char('R'), _) => Some(Message::RetryRow),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Esc, _) => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
