//! # Edit Menu Component
//!
//! Overlay listing the configuration files that can be opened in the
//! editor. Opened with `E`, dismissed with Esc.
//!
//! Follows the persistent state + transient wrapper pattern:
//! - `EditMenuState` lives in `TuiState`
//! - `EditMenu` is created each frame with borrowed state

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Padding};

use crate::core::source::{GUC_CONFIG_FILE, GUC_HBA_FILE, GUC_IDENT_FILE, GUC_RECOVERY_FILE};
use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

/// Menu entries: (label, edit target).
pub const EDIT_TARGETS: &[(&str, &str)] = &[
    ("postgresql.conf", GUC_CONFIG_FILE),
    ("pg_hba.conf", GUC_HBA_FILE),
    ("pg_ident.conf", GUC_IDENT_FILE),
    ("recovery.conf", GUC_RECOVERY_FILE),
];

/// Persistent state for the edit menu overlay.
pub struct EditMenuState {
    pub selected: usize,
    pub list_state: ListState,
}

impl EditMenuState {
    pub fn new() -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            selected: 0,
            list_state,
        }
    }

    fn select(&mut self, index: usize) {
        self.selected = index;
        self.list_state.select(Some(index));
    }
}

impl Default for EditMenuState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events emitted by the edit menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditMenuEvent {
    Select(&'static str),
    Dismiss,
}

impl EventHandler for EditMenuState {
    type Event = EditMenuEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<EditMenuEvent> {
        match event {
            TuiEvent::Escape => Some(EditMenuEvent::Dismiss),
            TuiEvent::CursorUp => {
                self.select(self.selected.saturating_sub(1));
                None
            }
            TuiEvent::CursorDown => {
                self.select((self.selected + 1).min(EDIT_TARGETS.len() - 1));
                None
            }
            TuiEvent::Submit => EDIT_TARGETS
                .get(self.selected)
                .map(|(_, target)| EditMenuEvent::Select(*target)),
            // Digit shortcuts, 1-based
            TuiEvent::InputChar(c) => c
                .to_digit(10)
                .and_then(|d| (d as usize).checked_sub(1))
                .and_then(|i| EDIT_TARGETS.get(i))
                .map(|(_, target)| EditMenuEvent::Select(*target)),
            _ => None,
        }
    }
}

/// Transient render wrapper for the edit menu overlay.
pub struct EditMenu<'a> {
    state: &'a mut EditMenuState,
}

impl<'a> EditMenu<'a> {
    pub fn new(state: &'a mut EditMenuState) -> Self {
        Self { state }
    }
}

impl Component for EditMenu<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let overlay = centered_rect(50, 50, area);
        frame.render_widget(Clear, overlay);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Edit configuration ")
            .title_alignment(Alignment::Left)
            .title_bottom(Line::from(" Enter Edit  Esc Back ").centered())
            .padding(Padding::horizontal(1));

        let items: Vec<ListItem> = EDIT_TARGETS
            .iter()
            .enumerate()
            .map(|(i, (label, _))| {
                let style = if i == self.state.selected {
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD | Modifier::REVERSED)
                } else {
                    Style::default().fg(Color::Gray)
                };
                ListItem::new(Line::styled(format!("{} {}", i + 1, label), style))
            })
            .collect();

        let list = List::new(items).block(block);
        frame.render_stateful_widget(list, overlay, &mut self.state.list_state);
    }
}

/// Compute a centered rect using percentage of the outer rect.
fn centered_rect(percent_x: u16, percent_y: u16, outer: Rect) -> Rect {
    let [_, center_v, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(outer);
    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(center_v);
    center
}
