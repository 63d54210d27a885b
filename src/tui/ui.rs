use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Style};
use ratatui::widgets::Paragraph;

use crate::core::session::ConnectionOrigin;
use crate::core::state::App;
use crate::tui::TuiState;
use crate::tui::component::Component;
use crate::tui::components::{EditMenu, SettingsPanel, StatusLine};

/// Key help for the bottom bar. Editing needs the files on this machine.
pub fn help_text(origin: ConnectionOrigin) -> &'static str {
    match origin {
        ConnectionOrigin::Local => " C Config  E Edit  P psql  q Quit ",
        ConnectionOrigin::Remote => " C Config  E Edit (local only)  P psql  q Quit ",
    }
}

pub fn draw_ui(frame: &mut Frame, app: &App, tui: &mut TuiState) {
    use Constraint::{Length, Min};
    let [status_area, main_area, help_area] =
        Layout::vertical([Length(1), Min(0), Length(1)]).areas(frame.area());

    StatusLine::new(app.target.clone(), app.status_message.clone()).render(frame, status_area);

    let rows = app
        .panel_rows()
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    let last_refresh = app
        .last_refresh
        .map(|at| at.format("%H:%M:%S").to_string());
    SettingsPanel::new(rows, last_refresh, app.refresh_error.clone()).render(frame, main_area);

    frame.render_widget(
        Paragraph::new(help_text(app.origin)).style(Style::default().fg(Color::DarkGray)),
        help_area,
    );

    if let Some(menu) = tui.edit_menu.as_mut() {
        EditMenu::new(menu).render(frame, frame.area());
    }
}
