//! # SettingsPanel Component
//!
//! Main area: the periodically refreshed server settings (data directory
//! and the configuration file locations) plus when they were last fetched.
//!
//! Stateless like [`StatusLine`](super::StatusLine). The refresh line shows,
//! in priority order: the last refresh error, the refresh time, or
//! "waiting for first refresh".

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Padding, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::tui::component::Component;

pub struct SettingsPanel {
    pub rows: Vec<(String, String)>,
    /// Formatted time of the last successful refresh
    pub last_refresh: Option<String>,
    pub refresh_error: Option<String>,
}

impl SettingsPanel {
    pub fn new(
        rows: Vec<(String, String)>,
        last_refresh: Option<String>,
        refresh_error: Option<String>,
    ) -> Self {
        Self {
            rows,
            last_refresh,
            refresh_error,
        }
    }

    fn refresh_line(&self) -> Line<'static> {
        match (&self.refresh_error, &self.last_refresh) {
            (Some(error), _) => Line::from(Span::styled(
                format!("refresh failed: {error}"),
                Style::default().fg(Color::Red),
            )),
            (None, Some(at)) => Line::from(Span::styled(
                format!("refreshed at {at}"),
                Style::default().fg(Color::DarkGray),
            )),
            (None, None) => Line::from(Span::styled(
                "waiting for first refresh",
                Style::default().fg(Color::DarkGray),
            )),
        }
    }
}

impl Component for SettingsPanel {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Settings ")
            .padding(Padding::horizontal(1));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [rows_area, refresh_area] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(inner);

        let name_width = self
            .rows
            .iter()
            .map(|(name, _)| name.width())
            .max()
            .unwrap_or(0);

        let lines: Vec<Line> = self
            .rows
            .iter()
            .map(|(name, value)| {
                let padding = " ".repeat(name_width - name.width() + 2);
                Line::from(vec![
                    Span::styled(name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(padding),
                    Span::raw(value.clone()),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), rows_area);
        frame.render_widget(Paragraph::new(self.refresh_line()), refresh_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn rendered(panel: &mut SettingsPanel, width: u16, height: u16) -> Vec<String> {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| panel.render(f, f.area())).unwrap();
        let buffer = terminal.backend().buffer();
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buffer[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect()
    }

    fn rows() -> Vec<(String, String)> {
        vec![
            ("data_directory".to_string(), "/var/lib/pg".to_string()),
            ("hba_file".to_string(), "/etc/pg/pg_hba.conf".to_string()),
        ]
    }

    #[test]
    fn test_values_are_aligned_after_longest_name() {
        let mut panel = SettingsPanel::new(rows(), Some("12:00:00".to_string()), None);
        let lines = rendered(&mut panel, 60, 6);

        let data_line = lines.iter().find(|l| l.contains("data_directory")).unwrap();
        let hba_line = lines.iter().find(|l| l.contains("hba_file")).unwrap();
        assert_eq!(data_line.find("/var/lib/pg"), hba_line.find("/etc/pg/pg_hba.conf"));
        assert!(lines.iter().any(|l| l.contains("refreshed at 12:00:00")));
    }

    #[test]
    fn test_refresh_error_takes_priority() {
        let mut panel = SettingsPanel::new(
            rows(),
            Some("12:00:00".to_string()),
            Some("query failed: timeout".to_string()),
        );
        let text = rendered(&mut panel, 60, 6).concat();

        assert!(text.contains("refresh failed: query failed: timeout"));
        assert!(!text.contains("refreshed at"));
    }

    #[test]
    fn test_before_first_refresh() {
        let mut panel = SettingsPanel::new(Vec::new(), None, None);
        let text = rendered(&mut panel, 60, 4).concat();

        assert!(text.contains("Settings"));
        assert!(text.contains("waiting for first refresh"));
    }
}
