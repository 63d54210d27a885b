//! # StatusLine Component
//!
//! Top bar showing the connection target and the one-shot status message.
//!
//! Stateless: all data arrives as props.
//!
//! ```text
//! pgdeck (postgres@db1:5432/app) | Edit config is not supported for remote hosts
//! pgdeck (local:5432)
//! ```

use crate::tui::component::Component;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::Span;

pub struct StatusLine {
    /// Connection label, e.g. `postgres@db1:5432/app`
    pub target: String,
    /// Status message; empty hides the separator
    pub status_message: String,
}

impl StatusLine {
    pub fn new(target: String, status_message: String) -> Self {
        Self {
            target,
            status_message,
        }
    }

    pub fn text(&self) -> String {
        if self.status_message.is_empty() {
            format!("pgdeck ({})", self.target)
        } else {
            format!("pgdeck ({}) | {}", self.target, self.status_message)
        }
    }
}

impl Component for StatusLine {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(Span::raw(self.text()), area);
    }
}
