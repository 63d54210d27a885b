//! # TUI Components
//!
//! ## Stateless Components (Props-Based Rendering)
//!
//! - `StatusLine`: top bar with the connection target and status message
//! - `SettingsPanel`: refreshed server settings
//!
//! ## Stateful Components (Event-Driven)
//!
//! - `EditMenu`: overlay for choosing a configuration file to edit
//!
//! Components receive external data as props, never by reaching into
//! `App` themselves:
//!
//! ```rust,ignore
//! StatusLine::new(app.target.clone(), app.status_message.clone()).render(frame, area);
//! ```

pub mod edit_menu;
mod settings_panel;
mod status_line;

pub use edit_menu::{EditMenu, EditMenuEvent, EditMenuState};
pub use settings_panel::SettingsPanel;
pub use status_line::StatusLine;
