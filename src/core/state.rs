//! # Application State
//!
//! Core state for one run of the UI loop. Presentation-only state (menu
//! selection and the like) lives in the `tui` module.
//!
//! ```text
//! App
//! ├── target: String                 // user@host:port/db label
//! ├── origin: ConnectionOrigin       // local or remote server
//! ├── status_message: String         // status line text
//! ├── panel: ResultSet               // last refreshed settings
//! ├── last_refresh: Option<DateTime> // when `panel` was fetched
//! └── refresh_error: Option<String>  // last refresh failure
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use chrono::{DateTime, Local};

use crate::core::session::{ConnectionOrigin, Session};
use crate::core::source::{
    GUC_CONFIG_FILE, GUC_DATA_DIRECTORY, GUC_HBA_FILE, GUC_IDENT_FILE, ResultSet,
};

/// Settings shown in the refresh panel, in display order.
pub const PANEL_SETTINGS: &[&str] = &[
    GUC_DATA_DIRECTORY,
    GUC_CONFIG_FILE,
    GUC_HBA_FILE,
    GUC_IDENT_FILE,
];

pub struct App {
    pub target: String,
    pub origin: ConnectionOrigin,
    pub status_message: String,
    pub panel: ResultSet,
    pub last_refresh: Option<DateTime<Local>>,
    pub refresh_error: Option<String>,
}

impl App {
    pub fn new(target: String, origin: ConnectionOrigin) -> Self {
        Self {
            target,
            origin,
            status_message: String::new(),
            panel: ResultSet::default(),
            last_refresh: None,
            refresh_error: None,
        }
    }

    pub fn from_session(session: &Session) -> Self {
        Self::new(session.connection.label(), session.origin)
    }

    /// Panel rows in `PANEL_SETTINGS` order; unknown values are empty.
    pub fn panel_rows(&self) -> Vec<(&'static str, &str)> {
        PANEL_SETTINGS
            .iter()
            .map(|name| (*name, self.panel.lookup(name, 1).unwrap_or("")))
            .collect()
    }
}
