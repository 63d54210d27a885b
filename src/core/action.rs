//! # Actions
//!
//! Everything that can happen in pgdeck becomes an `Action`.
//! User presses `C`? That's `Action::ShowConfig`.
//! The refresh worker reports back? That's `Action::Snapshot(result)`.
//!
//! `update()` applies an action to the state and returns an [`Effect`]
//! telling the loop what to do next. No I/O happens here; launching
//! programs and stopping the loop belong to the caller.
//!
//! ```text
//! State + Action  →  update()  →  Effect
//! ```

use chrono::Local;
use log::{debug, warn};

use crate::core::external::ProcessError;
use crate::core::source::{ResultSet, SourceError};
use crate::core::state::App;

#[derive(Debug)]
pub enum Action {
    /// Result of a background refresh of the settings panel.
    Snapshot(Result<ResultSet, SourceError>),
    /// A deferred external program failure surfaced by the loop.
    ExternalFailed(ProcessError),
    /// Page the full configuration.
    ShowConfig,
    /// Edit the file behind the given setting.
    Edit(String),
    /// Open psql on the current connection.
    Psql,
    Quit,
}

/// What the loop should do after an update.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    Quit,
    ShowConfig,
    Edit(String),
    Psql,
}

pub fn update(app: &mut App, action: Action) -> Effect {
    match action {
        Action::Snapshot(Ok(panel)) => {
            debug!("Settings panel refreshed ({} rows)", panel.rows.len());
            app.panel = panel;
            app.last_refresh = Some(Local::now());
            app.refresh_error = None;
            Effect::None
        }
        Action::Snapshot(Err(e)) => {
            warn!("Settings refresh failed: {}", e);
            app.refresh_error = Some(e.to_string());
            Effect::None
        }
        Action::ExternalFailed(e) => {
            app.status_message = e.to_string();
            Effect::None
        }
        Action::ShowConfig => Effect::ShowConfig,
        Action::Edit(target) => Effect::Edit(target),
        Action::Psql => Effect::Psql,
        Action::Quit => Effect::Quit,
    }
}
