//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::rc::Rc;

use crate::core::external::{ExternalProgramRequest, Launcher, ProcessError};
use crate::core::runner::UiControl;
use crate::core::source::{DataSource, ResultSet, SourceError};

/// Environment with nothing set.
pub fn no_env(_: &str) -> Option<String> {
    None
}

/// Ordered record of what the fakes saw, shared between them.
#[derive(Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<String>>>);

impl EventLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

/// In-memory data source with a fixed config table and settings map.
pub struct StaticSource {
    table: Result<ResultSet, SourceError>,
    settings: HashMap<String, String>,
}

impl StaticSource {
    pub fn new(table: Result<ResultSet, SourceError>) -> Self {
        Self {
            table,
            settings: HashMap::new(),
        }
    }

    /// `(name, setting)` config rows.
    pub fn with_rows(rows: &[(&str, &str)]) -> Self {
        Self::new(Ok(ResultSet::new(
            vec!["name".to_string(), "setting".to_string()],
            rows.iter()
                .map(|(n, s)| vec![n.to_string(), s.to_string()])
                .collect(),
        )))
    }

    pub fn failing_table(error: SourceError) -> Self {
        Self::new(Err(error))
    }

    pub fn setting(mut self, name: &str, value: &str) -> Self {
        self.settings.insert(name.to_string(), value.to_string());
        self
    }
}

impl DataSource for StaticSource {
    fn config_table(&self) -> Result<ResultSet, SourceError> {
        self.table.clone()
    }

    fn setting(&self, name: &str) -> Result<String, SourceError> {
        self.settings
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(name.to_string()))
    }
}

/// Launcher that records requests instead of spawning processes.
pub struct RecordingLauncher {
    log: EventLog,
    outcome: Result<(), ProcessError>,
    requests: RefCell<Vec<ExternalProgramRequest>>,
}

impl RecordingLauncher {
    pub fn succeeding(log: EventLog) -> Self {
        Self {
            log,
            outcome: Ok(()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(log: EventLog, error: ProcessError) -> Self {
        Self {
            outcome: Err(error),
            ..Self::succeeding(log)
        }
    }

    pub fn requests(&self) -> Vec<ExternalProgramRequest> {
        self.requests.borrow().clone()
    }
}

impl Launcher for RecordingLauncher {
    fn run(&self, request: &ExternalProgramRequest) -> Result<(), ProcessError> {
        self.log.push(format!("launch {}", request.program));
        self.requests.borrow_mut().push(request.clone());
        self.outcome.clone()
    }
}

/// UI handle that counts stop/release calls and keeps status messages.
pub struct RecordingUi {
    log: EventLog,
    pub statuses: Vec<String>,
    pub stops: usize,
    pub released: usize,
    pub fail_stop: bool,
}

impl RecordingUi {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            statuses: Vec::new(),
            stops: 0,
            released: 0,
            fail_stop: false,
        }
    }
}

impl UiControl for RecordingUi {
    fn set_status(&mut self, message: String) {
        self.log.push(format!("status {message}"));
        self.statuses.push(message);
    }

    fn stop(&mut self) -> io::Result<()> {
        self.log.push("stop");
        self.stops += 1;
        if self.fail_stop {
            return Err(io::Error::other("terminal gone"));
        }
        Ok(())
    }

    fn terminal_released(&mut self) {
        self.log.push("released");
        self.released += 1;
    }
}
