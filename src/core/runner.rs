//! # Process Runner
//!
//! Hands the terminal from the UI loop to an external program and back.
//!
//! Every operation follows the same order:
//!
//! 1. gather what the child needs (query, path lookup) while the UI is
//!    still running, reporting failures on the status line;
//! 2. take a [`TerminalLease`]: the stop signal fires and the phase moves
//!    `Running → Suspending → ChildActive`;
//! 3. run the child and block until it exits;
//! 4. drop the lease so the terminal is left in a sane state, and park a
//!    child failure in the session's deferred error slot.
//!
//! The UI loop stays stopped afterwards. Restarting it is the session
//! driver's call (`Session::finish_handoff`).

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::core::external::{ExternalProgramRequest, Launcher, ProcessError, ProgramKind};
use crate::core::render::render_config;
use crate::core::session::{HandoffError, HandoffPhase, Session};
use crate::core::source::{DataSource, GUC_DATA_DIRECTORY, GUC_RECOVERY_FILE, SourceError};

pub const REMOTE_EDIT_MESSAGE: &str = "Edit config is not supported for remote hosts";

/// The handle the UI loop gives the runner.
pub trait UiControl {
    /// Show a one-shot message on the status line.
    fn set_status(&mut self, message: String);

    /// Stop the refresh cycle and release the terminal. Only the first
    /// call has an effect; it must not block on the refresh worker.
    fn stop(&mut self) -> io::Result<()>;

    /// The child is gone (or never started): leave the terminal usable.
    fn terminal_released(&mut self);
}

#[derive(Debug)]
pub enum RunnerError {
    /// The handoff protocol was violated.
    Handoff(HandoffError),
    /// The UI could not release the terminal.
    Terminal(io::Error),
    /// The external program failed (editor and psql only).
    Process(ProcessError),
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerError::Handoff(e) => write!(f, "{e}"),
            RunnerError::Terminal(e) => write!(f, "terminal error: {e}"),
            RunnerError::Process(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RunnerError {}

impl From<HandoffError> for RunnerError {
    fn from(e: HandoffError) -> Self {
        RunnerError::Handoff(e)
    }
}

impl From<io::Error> for RunnerError {
    fn from(e: io::Error) -> Self {
        RunnerError::Terminal(e)
    }
}

/// Exclusive use of the terminal by a child process.
///
/// Acquiring sends the stop signal; dropping tells the UI side the
/// terminal is free again, whichever way the child went.
pub struct TerminalLease<'a> {
    ui: &'a mut dyn UiControl,
}

impl<'a> TerminalLease<'a> {
    pub fn acquire(ui: &'a mut dyn UiControl, session: &mut Session) -> Result<Self, RunnerError> {
        session.advance(HandoffPhase::Suspending)?;
        let mut lease = Self { ui };
        lease.ui.stop()?;
        session.advance(HandoffPhase::ChildActive)?;
        Ok(lease)
    }
}

impl Drop for TerminalLease<'_> {
    fn drop(&mut self) {
        self.ui.terminal_released();
    }
}

pub struct ProcessRunner<'a> {
    source: &'a dyn DataSource,
    launcher: &'a dyn Launcher,
    env: &'a dyn Fn(&str) -> Option<String>,
}

impl<'a> ProcessRunner<'a> {
    pub fn new(
        source: &'a dyn DataSource,
        launcher: &'a dyn Launcher,
        env: &'a dyn Fn(&str) -> Option<String>,
    ) -> Self {
        Self {
            source,
            launcher,
            env,
        }
    }

    /// Fetch and render the configuration table, then page it.
    ///
    /// A failed query is reported on the status line and nothing else
    /// happens.
    pub fn show_config(
        &self,
        ui: &mut dyn UiControl,
        session: &mut Session,
    ) -> Result<(), RunnerError> {
        let table = match self.source.config_table() {
            Ok(table) => table,
            Err(e) => {
                warn!("Config query failed, not starting pager: {}", e);
                ui.set_status(e.to_string());
                return Ok(());
            }
        };
        self.show_via_pager(ui, session, render_config(&table))
    }

    /// Pipe `content` into `$PAGER`.
    ///
    /// Pager failures only land in the deferred error slot; the caller
    /// always gets `Ok` once the pager has run.
    pub fn show_via_pager(
        &self,
        ui: &mut dyn UiControl,
        session: &mut Session,
        content: String,
    ) -> Result<(), RunnerError> {
        let pager = ProgramKind::Pager.resolve(self.env);
        let request = ExternalProgramRequest::piped(pager, content);
        // The child's outcome is already parked in the deferred slot.
        self.hand_off(ui, session, &request)
            .map(|_deferred_outcome| ())
    }

    /// Open the file behind `target` in `$EDITOR`.
    ///
    /// `target` is a setting holding a file path, or `recovery.conf`,
    /// which lives in the data directory. Local servers only.
    pub fn edit_file(
        &self,
        ui: &mut dyn UiControl,
        session: &mut Session,
        target: &str,
    ) -> Result<(), RunnerError> {
        if !session.origin.is_local() {
            info!("Refusing to edit {} on remote host {}", target, session.connection.host);
            ui.set_status(REMOTE_EDIT_MESSAGE.to_string());
            return Ok(());
        }

        let path = match self.resolve_edit_path(target) {
            Ok(path) => path,
            Err(e) => {
                warn!("Could not resolve path for {}: {}", target, e);
                ui.set_status(format!("{target}: {e}"));
                return Ok(());
            }
        };

        let editor = ProgramKind::Editor.resolve(self.env);
        let request = ExternalProgramRequest::interactive(
            editor,
            vec![path.to_string_lossy().into_owned()],
        );
        self.hand_off(ui, session, &request)?
            .map_err(RunnerError::Process)
    }

    /// Start an interactive psql session against the current server.
    pub fn run_psql(
        &self,
        ui: &mut dyn UiControl,
        session: &mut Session,
    ) -> Result<(), RunnerError> {
        let psql = ProgramKind::Psql.resolve(self.env);
        let request = ExternalProgramRequest::interactive(psql, session.connection.psql_args());
        self.hand_off(ui, session, &request)?
            .map_err(RunnerError::Process)
    }

    /// File path to open for `target`.
    pub fn resolve_edit_path(&self, target: &str) -> Result<PathBuf, SourceError> {
        if target == GUC_RECOVERY_FILE {
            let data_directory = non_empty(GUC_DATA_DIRECTORY, self.source.setting(GUC_DATA_DIRECTORY)?)?;
            Ok(Path::new(&data_directory).join(GUC_RECOVERY_FILE))
        } else {
            Ok(PathBuf::from(non_empty(target, self.source.setting(target)?)?))
        }
    }

    /// Suspend the UI, run `request`, and record a child failure.
    ///
    /// The outer `Result` is the handoff itself; the inner one is the
    /// child's outcome.
    fn hand_off(
        &self,
        ui: &mut dyn UiControl,
        session: &mut Session,
        request: &ExternalProgramRequest,
    ) -> Result<Result<(), ProcessError>, RunnerError> {
        info!("Handing terminal to {}", request.command_line());
        let lease = TerminalLease::acquire(ui, session)?;
        let outcome = self.launcher.run(request);
        drop(lease);

        match &outcome {
            Ok(()) => info!("{} exited cleanly", request.program),
            Err(e) => {
                warn!("External program failed: {}", e);
                session.deferred.store(e.clone());
            }
        }
        Ok(outcome)
    }
}

/// An empty setting value is as good as a missing one.
fn non_empty(name: &str, value: String) -> Result<String, SourceError> {
    if value.trim().is_empty() {
        Err(SourceError::NotFound(name.to_string()))
    } else {
        Ok(value)
    }
}
