//! # Session State
//!
//! State that outlives a single run of the UI loop. The session driver in
//! `main.rs` owns one [`Session`] and lends it to the loop and, through the
//! loop, to the process runner.
//!
//! ```text
//! Session
//! ├── origin: ConnectionOrigin       // local or remote server
//! ├── connection: ConnectionConfig   // passed to psql
//! ├── resume_after_external: bool    // restart policy after a handoff
//! ├── phase: HandoffPhase            // who owns the terminal
//! └── deferred: DeferredError        // child failure awaiting display
//! ```
//!
//! ## Handoff phases
//!
//! ```text
//! Running ──stop──► Suspending ──► ChildActive ──┬──► Resumed ──► Running
//!                                                └──► Terminated
//! ```
//!
//! Only [`Session::finish_handoff`] leaves `ChildActive`, and it decides
//! between the two exits from the restart policy.

use std::fmt;

use log::{debug, info};

use crate::core::config::{ConnectionConfig, ResolvedConfig};
use crate::core::external::ProcessError;

/// Whether the server runs on this machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOrigin {
    Local,
    Remote,
}

impl ConnectionOrigin {
    /// Classify a libpq host value. Empty hosts and socket directories
    /// connect over a Unix socket, so they are local too.
    pub fn from_host(host: &str) -> Self {
        let host = host.trim();
        if host.is_empty()
            || host.starts_with('/')
            || matches!(host, "localhost" | "127.0.0.1" | "::1")
        {
            ConnectionOrigin::Local
        } else {
            ConnectionOrigin::Remote
        }
    }

    pub fn is_local(self) -> bool {
        self == ConnectionOrigin::Local
    }
}

/// Which side of the handoff currently owns the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffPhase {
    /// The UI loop owns the terminal.
    Running,
    /// The stop signal has been sent; the terminal is being released.
    Suspending,
    /// An external program owns the terminal.
    ChildActive,
    /// The child exited and the UI loop is about to be restarted.
    Resumed,
    /// The child exited and the session ends.
    Terminated,
}

impl HandoffPhase {
    fn can_advance_to(self, next: HandoffPhase) -> bool {
        use HandoffPhase::*;
        matches!(
            (self, next),
            (Running, Suspending)
                | (Suspending, ChildActive)
                | (ChildActive, Resumed)
                | (ChildActive, Terminated)
                | (Resumed, Running)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoffError {
    InvalidTransition {
        from: HandoffPhase,
        to: HandoffPhase,
    },
}

impl fmt::Display for HandoffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandoffError::InvalidTransition { from, to } => {
                write!(f, "invalid terminal handoff: {from:?} -> {to:?}")
            }
        }
    }
}

impl std::error::Error for HandoffError {}

/// Single slot for an external program failure that happened after the
/// UI stopped listening. Last write wins.
#[derive(Debug, Default)]
pub struct DeferredError {
    slot: Option<ProcessError>,
}

impl DeferredError {
    pub fn store(&mut self, error: ProcessError) {
        debug!("Deferring error for later display: {}", error);
        self.slot = Some(error);
    }

    /// Read and clear the slot.
    pub fn take(&mut self) -> Option<ProcessError> {
        self.slot.take()
    }

    pub fn peek(&self) -> Option<&ProcessError> {
        self.slot.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}

/// What the driver does once an external program has exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterHandoff {
    Restart,
    Exit,
}

pub struct Session {
    pub origin: ConnectionOrigin,
    pub connection: ConnectionConfig,
    pub resume_after_external: bool,
    pub deferred: DeferredError,
    phase: HandoffPhase,
}

impl Session {
    pub fn new(connection: ConnectionConfig, resume_after_external: bool) -> Self {
        Self {
            origin: ConnectionOrigin::from_host(&connection.host),
            connection,
            resume_after_external,
            deferred: DeferredError::default(),
            phase: HandoffPhase::Running,
        }
    }

    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(config.connection.clone(), config.resume_after_external)
    }

    pub fn phase(&self) -> HandoffPhase {
        self.phase
    }

    /// Move to `next`, rejecting transitions outside the handoff protocol.
    pub fn advance(&mut self, next: HandoffPhase) -> Result<(), HandoffError> {
        if !self.phase.can_advance_to(next) {
            return Err(HandoffError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        debug!("Handoff phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
        Ok(())
    }

    /// Leave `ChildActive` according to the restart policy.
    pub fn finish_handoff(&mut self) -> Result<AfterHandoff, HandoffError> {
        let (next, after) = if self.resume_after_external {
            (HandoffPhase::Resumed, AfterHandoff::Restart)
        } else {
            (HandoffPhase::Terminated, AfterHandoff::Exit)
        };
        self.advance(next)?;
        info!("External program finished, session will {:?}", after);
        Ok(after)
    }

    /// Called at the top of each UI loop run.
    pub fn begin_loop(&mut self) -> Result<(), HandoffError> {
        match self.phase {
            HandoffPhase::Running => Ok(()),
            _ => self.advance(HandoffPhase::Running),
        }
    }
}
