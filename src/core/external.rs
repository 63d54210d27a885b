//! # External Programs
//!
//! Describes and launches the foreground programs pgdeck hands the
//! terminal to: the pager, the editor and `psql`.
//!
//! ```text
//! ProgramKind ──resolve(env)──► program name
//!                                   │
//!              ExternalProgramRequest { program, args, stdin }
//!                                   │
//!                        Launcher::run(&request)  (blocks)
//! ```
//!
//! Launching goes through the [`Launcher`] trait so the process runner can
//! be tested without spawning anything.

use std::fmt;
use std::io::{self, Write};
use std::process::{Command, Stdio};

use log::{debug, info, warn};

pub const DEFAULT_PAGER: &str = "less";
pub const DEFAULT_EDITOR: &str = "vi";
pub const DEFAULT_PSQL: &str = "psql";

/// The programs pgdeck knows how to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramKind {
    Pager,
    Editor,
    Psql,
}

impl ProgramKind {
    /// Environment variable that overrides the program.
    pub fn env_var(self) -> &'static str {
        match self {
            ProgramKind::Pager => "PAGER",
            ProgramKind::Editor => "EDITOR",
            ProgramKind::Psql => "PSQL",
        }
    }

    pub fn default_program(self) -> &'static str {
        match self {
            ProgramKind::Pager => DEFAULT_PAGER,
            ProgramKind::Editor => DEFAULT_EDITOR,
            ProgramKind::Psql => DEFAULT_PSQL,
        }
    }

    /// The override from `env` if it is set and non-empty, else the default.
    pub fn resolve(self, env: &dyn Fn(&str) -> Option<String>) -> String {
        match env(self.env_var()) {
            Some(program) if !program.is_empty() => program,
            _ => self.default_program().to_string(),
        }
    }
}

/// Where the child's standard input comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum StdinSource {
    /// Piped from an in-memory buffer.
    Buffer(String),
    /// The real terminal input.
    Inherit,
}

/// A single foreground program invocation. Standard output always goes
/// to the terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalProgramRequest {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: StdinSource,
}

impl ExternalProgramRequest {
    /// Program reading `content` from a pipe.
    pub fn piped(program: String, content: String) -> Self {
        Self {
            program,
            args: Vec::new(),
            stdin: StdinSource::Buffer(content),
        }
    }

    /// Interactive program with the terminal attached.
    pub fn interactive(program: String, args: Vec<String>) -> Self {
        Self {
            program,
            args,
            stdin: StdinSource::Inherit,
        }
    }

    /// `program arg1 arg2` for logs and messages.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Why an external program did not finish successfully.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessError {
    /// The program could not be started.
    Launch { program: String, message: String },
    /// The program ran and exited unsuccessfully. `code` is None when it
    /// was killed by a signal.
    Exit { program: String, code: Option<i32> },
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::Launch { program, message } => {
                write!(f, "failed to start {program}: {message}")
            }
            ProcessError::Exit {
                program,
                code: Some(code),
            } => write!(f, "{program} exited with status {code}"),
            ProcessError::Exit {
                program,
                code: None,
            } => write!(f, "{program} was terminated by a signal"),
        }
    }
}

impl std::error::Error for ProcessError {}

/// Runs an external program to completion.
pub trait Launcher {
    /// Start the program and block until it exits.
    fn run(&self, request: &ExternalProgramRequest) -> Result<(), ProcessError>;
}

/// Launcher that spawns real processes on the current terminal.
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn run(&self, request: &ExternalProgramRequest) -> Result<(), ProcessError> {
        info!("Launching external program: {}", request.command_line());
        let launch_error = |e: io::Error| ProcessError::Launch {
            program: request.program.clone(),
            message: e.to_string(),
        };

        let mut command = Command::new(&request.program);
        command
            .args(&request.args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        command.stdin(match request.stdin {
            StdinSource::Buffer(_) => Stdio::piped(),
            StdinSource::Inherit => Stdio::inherit(),
        });

        let mut child = command.spawn().map_err(launch_error)?;

        // Feed the pipe from a separate thread: the pager reads lazily and
        // we must be waiting on it while it does.
        let writer = match (&request.stdin, child.stdin.take()) {
            (StdinSource::Buffer(content), Some(mut stdin)) => {
                let content = content.clone();
                Some(std::thread::spawn(move || {
                    match stdin.write_all(content.as_bytes()) {
                        // Quitting the pager early closes the pipe
                        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                        other => other,
                    }
                }))
            }
            _ => None,
        };

        let status = child.wait().map_err(launch_error)?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Writing to {} stdin failed: {}", request.program, e),
                Err(_) => warn!("stdin writer for {} panicked", request.program),
            }
        }

        debug!("{} exited with {}", request.program, status);
        if status.success() {
            Ok(())
        } else {
            Err(ProcessError::Exit {
                program: request.program.clone(),
                code: status.code(),
            })
        }
    }
}
