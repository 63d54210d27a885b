//! # Session Driver
//!
//! Runs the UI loop until the user quits or the restart policy ends the
//! session after an external program. The loop itself is passed in, so the
//! driver never touches the terminal.

use std::io;

use log::info;

use crate::core::session::{AfterHandoff, Session};
use crate::tui::LoopExit;

/// Run `run_once` until the session is over.
///
/// A deferred error still pending afterwards is left in the session for
/// the caller to report.
pub fn drive<F>(session: &mut Session, mut run_once: F) -> io::Result<()>
where
    F: FnMut(&mut Session) -> io::Result<LoopExit>,
{
    let mut runs = 0usize;
    loop {
        runs += 1;
        info!("Starting UI loop (run {})", runs);
        match run_once(session)? {
            LoopExit::Quit => break,
            LoopExit::Handoff => {
                match session.finish_handoff().map_err(io::Error::other)? {
                    AfterHandoff::Restart => continue,
                    AfterHandoff::Exit => break,
                }
            }
        }
    }
    info!("Session ended after {} run(s)", runs);
    Ok(())
}
