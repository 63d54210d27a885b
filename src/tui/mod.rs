//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the UI,
//! and translates keyboard events into core::Action values.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## One run of the loop
//!
//! ```text
//! run()
//!  ├── refresh worker (tokio task) ── Action::Snapshot ──► mpsc ──┐
//!  │                                                              ▼
//!  └── event loop: deferred error? → drain actions → draw → poll keys
//!                                                   │
//!                         C / E+menu / P            ▼
//!                     ProcessRunner ──stop()──► TuiControl
//!                                                   │
//!                                     worker stopped, terminal restored
//!                                                   ▼
//!                                          LoopExit::Handoff
//! ```
//!
//! A run ends either with `Quit` or, after an external program has
//! exited, with `Handoff`. The session driver decides whether a handed-off
//! loop is started again.

mod component;
mod components;
mod event;
mod ui;

use std::io::{self, stdout};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once, mpsc};
use std::time::Duration;

use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, disable_raw_mode, enable_raw_mode};
use log::{debug, info, warn};
use ratatui::backend::CrosstermBackend;
use ratatui::{DefaultTerminal, Terminal};
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

use crate::core::action::{Action, Effect, update};
use crate::core::external::Launcher;
use crate::core::runner::{ProcessRunner, RunnerError, UiControl};
use crate::core::session::Session;
use crate::core::source::DataSource;
use crate::core::state::{App, PANEL_SETTINGS};
use crate::tui::component::EventHandler;
use crate::tui::components::{EditMenuEvent, EditMenuState};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

const POLL_TIMEOUT: Duration = Duration::from_millis(250);

static PANIC_HOOK: Once = Once::new();
static PANIC_HOOKS_INSTALLED: AtomicUsize = AtomicUsize::new(0);

/// Restore the terminal before the default panic output. Installed once per
/// process; the loop may be started many times.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = ratatui::try_restore();
            previous(info);
        }));
        PANIC_HOOKS_INSTALLED.fetch_add(1, Ordering::SeqCst);
    });
}

/// Raw mode + alternate screen, without touching the panic hook.
fn init_terminal() -> io::Result<DefaultTerminal> {
    install_panic_hook();
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout()))
}

/// How a run of the UI loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The user quit.
    Quit,
    /// The terminal was handed to an external program, which has exited.
    Handoff,
}

/// TUI-specific presentation state (not part of core business logic)
pub struct TuiState {
    // Edit menu overlay (None = hidden)
    pub edit_menu: Option<EditMenuState>,
}

impl TuiState {
    pub fn new() -> Self {
        Self { edit_menu: None }
    }
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> io::Result<Self> {
        execute!(stdout(), Hide)?;
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), Show);
    }
}

/// Everything that has to be let go before another program may use the
/// terminal.
struct TerminalHandle {
    refresh_stop: Option<oneshot::Sender<()>>,
    mode_guard: Option<TerminalModeGuard>,
    released: bool,
}

impl TerminalHandle {
    /// Stop the refresh worker and restore the terminal. Idempotent.
    fn release(&mut self) -> io::Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        // Never wait for the worker here: it may be blocked in a query.
        if let Some(stop) = self.refresh_stop.take()
            && stop.send(()).is_err()
        {
            debug!("Refresh worker already gone");
        }
        drop(self.mode_guard.take());
        ratatui::try_restore()?;
        info!("Terminal released");
        Ok(())
    }
}

/// The loop's side of a handoff, lent to the process runner.
struct TuiControl<'a> {
    app: &'a mut App,
    terminal: &'a mut TerminalHandle,
}

impl UiControl for TuiControl<'_> {
    fn set_status(&mut self, message: String) {
        self.app.status_message = message;
    }

    fn stop(&mut self) -> io::Result<()> {
        self.terminal.release()
    }

    fn terminal_released(&mut self) {
        // The child may have left the terminal in raw mode.
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to reset terminal mode: {}", e);
        }
        let _ = execute!(stdout(), Show);
    }
}

/// Run the UI loop once.
pub fn run(
    session: &mut Session,
    source: Arc<dyn DataSource>,
    launcher: &dyn Launcher,
    refresh_interval: Duration,
) -> io::Result<LoopExit> {
    session.begin_loop().map_err(io::Error::other)?;

    let (tx, rx) = mpsc::channel();
    let mut handle = TerminalHandle {
        refresh_stop: Some(spawn_refresh_worker(
            Arc::clone(&source),
            refresh_interval,
            tx,
        )),
        mode_guard: None,
        released: false,
    };

    let result = init_terminal().and_then(|mut terminal| {
        handle.mode_guard = Some(TerminalModeGuard::new()?);
        event_loop(
            &mut terminal,
            &mut handle,
            session,
            source.as_ref(),
            launcher,
            &rx,
        )
    });

    let released = handle.release();
    let exit = result?;
    released?;
    info!("UI loop finished: {:?}", exit);
    Ok(exit)
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    handle: &mut TerminalHandle,
    session: &mut Session,
    source: &dyn DataSource,
    launcher: &dyn Launcher,
    rx: &mpsc::Receiver<Action>,
) -> io::Result<LoopExit> {
    let env = |key: &str| std::env::var(key).ok();
    let runner = ProcessRunner::new(source, launcher, &env);
    let mut app = App::from_session(session);
    let mut tui = TuiState::new();
    let mut needs_redraw = true;

    loop {
        if absorb_pending(session, &mut app, rx) {
            needs_redraw = true;
        }

        if needs_redraw {
            terminal.draw(|f| ui::draw_ui(f, &app, &mut tui))?;
            needs_redraw = false;
        }

        // Process first event + drain ALL pending events before next draw
        let first_event = poll_event_timeout(POLL_TIMEOUT);
        if first_event.is_some() {
            needs_redraw = true;
        }
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            let Some(action) = translate_event(&mut tui, event) else {
                continue;
            };
            let effect = update(&mut app, action);
            if effect == Effect::Quit {
                info!("Quit requested");
                return Ok(LoopExit::Quit);
            }

            let mut control = TuiControl {
                app: &mut app,
                terminal: &mut *handle,
            };
            execute_effect(effect, &runner, &mut control, session).map_err(io::Error::other)?;

            if handle.released {
                return Ok(LoopExit::Handoff);
            }
        }
    }
}

/// Fold everything that arrived since the last iteration into `app`: a
/// deferred external program failure, then background refresh results.
/// Returns whether anything changed.
fn absorb_pending(session: &mut Session, app: &mut App, rx: &mpsc::Receiver<Action>) -> bool {
    let mut changed = false;
    if let Some(error) = session.deferred.take() {
        update(app, Action::ExternalFailed(error));
        changed = true;
    }

    // Handle background refresh results
    while let Ok(action) = rx.try_recv() {
        debug!("Event loop received: {:?}", action);
        update(app, action);
        changed = true;
    }
    changed
}

/// Map a terminal event to a core action, routing through the edit menu
/// while it is open.
fn translate_event(tui: &mut TuiState, event: TuiEvent) -> Option<Action> {
    match event {
        TuiEvent::Quit => return Some(Action::Quit),
        TuiEvent::Resize => return None,
        _ => {}
    }

    if let Some(menu) = tui.edit_menu.as_mut() {
        return match menu.handle_event(&event) {
            Some(EditMenuEvent::Select(target)) => {
                tui.edit_menu = None;
                Some(Action::Edit(target.to_string()))
            }
            Some(EditMenuEvent::Dismiss) => {
                tui.edit_menu = None;
                None
            }
            None => None,
        };
    }

    match event {
        TuiEvent::ShowConfig => Some(Action::ShowConfig),
        TuiEvent::Psql => Some(Action::Psql),
        TuiEvent::OpenEditMenu => {
            tui.edit_menu = Some(EditMenuState::new());
            None
        }
        TuiEvent::Escape => Some(Action::Quit),
        _ => None,
    }
}

/// Carry out a command effect through the process runner.
///
/// Editor and psql failures are already parked in the session's deferred
/// slot by the runner, so they end here.
fn execute_effect(
    effect: Effect,
    runner: &ProcessRunner,
    ui: &mut dyn UiControl,
    session: &mut Session,
) -> Result<(), RunnerError> {
    let result = match effect {
        Effect::ShowConfig => runner.show_config(ui, session),
        Effect::Edit(target) => runner.edit_file(ui, session, &target),
        Effect::Psql => runner.run_psql(ui, session),
        Effect::None | Effect::Quit => Ok(()),
    };
    match result {
        Err(RunnerError::Process(e)) => {
            debug!("External program failed: {}", e);
            Ok(())
        }
        other => other,
    }
}

/// Periodically fetch the panel settings until `stop` fires or the loop
/// hangs up.
fn spawn_refresh_worker(
    source: Arc<dyn DataSource>,
    interval: Duration,
    tx: mpsc::Sender<Action>,
) -> oneshot::Sender<()> {
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    info!("Spawning refresh worker (every {:?})", interval);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                _ = ticker.tick() => {}
            }

            let source = Arc::clone(&source);
            let query = tokio::task::spawn_blocking(move || source.settings(PANEL_SETTINGS));
            let result = tokio::select! {
                _ = &mut stop_rx => break,
                joined = query => joined,
            };

            match result {
                Ok(snapshot) => {
                    if tx.send(Action::Snapshot(snapshot)).is_err() {
                        debug!("Refresh receiver dropped");
                        break;
                    }
                }
                Err(e) => warn!("Refresh query task failed: {}", e),
            }
        }
        debug!("Refresh worker stopped");
    });

    stop_tx
}
