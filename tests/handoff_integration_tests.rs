use std::cell::RefCell;
use std::collections::HashMap;
use std::io;

use pgdeck::core::config::ConnectionConfig;
use pgdeck::core::external::{ExternalProgramRequest, Launcher, ProcessError, StdinSource};
use pgdeck::core::render::CONFIG_HEADER;
use pgdeck::core::runner::{ProcessRunner, REMOTE_EDIT_MESSAGE, UiControl};
use pgdeck::core::session::{HandoffPhase, Session};
use pgdeck::core::source::{DataSource, ResultSet, SourceError};
use pgdeck::driver::drive;
use pgdeck::tui::LoopExit;

// ============================================================================
// Fakes
// ============================================================================

struct FakeServer {
    settings: HashMap<&'static str, &'static str>,
}

impl FakeServer {
    fn new() -> Self {
        Self {
            settings: HashMap::from([
                ("data_directory", "/var/lib/postgresql/16/main"),
                ("config_file", "/etc/postgresql/16/main/postgresql.conf"),
                ("hba_file", "/etc/postgresql/16/main/pg_hba.conf"),
                ("ident_file", "/etc/postgresql/16/main/pg_ident.conf"),
            ]),
        }
    }
}

impl DataSource for FakeServer {
    fn config_table(&self) -> Result<ResultSet, SourceError> {
        Ok(ResultSet::new(
            vec![
                "name".to_string(),
                "setting".to_string(),
                "unit".to_string(),
                "category".to_string(),
            ],
            vec![
                vec![
                    "max_connections".to_string(),
                    "100".to_string(),
                    String::new(),
                    "Connections and Authentication".to_string(),
                ],
                vec![
                    "shared_buffers".to_string(),
                    "16384".to_string(),
                    "8kB".to_string(),
                    "Resource Usage / Memory".to_string(),
                ],
            ],
        ))
    }

    fn setting(&self, name: &str) -> Result<String, SourceError> {
        self.settings
            .get(name)
            .map(|v| v.to_string())
            .ok_or_else(|| SourceError::NotFound(name.to_string()))
    }
}

/// Launcher that fails its first `failures` runs.
struct ScriptedLauncher {
    failures: RefCell<usize>,
    seen: RefCell<Vec<ExternalProgramRequest>>,
}

impl ScriptedLauncher {
    fn new(failures: usize) -> Self {
        Self {
            failures: RefCell::new(failures),
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl Launcher for ScriptedLauncher {
    fn run(&self, request: &ExternalProgramRequest) -> Result<(), ProcessError> {
        self.seen.borrow_mut().push(request.clone());
        let mut failures = self.failures.borrow_mut();
        if *failures > 0 {
            *failures -= 1;
            return Err(ProcessError::Exit {
                program: request.program.clone(),
                code: Some(1),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeUi {
    stopped: bool,
    status: Vec<String>,
}

impl UiControl for FakeUi {
    fn set_status(&mut self, message: String) {
        self.status.push(message);
    }

    fn stop(&mut self) -> io::Result<()> {
        self.stopped = true;
        Ok(())
    }

    fn terminal_released(&mut self) {}
}

fn env(key: &str) -> Option<String> {
    match key {
        "PAGER" => Some("more".to_string()),
        _ => None,
    }
}

fn session(host: &str, resume: bool) -> Session {
    Session::new(
        ConnectionConfig {
            host: host.to_string(),
            user: "postgres".to_string(),
            dbname: "app".to_string(),
            ..Default::default()
        },
        resume,
    )
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_failed_pager_is_shown_after_restart() {
    let server = FakeServer::new();
    let launcher = ScriptedLauncher::new(1);
    let runner = ProcessRunner::new(&server, &launcher, &env);
    let mut s = session("", true);
    let mut shown = Vec::new();
    let mut runs = 0;

    drive(&mut s, |session| {
        session.begin_loop().map_err(io::Error::other)?;
        runs += 1;
        if let Some(e) = session.deferred.take() {
            shown.push(e.to_string());
        }
        if runs > 1 {
            return Ok(LoopExit::Quit);
        }
        let mut ui = FakeUi::default();
        runner
            .show_config(&mut ui, session)
            .map_err(io::Error::other)?;
        assert!(ui.stopped);
        Ok(LoopExit::Handoff)
    })
    .unwrap();

    assert_eq!(runs, 2);
    assert_eq!(shown, vec!["more exited with status 1".to_string()]);
    assert!(s.deferred.is_empty());

    let seen = launcher.seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].program, "more");
    match &seen[0].stdin {
        StdinSource::Buffer(text) => {
            assert!(text.starts_with(CONFIG_HEADER));
            assert!(text.contains("shared_buffers"));
            assert!(text.contains("Resource Usage / Memory"));
        }
        other => panic!("expected piped input, got {other:?}"),
    }
}

#[test]
fn test_editor_failure_survives_session_end_without_resume() {
    let server = FakeServer::new();
    let launcher = ScriptedLauncher::new(1);
    let runner = ProcessRunner::new(&server, &launcher, &env);
    let mut s = session("localhost", false);

    drive(&mut s, |session| {
        session.begin_loop().map_err(io::Error::other)?;
        let mut ui = FakeUi::default();
        // The failure is deferred; the driver does not see it.
        let _ = runner.edit_file(&mut ui, session, "recovery.conf");
        Ok(LoopExit::Handoff)
    })
    .unwrap();

    assert_eq!(s.phase(), HandoffPhase::Terminated);
    assert_eq!(
        s.deferred.take().map(|e| e.to_string()),
        Some("vi exited with status 1".to_string())
    );
    assert_eq!(
        launcher.seen.borrow()[0].args,
        vec!["/var/lib/postgresql/16/main/recovery.conf".to_string()]
    );
}

#[test]
fn test_remote_edit_never_leaves_the_loop() {
    let server = FakeServer::new();
    let launcher = ScriptedLauncher::new(0);
    let runner = ProcessRunner::new(&server, &launcher, &env);
    let mut s = session("db.internal", true);
    let mut ui = FakeUi::default();

    drive(&mut s, |session| {
        runner
            .edit_file(&mut ui, session, "config_file")
            .map_err(io::Error::other)?;
        Ok(if ui.stopped {
            LoopExit::Handoff
        } else {
            LoopExit::Quit
        })
    })
    .unwrap();

    assert!(!ui.stopped);
    assert_eq!(ui.status, vec![REMOTE_EDIT_MESSAGE.to_string()]);
    assert!(launcher.seen.borrow().is_empty());
    assert_eq!(s.phase(), HandoffPhase::Running);
}

#[test]
fn test_psql_gets_the_session_connection() {
    let server = FakeServer::new();
    let launcher = ScriptedLauncher::new(0);
    let runner = ProcessRunner::new(&server, &launcher, &env);
    let mut s = session("db.internal", true);
    let mut ui = FakeUi::default();

    runner.run_psql(&mut ui, &mut s).unwrap();

    let seen = launcher.seen.borrow();
    assert_eq!(seen[0].program, "psql");
    assert_eq!(seen[0].stdin, StdinSource::Inherit);
    assert!(seen[0].args.windows(2).any(|w| w == ["-h", "db.internal"]));
    assert!(seen[0].args.windows(2).any(|w| w == ["-U", "postgres"]));
    assert!(seen[0].args.windows(2).any(|w| w == ["-d", "app"]));
    assert_eq!(s.phase(), HandoffPhase::ChildActive);
}
