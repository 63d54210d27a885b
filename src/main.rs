use std::fs::File;
use std::str::FromStr;
use std::sync::Arc;

use clap::{ArgAction, Parser};
use pgdeck::core::config::{self, CliOverrides, PgdeckConfig};
use pgdeck::core::external::{ProgramKind, SystemLauncher};
use pgdeck::core::session::Session;
use pgdeck::core::source::{DataSource, PsqlSource};
use pgdeck::{driver, tui};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

#[derive(Parser)]
#[command(
    name = "pgdeck",
    about = "Terminal dashboard for PostgreSQL configuration",
    disable_help_flag = true
)]
struct Args {
    /// Database server host or socket directory
    #[arg(short = 'h', long)]
    host: Option<String>,

    /// Database server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Database user name
    #[arg(short = 'U', long)]
    user: Option<String>,

    /// Database name
    #[arg(short, long)]
    dbname: Option<String>,

    /// Settings refresh interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Exit instead of returning to the dashboard after an external program
    #[arg(long)]
    no_resume: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            dbname: self.dbname.clone(),
            interval_ms: self.interval_ms,
            no_resume: self.no_resume,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to pgdeck.log in current directory.
    // Everything is captured until the configured level is known.
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(log_file) = File::create("pgdeck.log") {
        let _ = WriteLogger::init(LevelFilter::Trace, log_config, log_file);
    }

    let file_config = config::load_config().unwrap_or_else(|e| {
        log::warn!("Ignoring config file: {}", e);
        eprintln!("pgdeck: ignoring config file: {e}");
        PgdeckConfig::default()
    });
    let resolved = config::resolve(&file_config, &args.overrides());

    let level = LevelFilter::from_str(&resolved.log_level).unwrap_or_else(|_| {
        log::warn!("Unknown log level {:?}, using debug", resolved.log_level);
        LevelFilter::Debug
    });
    log::set_max_level(level);

    log::info!(
        "pgdeck starting up: {} (refresh every {:?})",
        resolved.connection.label(),
        resolved.refresh_interval
    );

    let psql = ProgramKind::Psql.resolve(&|key: &str| std::env::var(key).ok());
    let source: Arc<dyn DataSource> =
        Arc::new(PsqlSource::new(psql, resolved.connection.clone()));
    let launcher = SystemLauncher;
    let mut session = Session::from_config(&resolved);

    let result = driver::drive(&mut session, |session| {
        tui::run(
            session,
            Arc::clone(&source),
            &launcher,
            resolved.refresh_interval,
        )
    });

    // Nothing is left to show a child failure from the last handoff.
    if let Some(e) = session.deferred.take() {
        log::warn!("Exiting with pending error: {}", e);
        eprintln!("pgdeck: {e}");
    }

    log::info!("pgdeck shutting down");
    result
}
