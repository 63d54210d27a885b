//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.pgdeck/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.
//!
//! `PAGER`, `EDITOR` and `PSQL` are deliberately not part of this file:
//! they are read from the environment each time a program is launched
//! (see `core::external`).

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PgdeckConfig {
    #[serde(default)]
    pub connection: ConnectionSection,
    #[serde(default)]
    pub ui: UiSection,
    #[serde(default)]
    pub log: LogSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConnectionSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub dbname: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UiSection {
    pub refresh_interval_ms: Option<u64>,
    pub resume_after_external: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LogSection {
    pub level: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 2000;
pub const MIN_REFRESH_INTERVAL_MS: u64 = 200;
pub const DEFAULT_LOG_LEVEL: &str = "debug";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

/// Where and as whom to connect. Empty strings mean "let psql decide".
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub dbname: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            user: String::new(),
            dbname: String::new(),
        }
    }
}

impl ConnectionConfig {
    /// psql connection flags for the non-empty fields.
    pub fn psql_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if !self.host.is_empty() {
            args.push("-h".to_string());
            args.push(self.host.clone());
        }
        args.push("-p".to_string());
        args.push(self.port.to_string());
        if !self.user.is_empty() {
            args.push("-U".to_string());
            args.push(self.user.clone());
        }
        if !self.dbname.is_empty() {
            args.push("-d".to_string());
            args.push(self.dbname.clone());
        }
        args
    }

    /// Short `user@host:port/db` label for the status line.
    pub fn label(&self) -> String {
        let host = if self.host.is_empty() {
            "local"
        } else {
            self.host.as_str()
        };
        let mut label = String::new();
        if !self.user.is_empty() {
            label.push_str(&self.user);
            label.push('@');
        }
        label.push_str(&format!("{}:{}", host, self.port));
        if !self.dbname.is_empty() {
            label.push('/');
            label.push_str(&self.dbname);
        }
        label
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub connection: ConnectionConfig,
    pub refresh_interval: Duration,
    pub resume_after_external: bool,
    pub log_level: String,
}

/// Values given on the command line (None = not specified).
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub dbname: Option<String>,
    pub interval_ms: Option<u64>,
    pub no_resume: bool,
    pub log_level: Option<String>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.pgdeck/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".pgdeck").join("config.toml"))
}

/// Load config from `~/.pgdeck/config.toml`.
pub fn load_config() -> Result<PgdeckConfig, ConfigError> {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => {
            warn!("Could not determine home directory, using default config");
            Ok(PgdeckConfig::default())
        }
    }
}

/// Load config from `path`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `PgdeckConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config_from(path: &Path) -> Result<PgdeckConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(PgdeckConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: PgdeckConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# pgdeck configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults -> this file -> env vars -> CLI flags.
# PAGER, EDITOR and PSQL are read from the environment at launch time.

# [connection]
# host = "/var/run/postgresql"   # Or set PGHOST. Socket dirs and localhost count as local.
# port = 5432                    # Or set PGPORT
# user = "postgres"              # Or set PGUSER
# dbname = "postgres"            # Or set PGDATABASE

# [ui]
# refresh_interval_ms = 2000
# resume_after_external = true   # Come back to the dashboard after $PAGER/$EDITOR exits

# [log]
# level = "debug"                # "error", "warn", "info", "debug", "trace"
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &PgdeckConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with_env(config, cli, |key| std::env::var(key).ok())
}

/// Same as [`resolve`], with the environment supplied by `env`.
pub fn resolve_with_env(
    config: &PgdeckConfig,
    cli: &CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    let env = |key: &str| env(key).filter(|v| !v.is_empty());

    // Each connection field: CLI → env → config → default
    let host = cli
        .host
        .clone()
        .or_else(|| env("PGHOST"))
        .or_else(|| config.connection.host.clone())
        .unwrap_or_default();

    let port = cli
        .port
        .or_else(|| {
            env("PGPORT").and_then(|p| match p.parse() {
                Ok(port) => Some(port),
                Err(e) => {
                    warn!("Ignoring invalid PGPORT {:?}: {}", p, e);
                    None
                }
            })
        })
        .or(config.connection.port)
        .unwrap_or(DEFAULT_PORT);

    let user = cli
        .user
        .clone()
        .or_else(|| env("PGUSER"))
        .or_else(|| config.connection.user.clone())
        .unwrap_or_default();

    let dbname = cli
        .dbname
        .clone()
        .or_else(|| env("PGDATABASE"))
        .or_else(|| config.connection.dbname.clone())
        .unwrap_or_default();

    let interval_ms = cli
        .interval_ms
        .or(config.ui.refresh_interval_ms)
        .unwrap_or(DEFAULT_REFRESH_INTERVAL_MS)
        .max(MIN_REFRESH_INTERVAL_MS);

    // --no-resume can only turn resumption off
    let resume_after_external =
        !cli.no_resume && config.ui.resume_after_external.unwrap_or(true);

    let log_level = cli
        .log_level
        .clone()
        .or_else(|| config.log.level.clone())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

    ResolvedConfig {
        connection: ConnectionConfig {
            host,
            port,
            user,
            dbname,
        },
        refresh_interval: Duration::from_millis(interval_ms),
        resume_after_external,
        log_level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config_parses() {
        let config = PgdeckConfig::default();
        assert!(config.connection.host.is_none());
        assert!(config.ui.resume_after_external.is_none());
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let resolved = resolve_with_env(&PgdeckConfig::default(), &CliOverrides::default(), no_env);
        assert_eq!(resolved.connection, ConnectionConfig::default());
        assert_eq!(
            resolved.refresh_interval,
            Duration::from_millis(DEFAULT_REFRESH_INTERVAL_MS)
        );
        assert!(resolved.resume_after_external);
        assert_eq!(resolved.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_resolve_env_beats_file_and_cli_beats_env() {
        let config = PgdeckConfig {
            connection: ConnectionSection {
                host: Some("db.internal".to_string()),
                port: Some(6432),
                user: Some("monitor".to_string()),
                dbname: None,
            },
            ..Default::default()
        };
        let env: HashMap<&str, &str> = [("PGHOST", "envhost"), ("PGUSER", "envuser")].into();
        let cli = CliOverrides {
            user: Some("cliuser".to_string()),
            ..Default::default()
        };

        let resolved = resolve_with_env(&config, &cli, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(resolved.connection.host, "envhost");
        assert_eq!(resolved.connection.port, 6432);
        assert_eq!(resolved.connection.user, "cliuser");
        assert_eq!(resolved.connection.dbname, "");
    }

    #[test]
    fn test_resolve_ignores_empty_and_invalid_env() {
        let config = PgdeckConfig {
            connection: ConnectionSection {
                host: Some("filehost".to_string()),
                port: Some(6000),
                ..Default::default()
            },
            ..Default::default()
        };
        let env: HashMap<&str, &str> = [("PGHOST", ""), ("PGPORT", "not-a-port")].into();
        let resolved = resolve_with_env(&config, &CliOverrides::default(), |k| {
            env.get(k).map(|v| v.to_string())
        });
        assert_eq!(resolved.connection.host, "filehost");
        assert_eq!(resolved.connection.port, 6000);
    }

    #[test]
    fn test_resolve_no_resume_flag_wins() {
        let config = PgdeckConfig {
            ui: UiSection {
                resume_after_external: Some(true),
                ..Default::default()
            },
            ..Default::default()
        };
        let cli = CliOverrides {
            no_resume: true,
            ..Default::default()
        };
        assert!(!resolve_with_env(&config, &cli, no_env).resume_after_external);
    }

    #[test]
    fn test_resolve_clamps_refresh_interval() {
        let cli = CliOverrides {
            interval_ms: Some(10),
            ..Default::default()
        };
        let resolved = resolve_with_env(&PgdeckConfig::default(), &cli, no_env);
        assert_eq!(
            resolved.refresh_interval,
            Duration::from_millis(MIN_REFRESH_INTERVAL_MS)
        );
    }

    #[test]
    fn test_sparse_toml_parses() {
        let toml_str = r#"
[ui]
resume_after_external = false
"#;
        let config: PgdeckConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.ui.resume_after_external, Some(false));
        assert!(config.ui.refresh_interval_ms.is_none());
        assert!(config.connection.port.is_none());
    }

    #[test]
    fn test_load_config_from_generates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = load_config_from(&path).unwrap();
        assert!(config.connection.host.is_none());
        assert!(path.exists());

        // The generated file is all comments, so it loads back as defaults
        let reloaded = load_config_from(&path).unwrap();
        assert!(reloaded.ui.refresh_interval_ms.is_none());
    }

    #[test]
    fn test_load_config_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[connection\nport = ").unwrap();
        assert!(matches!(load_config_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_psql_args_skip_empty_fields() {
        let conn = ConnectionConfig {
            user: "postgres".to_string(),
            ..Default::default()
        };
        assert_eq!(conn.psql_args(), vec!["-p", "5432", "-U", "postgres"]);
    }

    #[test]
    fn test_connection_label() {
        let conn = ConnectionConfig {
            host: "db1".to_string(),
            port: 5433,
            user: "postgres".to_string(),
            dbname: "app".to_string(),
        };
        assert_eq!(conn.label(), "postgres@db1:5433/app");
        assert_eq!(ConnectionConfig::default().label(), "local:5432");
    }
}
