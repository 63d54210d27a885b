//! # Data Source
//!
//! Everything pgdeck knows about the server comes through [`DataSource`]:
//! the full `pg_settings` table for the pager, and single setting lookups
//! for the editor and the refresh panel.
//!
//! The shipped implementation, [`PsqlSource`], runs the `psql` client in
//! unaligned mode and parses its output. Failures come back as
//! [`SourceError`] values; nothing here touches the terminal.

use std::fmt;
use std::process::{Command, Stdio};

use log::{debug, warn};

use crate::core::config::ConnectionConfig;

/// Query returning the whole configuration table shown in the pager.
pub const CONFIG_ALL_QUERY: &str =
    "SELECT name, setting, unit, category FROM pg_settings ORDER BY 4";

/// Setting that holds the cluster's data directory.
pub const GUC_DATA_DIRECTORY: &str = "data_directory";
pub const GUC_CONFIG_FILE: &str = "config_file";
pub const GUC_HBA_FILE: &str = "hba_file";
pub const GUC_IDENT_FILE: &str = "ident_file";

/// Not a real setting: the recovery file has no GUC of its own, so its path
/// is built from `data_directory` instead.
pub const GUC_RECOVERY_FILE: &str = "recovery.conf";

// psql unaligned output separators (ASCII unit / record separators)
const FIELD_SEP: &str = "\u{1f}";
const RECORD_SEP: &str = "\u{1e}";

/// Errors reported by a data source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    /// The client program could not be started at all.
    Launch(String),
    /// The server (or client) rejected the query.
    Query(String),
    /// The query succeeded but returned something unexpected.
    Parse(String),
    /// A scalar lookup found no row.
    NotFound(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Launch(msg) => write!(f, "failed to start client: {msg}"),
            SourceError::Query(msg) => write!(f, "query failed: {msg}"),
            SourceError::Parse(msg) => write!(f, "unexpected query output: {msg}"),
            SourceError::NotFound(name) => write!(f, "setting not found: {name}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// A tabular query result: column names plus rows of text cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Find the value in `value_col` for the row whose first cell is `key`.
    pub fn lookup(&self, key: &str, value_col: usize) -> Option<&str> {
        self.rows
            .iter()
            .find(|row| row.first().map(String::as_str) == Some(key))
            .and_then(|row| row.get(value_col))
            .map(String::as_str)
    }
}

/// Query surface consumed by the process runner and the refresh worker.
pub trait DataSource: Send + Sync {
    /// The full configuration table (`CONFIG_ALL_QUERY`).
    fn config_table(&self) -> Result<ResultSet, SourceError>;

    /// Current value of a single setting.
    fn setting(&self, name: &str) -> Result<String, SourceError>;

    /// `(name, setting)` rows for several settings at once.
    ///
    /// The default asks for each name separately and stops at the first failure.
    fn settings(&self, names: &[&str]) -> Result<ResultSet, SourceError> {
        let mut rows = Vec::with_capacity(names.len());
        for name in names {
            rows.push(vec![name.to_string(), self.setting(name)?]);
        }
        Ok(ResultSet::new(
            vec!["name".to_string(), "setting".to_string()],
            rows,
        ))
    }
}

/// Quote a string as an SQL literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Parse psql's unaligned output (`-A -F US -R RS`, header included).
pub fn parse_unaligned(output: &str) -> Result<ResultSet, SourceError> {
    // psql ends the last record with a single newline; anything before it
    // belongs to the last cell.
    let trimmed = output.strip_suffix('\n').unwrap_or(output);
    if trimmed.is_empty() {
        return Err(SourceError::Parse("empty output".to_string()));
    }

    let mut records = trimmed.split(RECORD_SEP);
    let columns: Vec<String> = records
        .next()
        .unwrap_or_default()
        .split(FIELD_SEP)
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in records {
        let cells: Vec<String> = record.split(FIELD_SEP).map(str::to_string).collect();
        if cells.len() != columns.len() {
            return Err(SourceError::Parse(format!(
                "expected {} columns, got {}",
                columns.len(),
                cells.len()
            )));
        }
        rows.push(cells);
    }

    Ok(ResultSet::new(columns, rows))
}

/// Data source backed by the `psql` command line client.
pub struct PsqlSource {
    program: String,
    connection: ConnectionConfig,
}

impl PsqlSource {
    pub fn new(program: String, connection: ConnectionConfig) -> Self {
        Self {
            program,
            connection,
        }
    }

    /// Arguments for a single non-interactive query.
    pub fn query_args(&self, sql: &str) -> Vec<String> {
        // -w: never prompt for a password on the tty the UI owns
        let mut args: Vec<String> = [
            "-X",
            "-w",
            "-q",
            "-A",
            "-P",
            "footer=off",
            "-F",
            FIELD_SEP,
            "-R",
            RECORD_SEP,
            "-v",
            "ON_ERROR_STOP=1",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.extend(self.connection.psql_args());
        args.push("-c".to_string());
        args.push(sql.to_string());
        args
    }

    fn query(&self, sql: &str) -> Result<ResultSet, SourceError> {
        debug!("psql query: {}", sql);
        let output = Command::new(&self.program)
            .args(self.query_args(sql))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| SourceError::Launch(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("psql exited with {}: {}", output.status, stderr);
            return Err(SourceError::Query(if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            }));
        }

        parse_unaligned(&String::from_utf8_lossy(&output.stdout))
    }
}

impl DataSource for PsqlSource {
    fn config_table(&self) -> Result<ResultSet, SourceError> {
        self.query(CONFIG_ALL_QUERY)
    }

    fn setting(&self, name: &str) -> Result<String, SourceError> {
        let sql = format!(
            "SELECT setting FROM pg_settings WHERE name = {}",
            quote_literal(name)
        );
        let result = self.query(&sql)?;
        result
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .ok_or_else(|| SourceError::NotFound(name.to_string()))
    }

    fn settings(&self, names: &[&str]) -> Result<ResultSet, SourceError> {
        let list = names
            .iter()
            .map(|n| quote_literal(n))
            .collect::<Vec<_>>()
            .join(", ");
        self.query(&format!(
            "SELECT name, setting FROM pg_settings WHERE name IN ({list}) ORDER BY name"
        ))
    }
}
