//! Leveled text log of a job
//!
//! One line per entry, `LEVEL   - message\n`, with the level name padded to
//! seven characters. The file is UTF-8 and only ever appended to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use crate::domain::{IngestError, Result};

/// Width the level name is padded to
const LEVEL_WIDTH: usize = 7;

/// Separator between level and message
const SEPARATOR: &str = " - ";

/// Severity of a ledger line, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Progress,
    Info,
    Warning,
    Error,
    Success,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Debug,
        LogLevel::Progress,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Success,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Progress => "PROGRESS",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Success => "SUCCESS",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_uppercase();
        LogLevel::ALL
            .iter()
            .copied()
            .find(|level| level.as_str() == wanted)
            .ok_or_else(|| IngestError::Validation(format!("Unknown log level '{s}'")))
    }
}

/// One parsed ledger line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
}

impl LogLine {
    /// Parses a line written by [`format_line`]; unknown shapes yield `None`
    pub fn parse(line: &str) -> Option<Self> {
        let (level, message) = line.split_once(SEPARATOR)?;
        let level = level.trim().parse().ok()?;
        Some(Self {
            level,
            message: message.trim_end_matches(['\r', '\n']).to_string(),
        })
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<width$}{SEPARATOR}{}",
            self.level.as_str(),
            self.message,
            width = LEVEL_WIDTH
        )
    }
}

/// Renders a log line, newline included
///
/// Line breaks inside the message are flattened so every entry stays on a
/// single line.
pub fn format_line(level: LogLevel, message: &str) -> String {
    let message = message.replace(['\r', '\n'], " ");
    format!("{}\n", LogLine { level, message })
}

/// Percentage of rows processed, two decimals, capped at `100.00%`
///
/// An unknown (zero) total renders as complete.
pub fn progress_message(rowcount: u64, total: u64) -> String {
    let pct = if total == 0 {
        100.0
    } else {
        (rowcount as f64 / total as f64 * 100.0).min(100.0)
    };
    format!("{pct:.2}%")
}

/// Reads the lines of a log file filtered by level
///
/// With `only_level` the result holds lines of exactly `level`; otherwise it
/// holds every line at or above it. A missing file reads as empty.
pub fn read_logs(path: &Path, level: LogLevel, only_level: bool) -> Result<Vec<LogLine>> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut lines = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let Some(parsed) = LogLine::parse(&line) else {
            continue;
        };
        let keep = if only_level {
            parsed.level == level
        } else {
            parsed.level >= level
        };
        if keep {
            lines.push(parsed);
        }
    }
    Ok(lines)
}
