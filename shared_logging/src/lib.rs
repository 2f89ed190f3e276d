#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Leveled, timestamped line logging shared across the irisflow pipeline stages.

use std::{
    fmt,
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Log severity level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Debug information.
    Debug,
    /// Informational events.
    Info,
    /// Warning indicator.
    Warn,
    /// Error indicator.
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARNING",
            Self::Error => "ERROR",
        };
        f.write_str(text)
    }
}

/// A single log line before rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Timestamp in UTC.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        }
    }

    /// Renders the record as a `<timestamp> - <LEVEL> - <message>` line.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "{} - {} - {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level,
            self.message
        )
    }
}

struct LoggerInner {
    path: PathBuf,
    writer: Mutex<File>,
    echo: bool,
}

/// Thread-safe line logger with append-only file semantics.
///
/// The handle is cheap to clone; all clones share one writer.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
    min_level: LogLevel,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("path", &self.inner.path)
            .field("echo", &self.inner.echo)
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Creates or opens a logger appending to the given file path.
    ///
    /// Parent directories are created as needed. When `echo` is set every
    /// line is also written to stderr.
    pub fn new(path: impl AsRef<Path>, echo: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            inner: Arc::new(LoggerInner {
                path,
                writer: Mutex::new(file),
                echo,
            }),
            min_level: LogLevel::Info,
        })
    }

    /// Returns a copy of this handle with a different minimum level.
    ///
    /// The returned handle still shares the same writer.
    #[must_use]
    pub fn with_min_level(&self, min_level: LogLevel) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            min_level,
        }
    }

    /// Writes one rendered line for the record.
    pub fn log(&self, record: &LogRecord) -> Result<()> {
        if record.level < self.min_level {
            return Ok(());
        }
        let line = record.render();
        let mut writer = self.inner.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        if self.inner.echo {
            eprintln!("{line}");
        }
        Ok(())
    }

    /// Logs an INFO message.
    pub fn info(&self, message: impl Into<String>) -> Result<()> {
        self.log(&LogRecord::new(LogLevel::Info, message))
    }

    /// Logs a WARNING message.
    pub fn warn(&self, message: impl Into<String>) -> Result<()> {
        self.log(&LogRecord::new(LogLevel::Warn, message))
    }

    /// Logs an ERROR message.
    pub fn error(&self, message: impl Into<String>) -> Result<()> {
        self.log(&LogRecord::new(LogLevel::Error, message))
    }

    /// Returns the underlying file path (useful for tests).
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

static GLOBAL: OnceLock<Logger> = OnceLock::new();

/// Installs the process-wide logger. Only the first call takes effect.
pub fn init_global(path: impl AsRef<Path>, echo: bool) -> Result<Logger> {
    if let Some(existing) = GLOBAL.get() {
        return Ok(existing.clone());
    }
    let logger = Logger::new(path, echo)?;
    let _ = GLOBAL.set(logger.clone());
    Ok(GLOBAL.get().cloned().unwrap_or(logger))
}

/// Returns the process-wide logger, if one was installed.
#[must_use]
pub fn global() -> Option<Logger> {
    GLOBAL.get().cloned()
}
