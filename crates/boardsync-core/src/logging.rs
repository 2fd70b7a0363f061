use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{BoardError, BoardResult};

/// How much a diagnostics entry matters when it is read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        };
        f.pad(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
}

impl LogEntry {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            message: message.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:>5} {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.severity,
            self.message
        )
    }
}

/// A sink of diagnostics entries kept alongside `tracing` output, for
/// reading back after the fact.
pub trait Loggable {
    fn push_entry(&mut self, entry: LogEntry);
    fn entries(&self) -> &[LogEntry];

    fn log(&mut self, severity: Severity, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.push_entry(LogEntry::new(severity, message));
    }

    /// Entries at `min` or above, oldest first.
    fn entries_at_least(&self, min: Severity) -> Vec<&LogEntry> {
        self.entries()
            .iter()
            .filter(|entry| entry.severity >= min)
            .collect()
    }
}

/// Install a stderr `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_filter`. Fails if a global subscriber is
/// already installed.
pub fn init_tracing(default_filter: &str) -> BoardResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| BoardError::Config(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| BoardError::Internal(format!("Failed to install subscriber: {}", e)))
}
