//! Per-compute diagnostics: an append-only log plus counters.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "INFO"),
            Level::Warning => write!(f, "WARN"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticEntry {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    /// Unit the entry is about; `None` for instrument-level entries.
    pub unit: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub units_checked: usize,
    pub units_succeeded: usize,
    pub units_skipped: usize,
    pub units_failed: usize,
    pub occurrences_detected: usize,
    pub occurrences_filtered: usize,
    pub signals_synthesized: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    entries: Vec<DiagnosticEntry>,
    counters: Counters,
    elapsed: Duration,
    series_length: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, level: Level, unit: Option<&str>, message: String) {
        self.entries.push(DiagnosticEntry {
            timestamp: Utc::now(),
            level,
            unit: unit.map(str::to_string),
            message,
        });
    }

    pub fn info(&mut self, unit: Option<&str>, message: impl Into<String>) {
        self.push(Level::Info, unit, message.into());
    }

    pub fn warn(&mut self, unit: Option<&str>, message: impl Into<String>) {
        self.push(Level::Warning, unit, message.into());
    }

    pub fn error(&mut self, unit: Option<&str>, message: impl Into<String>) {
        self.push(Level::Error, unit, message.into());
    }

    pub fn entries(&self) -> &[DiagnosticEntry] {
        &self.entries
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticEntry> {
        self.entries.iter().filter(|e| e.level == Level::Error)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.level == Level::Warning)
            .count()
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub(crate) fn counters_mut(&mut self) -> &mut Counters {
        &mut self.counters
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub(crate) fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    pub fn series_length(&self) -> usize {
        self.series_length
    }

    pub(crate) fn set_series_length(&mut self, len: usize) {
        self.series_length = len;
    }
}

impl fmt::Display for DiagnosticEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "[{}] {}: {}", self.level, unit, self.message),
            None => write!(f, "[{}] {}", self.level, self.message),
        }
    }
}
