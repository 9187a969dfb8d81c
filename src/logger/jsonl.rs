//! JSONL activity log: one self-contained JSON object per stage event.
//!
//! Lines are assembled in memory and written with a single `write_all` so a
//! tailing process never sees a partial line. Logging must never fail a
//! stage: a write failure degrades the log to stderr, and a second failure
//! silently discards.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::errors::WprError;

/// Stage lifecycle events recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    StageStarted,
    StageCompleted,
    StageFailed,
}

/// A single JSONL entry.
#[derive(Debug, Clone, Serialize)]
pub struct StageEvent {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub event: EventKind,
    pub stage: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl StageEvent {
    #[must_use]
    pub fn started(stage: crate::pipeline::orchestrator::Stage) -> Self {
        Self::new(EventKind::StageStarted, stage.as_str())
    }

    #[must_use]
    pub fn completed(
        stage: crate::pipeline::orchestrator::Stage,
        message: &str,
        duration_ms: u64,
    ) -> Self {
        let mut event = Self::new(EventKind::StageCompleted, stage.as_str());
        event.message = Some(message.to_string());
        event.duration_ms = Some(duration_ms);
        event
    }

    #[must_use]
    pub fn failed(
        stage: crate::pipeline::orchestrator::Stage,
        error: &WprError,
        duration_ms: u64,
    ) -> Self {
        let mut event = Self::new(EventKind::StageFailed, stage.as_str());
        event.duration_ms = Some(duration_ms);
        event.error_code = Some(error.code().to_string());
        event.error_message = Some(error.to_string());
        event
    }

    fn new(kind: EventKind, stage: &'static str) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            event: kind,
            stage,
            message: None,
            duration_ms: None,
            error_code: None,
            error_message: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogState {
    File,
    Stderr,
    Discard,
    Disabled,
}

/// Best-effort append-only stage log.
pub struct ActivityLog {
    writer: Option<BufWriter<File>>,
    state: LogState,
}

impl ActivityLog {
    /// Open (or create) the log file for appending. Failure to open degrades
    /// straight to stderr.
    #[must_use]
    pub fn open(path: PathBuf) -> Self {
        match open_append(&path) {
            Ok(file) => Self {
                writer: Some(BufWriter::new(file)),
                state: LogState::File,
            },
            Err(_) => {
                let _ = writeln!(
                    io::stderr(),
                    "[WPR-LOG] cannot open {}, logging to stderr",
                    path.display()
                );
                Self {
                    writer: None,
                    state: LogState::Stderr,
                }
            }
        }
    }

    /// A log that records nothing, for `log.enabled = false`.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            writer: None,
            state: LogState::Disabled,
        }
    }

    /// Record one event. Never fails; degrades instead.
    pub fn record(&mut self, event: StageEvent) {
        if self.state == LogState::Disabled {
            return;
        }
        let line = match serde_json::to_string(&event) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[WPR-LOG] serialize error: {e}");
                return;
            }
        };

        match self.state {
            LogState::File => {
                let failed = self.writer.as_mut().is_none_or(|w| {
                    w.write_all(line.as_bytes()).is_err() || w.flush().is_err()
                });
                if failed {
                    self.writer = None;
                    self.state = LogState::Stderr;
                    let _ = write!(io::stderr(), "[WPR-LOG] {line}");
                }
            }
            LogState::Stderr => {
                if write!(io::stderr(), "[WPR-LOG] {line}").is_err() {
                    self.state = LogState::Discard;
                }
            }
            LogState::Discard | LogState::Disabled => {}
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
