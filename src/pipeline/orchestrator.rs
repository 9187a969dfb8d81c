//! Orchestrator: sequence the four stages, fail fast, report per stage.
//!
//! Strictly sequential and synchronous — each stage blocks until complete,
//! the first failure halts the run and later stages never see partial
//! prior-stage state. Sequencing can also be driven externally (the CLI
//! verbs call one stage each); this type mirrors that contract for library
//! embeddings.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use serde::Serialize;

use crate::core::config::Config;
use crate::core::errors::{Result, WprError};
use crate::logger::jsonl::{ActivityLog, StageEvent};
use crate::pipeline::cleanup::{self, CleanupReport};
use crate::pipeline::fetch::{self, FetchReport};
use crate::pipeline::install::{self, InstallReport};
use crate::pipeline::lock::PipelineLock;
use crate::pipeline::preserve::PreservedSet;
use crate::scanner::{self, ScanReport};

/// Pipeline stage identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Cleanup,
    Fetch,
    Install,
    Scan,
}

impl Stage {
    /// CLI/action-selector name of the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cleanup => "cleanup",
            Self::Fetch => "fetch",
            Self::Install => "install",
            Self::Scan => "scan",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed payload of a completed stage.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StageOutput {
    Cleanup(CleanupReport),
    Fetch(FetchReport),
    Install(InstallReport),
    Scan(ScanReport),
}

/// One completed stage: which, what happened, how long it took.
#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub stage: Stage,
    pub message: String,
    pub elapsed_ms: u64,
    pub output: StageOutput,
}

/// The stage that halted a full run, with its error.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: WprError,
}

/// Outcome of a full pipeline run.
///
/// `completed` holds results in execution order; `failure` is the stage that
/// halted the run, if any. A failed stage's payload is never materialized.
#[derive(Debug)]
pub struct PipelineReport {
    pub completed: Vec<StageResult>,
    pub failure: Option<StageFailure>,
}

impl PipelineReport {
    /// True when all four stages completed.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.failure.is_none()
    }
}

/// The four-stage recovery pipeline bound to one installation root.
///
/// All policy comes from the injected [`Config`]; nothing is process-global.
pub struct Pipeline {
    root: PathBuf,
    config: Config,
    preserved: PreservedSet,
    log: ActivityLog,
    cancel: Option<Arc<AtomicBool>>,
}

impl Pipeline {
    /// Build a pipeline for `root` with the given policy.
    #[must_use]
    pub fn new(root: &Path, config: Config) -> Self {
        let preserved = PreservedSet::new(config.preserve.names.iter().cloned());
        let log = if config.log.enabled {
            ActivityLog::open(root.join(&config.log.file_name))
        } else {
            ActivityLog::disabled()
        };
        Self {
            root: root.to_path_buf(),
            config,
            preserved,
            log,
            cancel: None,
        }
    }

    /// Install a cooperative cancellation flag for the fetch stage.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Installation root this pipeline operates on.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Effective preserved-name policy.
    #[must_use]
    pub fn preserved(&self) -> &PreservedSet {
        &self.preserved
    }

    /// Run all four stages in order, fail-fast, under the advisory lock.
    pub fn run_all(&mut self) -> Result<PipelineReport> {
        let _lock = PipelineLock::acquire(&self.root)?;

        let mut completed = Vec::with_capacity(4);
        for stage in [Stage::Cleanup, Stage::Fetch, Stage::Install, Stage::Scan] {
            match self.run_stage(stage) {
                Ok(result) => completed.push(result),
                Err(error) => {
                    return Ok(PipelineReport {
                        completed,
                        failure: Some(StageFailure { stage, error }),
                    });
                }
            }
        }
        Ok(PipelineReport {
            completed,
            failure: None,
        })
    }

    /// Run a single stage. Callers are responsible for holding the lock when
    /// the stage mutates the tree (the CLI verbs do; `run_all` does).
    pub fn run_stage(&mut self, stage: Stage) -> Result<StageResult> {
        self.log.record(StageEvent::started(stage));
        let start = Instant::now();

        let outcome = match stage {
            Stage::Cleanup => self.cleanup(),
            Stage::Fetch => self.fetch(),
            Stage::Install => self.install(),
            Stage::Scan => self.scan(),
        };
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok((message, output)) => {
                self.log
                    .record(StageEvent::completed(stage, &message, elapsed_ms));
                Ok(StageResult {
                    stage,
                    message,
                    elapsed_ms,
                    output,
                })
            }
            Err(error) => {
                self.log.record(StageEvent::failed(stage, &error, elapsed_ms));
                Err(error)
            }
        }
    }

    // ──────────────────── stage bodies ────────────────────

    fn cleanup(&self) -> Result<(String, StageOutput)> {
        let report = cleanup::run(
            &self.root,
            &self.config.cleanup.core_dirs,
            &self.config.cleanup.script_extension,
            &self.preserved,
        )?;
        let message = format!("Core files cleaned ({} entries removed).", report.deleted.len());
        Ok((message, StageOutput::Cleanup(report)))
    }

    fn fetch(&self) -> Result<(String, StageOutput)> {
        let report = fetch::run(&self.root, &self.config.fetch, self.cancel.as_deref())?;
        let message = format!(
            "Release archive downloaded ({} bytes to {}).",
            report.bytes,
            report.archive_path.display()
        );
        Ok((message, StageOutput::Fetch(report)))
    }

    fn install(&self) -> Result<(String, StageOutput)> {
        let archive_path = self.root.join(&self.config.fetch.archive_name);
        let report = install::run(
            &self.root,
            &archive_path,
            &self.config.install,
            &self.preserved,
        )?;
        let message = format!(
            "Fresh core installed ({} entries moved, {} preserved).",
            report.moved,
            report.skipped_preserved.len()
        );
        Ok((message, StageOutput::Install(report)))
    }

    fn scan(&self) -> Result<(String, StageOutput)> {
        let content_dir = self.root.join(&self.config.scan.content_dir);
        let report = scanner::scan(&content_dir)?;
        let message = format!(
            "Scan completed: {} finding(s) across {} entries.",
            report.findings.len(),
            report.entries_scanned
        );
        Ok((message, StageOutput::Scan(report)))
    }
}
