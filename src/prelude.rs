//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use wp_rescue::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, WprError};

// Pipeline
pub use crate::pipeline::cleanup::CleanupReport;
pub use crate::pipeline::fetch::FetchReport;
pub use crate::pipeline::install::InstallReport;
pub use crate::pipeline::lock::PipelineLock;
pub use crate::pipeline::orchestrator::{
    Pipeline, PipelineReport, Stage, StageOutput, StageResult,
};
pub use crate::pipeline::preserve::PreservedSet;

// Scanner
pub use crate::scanner::{Finding, FindingKind, ScanReport, scan};
