//! Scan findings: the advisory output of the content scan.

#![allow(missing_docs)]

use std::path::PathBuf;

use serde::Serialize;

/// What kind of anomaly a finding describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingKind {
    Folder,
    File,
    Permission,
    Code,
}

impl FindingKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::File => "file",
            Self::Permission => "permission",
            Self::Code => "code",
        }
    }
}

/// A single detection result. Immutable once produced.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub kind: FindingKind,
    pub path: PathBuf,
    pub reason: &'static str,
}

/// The scan stage's payload: findings in traversal order, plus how much
/// ground the walk covered.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub findings: Vec<Finding>,
    pub entries_scanned: usize,
}

impl ScanReport {
    /// True when nothing suspicious was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}
