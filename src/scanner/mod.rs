//! Content scanner: walk the content tree, apply each detection rule.
//!
//! Read-only by contract — nothing here mutates the filesystem. Rule order
//! per entry is fixed (hidden-dir, script-in-uploads, world-writable,
//! content-signature) so reports are deterministic given a traversal order.

pub mod report;
pub mod rules;
pub mod walk;

use std::path::Path;

pub use report::{Finding, FindingKind, ScanReport};

use crate::core::errors::Result;
use crate::scanner::walk::Walk;

/// Scan `content_dir` and collect findings in traversal order.
///
/// A missing content directory scans as empty: the scan is advisory and the
/// tree may legitimately not exist yet. Unreadable entries are skipped by
/// the walker; a script whose prefix cannot be read simply yields no
/// signature finding.
pub fn scan(content_dir: &Path) -> Result<ScanReport> {
    let mut findings = Vec::new();
    let mut entries_scanned = 0_usize;

    for entry in Walk::new(content_dir) {
        entries_scanned += 1;
        let relative = entry
            .path
            .strip_prefix(content_dir)
            .unwrap_or(&entry.path)
            .to_path_buf();

        if entry.is_dir {
            if rules::is_hidden_dir(&entry) {
                findings.push(Finding {
                    kind: FindingKind::Folder,
                    path: entry.path.clone(),
                    reason: rules::REASON_HIDDEN_DIR,
                });
            }
            if rules::is_world_writable(entry.mode) {
                findings.push(Finding {
                    kind: FindingKind::Permission,
                    path: entry.path.clone(),
                    reason: rules::REASON_WORLD_WRITABLE,
                });
            }
            continue;
        }

        if rules::is_script_in_uploads(&entry, &relative) {
            findings.push(Finding {
                kind: FindingKind::File,
                path: entry.path.clone(),
                reason: rules::REASON_SCRIPT_IN_UPLOADS,
            });
        }
        if rules::is_world_writable(entry.mode) {
            findings.push(Finding {
                kind: FindingKind::Permission,
                path: entry.path.clone(),
                reason: rules::REASON_WORLD_WRITABLE,
            });
        }
        if rules::wants_signature_check(&entry)
            && let Ok(prefix) = rules::read_prefix(&entry.path)
            && rules::match_signature(&prefix).is_some()
        {
            findings.push(Finding {
                kind: FindingKind::Code,
                path: entry.path.clone(),
                reason: rules::REASON_SUSPICIOUS_CODE,
            });
        }
    }

    Ok(ScanReport {
        findings,
        entries_scanned,
    })
}
