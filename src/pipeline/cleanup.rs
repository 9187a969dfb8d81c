//! Cleanup stage: erase the replaceable core, leave everything preserved.
//!
//! Deletion is recursive bottom-up — a directory's children go first, so no
//! attempt is ever made to remove a non-empty directory. Every delete is
//! checked; the first failure aborts the stage with a report of which paths
//! were and were not removed, so a half-erased installation is never silent.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::errors::{Result, WprError};
use crate::pipeline::preserve::PreservedSet;

/// What the cleanup stage removed, in execution order.
///
/// Directory names carry a trailing `/`, root-level files are bare names.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub deleted: Vec<String>,
}

/// One planned deletion at the installation root.
#[derive(Debug, Clone)]
enum WorkItem {
    CoreDir(String),
    RootScript(String),
}

impl WorkItem {
    fn label(&self) -> String {
        match self {
            Self::CoreDir(name) => format!("{name}/"),
            Self::RootScript(name) => name.clone(),
        }
    }

    fn path(&self, root: &Path) -> PathBuf {
        match self {
            Self::CoreDir(name) | Self::RootScript(name) => root.join(name),
        }
    }
}

/// Delete the configured core directories and root-level script files.
///
/// The work list is computed up front so a mid-run failure can report the
/// exact split between removed and still-present paths.
pub fn run(
    root: &Path,
    core_dirs: &[String],
    script_extension: &str,
    preserved: &PreservedSet,
) -> Result<CleanupReport> {
    let plan = plan(root, core_dirs, script_extension, preserved)?;

    let mut deleted: Vec<String> = Vec::with_capacity(plan.len());
    for (index, item) in plan.iter().enumerate() {
        let path = item.path(root);
        let result = match item {
            WorkItem::CoreDir(_) => remove_tree(&path),
            WorkItem::RootScript(_) => fs::remove_file(&path).map_err(|e| (path.clone(), e)),
        };

        if let Err((failed_path, source)) = result {
            let remaining = plan[index..].iter().map(WorkItem::label).collect();
            return Err(WprError::CleanupInterrupted {
                removed: deleted,
                remaining,
                path: failed_path,
                source,
            });
        }
        deleted.push(item.label());
    }

    Ok(CleanupReport { deleted })
}

/// Enumerate what cleanup would delete, preserved names excluded.
fn plan(
    root: &Path,
    core_dirs: &[String],
    script_extension: &str,
    preserved: &PreservedSet,
) -> Result<Vec<WorkItem>> {
    let mut items = Vec::new();

    for dir in core_dirs {
        if preserved.contains(dir) {
            continue;
        }
        if root.join(dir).is_dir() {
            items.push(WorkItem::CoreDir(dir.clone()));
        }
    }

    // Root-level sweep looks only at direct entries, never descends.
    let entries = fs::read_dir(root).map_err(|e| WprError::io(root, e))?;
    let mut scripts = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| WprError::io(root, e))?;
        let file_type = entry.file_type().map_err(|e| WprError::io(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let is_script = Path::new(name)
            .extension()
            .is_some_and(|ext| ext == script_extension);
        if is_script && !preserved.contains(name) {
            scripts.push(name.to_string());
        }
    }
    // read_dir order is platform-dependent; fix it for reproducible reports.
    scripts.sort_unstable();
    items.extend(scripts.into_iter().map(WorkItem::RootScript));

    Ok(items)
}

/// Recursive bottom-up removal: children first, then the directory itself.
///
/// Symlinks are removed as entries, never followed.
fn remove_tree(dir: &Path) -> std::result::Result<(), (PathBuf, std::io::Error)> {
    let entries = fs::read_dir(dir).map_err(|e| (dir.to_path_buf(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| (dir.to_path_buf(), e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| (path.clone(), e))?;
        if file_type.is_dir() {
            remove_tree(&path)?;
        } else {
            fs::remove_file(&path).map_err(|e| (path.clone(), e))?;
        }
    }
    fs::remove_dir(dir).map_err(|e| (dir.to_path_buf(), e))
}
