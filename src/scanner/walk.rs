//! Lazy depth-first walk over a content tree.
//!
//! Single-threaded, single-pass, directory-first: a directory is yielded
//! before its children, matching the order findings are reported in. The
//! walk is best-effort — an unreadable entry or undescendable directory is
//! skipped and traversal continues, because a scan is advisory, not a gate.

#![allow(missing_docs)]

use std::fs::{self, Metadata, ReadDir};
use std::path::{Path, PathBuf};

/// A filesystem entry with the attributes the detection rules consume.
///
/// Transient: computed fresh per traversal, never cached across stages.
#[derive(Debug, Clone)]
pub struct FilesystemEntry {
    pub path: PathBuf,
    pub is_dir: bool,
    /// Full permission bits (`mode & 0o7777`); 0 on platforms without them.
    pub mode: u32,
}

impl FilesystemEntry {
    /// Final path component, lossily decoded.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Extension, ASCII-lowercased.
    #[must_use]
    pub fn extension_lowercase(&self) -> Option<String> {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }

    /// Size in bytes, looked up on demand.
    #[must_use]
    pub fn size(&self) -> Option<u64> {
        fs::symlink_metadata(&self.path).ok().map(|m| m.len())
    }
}

fn permission_bits(metadata: &Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o7777
    }
    #[cfg(not(unix))]
    {
        let _ = metadata;
        0
    }
}

/// Depth-first iterator over every entry under a root directory.
///
/// The root itself is not yielded. Symlinks are yielded as entries but never
/// followed into.
pub struct Walk {
    stack: Vec<ReadDir>,
}

impl Walk {
    /// Start a walk at `root`. A missing or unreadable root yields nothing.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            stack: fs::read_dir(root).into_iter().collect(),
        }
    }
}

impl Iterator for Walk {
    type Item = FilesystemEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                None => {
                    self.stack.pop();
                }
                // Unreadable entry: skip, keep walking.
                Some(Err(_)) => {}
                Some(Ok(entry)) => {
                    let Ok(file_type) = entry.file_type() else {
                        continue;
                    };
                    // DirEntry::metadata does not traverse symlinks.
                    let Ok(metadata) = entry.metadata() else {
                        continue;
                    };
                    let path = entry.path();
                    let is_dir = file_type.is_dir();
                    if is_dir && let Ok(children) = fs::read_dir(&path) {
                        self.stack.push(children);
                    }
                    return Some(FilesystemEntry {
                        path,
                        is_dir,
                        mode: permission_bits(&metadata),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_root_yields_nothing() {
        let walked: Vec<_> = Walk::new(Path::new("/nonexistent-wp-rescue-root")).collect();
        assert!(walked.is_empty());
    }

    #[test]
    fn empty_root_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let walked: Vec<_> = Walk::new(dir.path()).collect();
        assert!(walked.is_empty());
    }

    #[test]
    fn directories_come_before_their_children() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("uploads/2023")).unwrap();
        fs::write(dir.path().join("uploads/2023/a.txt"), "x").unwrap();

        let order: Vec<String> = Walk::new(dir.path())
            .map(|e| e.file_name())
            .collect();
        assert_eq!(order, vec!["uploads", "2023", "a.txt"]);
    }

    #[test]
    fn every_entry_is_visited_once() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("themes/dark")).unwrap();
        fs::write(dir.path().join("themes/style.css"), "x").unwrap();
        fs::write(dir.path().join("themes/dark/style.css"), "x").unwrap();
        fs::write(dir.path().join("index.php"), "x").unwrap();

        let mut names: Vec<String> = Walk::new(dir.path()).map(|e| e.file_name()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["dark", "index.php", "style.css", "style.css", "themes"]);
    }

    #[test]
    fn extension_is_lowercased() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("SHELL.PHP"), "x").unwrap();

        let entry = Walk::new(dir.path()).next().unwrap();
        assert_eq!(entry.extension_lowercase().as_deref(), Some("php"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_yielded_but_not_followed() {
        use std::os::unix::fs::symlink;

        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret.php"), "x").unwrap();

        let dir = tempfile::tempdir().unwrap();
        symlink(outside.path(), dir.path().join("link")).unwrap();

        let walked: Vec<String> = Walk::new(dir.path()).map(|e| e.file_name()).collect();
        assert_eq!(walked, vec!["link"]);
    }

    #[cfg(unix)]
    #[test]
    fn mode_reflects_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("open.txt");
        fs::write(&path, "x").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o777)).unwrap();

        let entry = Walk::new(dir.path()).next().unwrap();
        assert_eq!(entry.mode, 0o777);
    }
}
