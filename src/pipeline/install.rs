//! Install stage: unpack the release archive and merge it into the root.
//!
//! Extraction lands in an isolated staging directory under the root (same
//! filesystem, so every move below is a rename, not a copy). The merge walks
//! the distribution tree recursively: wholly-new directories move in a
//! single rename, directories that already exist at the destination are
//! merged entry-by-entry, and files overwrite — unless their name is in the
//! preserved set. Staging directory and archive file are removed no matter
//! how the stage ends: checked deletes on the success path, a drop guard as
//! backstop on every error path.

#![allow(missing_docs)]

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use serde::Serialize;

use crate::core::config::InstallConfig;
use crate::core::errors::{Result, WprError};
use crate::pipeline::preserve::PreservedSet;

/// Merge outcome counters.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    /// Entries moved into place (whole-subtree renames count as one).
    pub moved: usize,
    /// Preserved names encountered in the archive and left untouched.
    pub skipped_preserved: Vec<String>,
}

/// Removes staging debris when the stage unwinds early.
struct StagingGuard {
    staging: PathBuf,
    archive: PathBuf,
    armed: bool,
}

impl StagingGuard {
    fn new(staging: PathBuf, archive: PathBuf) -> Self {
        Self {
            staging,
            archive,
            armed: true,
        }
    }

    /// The success path deleted everything with checked calls already.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_dir_all(&self.staging);
            let _ = fs::remove_file(&self.archive);
        }
    }
}

/// Extract `archive_path` and merge the distribution folder into `root`.
pub fn run(
    root: &Path,
    archive_path: &Path,
    cfg: &InstallConfig,
    preserved: &PreservedSet,
) -> Result<InstallReport> {
    let staging = root.join(&cfg.staging_dir);
    let mut guard = StagingGuard::new(staging.clone(), archive_path.to_path_buf());

    extract(archive_path, &staging)?;

    let source = staging.join(&cfg.distribution_dir);
    if !source.is_dir() {
        return Err(WprError::MissingDistribution {
            expected: cfg.distribution_dir.clone(),
        });
    }

    let mut report = InstallReport {
        moved: 0,
        skipped_preserved: Vec::new(),
    };
    merge_dir(&source, root, preserved, &mut report)?;

    // Checked cleanup; the guard only backstops the paths above.
    fs::remove_dir_all(&staging).map_err(|e| WprError::io(&staging, e))?;
    fs::remove_file(archive_path).map_err(|e| WprError::io(archive_path, e))?;
    guard.disarm();

    Ok(report)
}

/// Unpack the gzip tarball into the staging directory.
///
/// Corrupt or unreadable archives abort here, before any merge step runs.
fn extract(archive_path: &Path, staging: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(|e| WprError::Archive {
        path: archive_path.to_path_buf(),
        details: e.to_string(),
    })?;
    fs::create_dir_all(staging).map_err(|e| WprError::io(staging, e))?;

    let mut tarball = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    tarball.unpack(staging).map_err(|e| WprError::Archive {
        path: archive_path.to_path_buf(),
        details: e.to_string(),
    })
}

/// Recursive merge of `source` into `dest`, never clobbering preserved names.
fn merge_dir(
    source: &Path,
    dest: &Path,
    preserved: &PreservedSet,
    report: &mut InstallReport,
) -> Result<()> {
    if !dest.is_dir() {
        fs::create_dir_all(dest).map_err(|e| WprError::io(dest, e))?;
    }

    let entries = fs::read_dir(source).map_err(|e| WprError::io(source, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| WprError::io(source, e))?;
        let name = entry.file_name();
        let src = entry.path();
        let dst = dest.join(&name);
        let file_type = entry.file_type().map_err(|e| WprError::io(&src, e))?;

        if file_type.is_dir() {
            if dst.is_dir() {
                merge_dir(&src, &dst, preserved, report)?;
            } else {
                // A plain file squatting where the distribution wants a
                // directory is replaced — it cannot be legitimate core.
                if dst.exists() {
                    if preserved.contains_os(&name) {
                        report
                            .skipped_preserved
                            .push(name.to_string_lossy().into_owned());
                        continue;
                    }
                    fs::remove_file(&dst).map_err(|e| WprError::io(&dst, e))?;
                }
                fs::rename(&src, &dst).map_err(|e| WprError::io(&src, e))?;
                report.moved += 1;
            }
        } else {
            if preserved.contains_os(&name) {
                report
                    .skipped_preserved
                    .push(name.to_string_lossy().into_owned());
                continue;
            }
            // Same filesystem by construction; rename replaces any existing file.
            fs::rename(&src, &dst).map_err(|e| WprError::io(&src, e))?;
            report.moved += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    /// Build `<root>/latest.tar.gz` from a prepared distribution tree.
    fn pack_archive(root: &Path, dist_root: &Path) -> PathBuf {
        let archive_path = root.join("latest.tar.gz");
        let file = File::create(&archive_path).unwrap();
        let encoder = GzEncoder::new(file, Compression::fast());
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all("wordpress", dist_root).unwrap();
        builder.into_inner().unwrap().finish().unwrap();
        archive_path
    }

    /// A minimal distribution: core dirs, an index, and a wp-content skeleton.
    fn make_distribution(scratch: &Path) -> PathBuf {
        let dist = scratch.join("dist-src");
        fs::create_dir_all(dist.join("wp-admin")).unwrap();
        fs::write(dist.join("wp-admin/index.php"), "<?php // fresh admin").unwrap();
        fs::create_dir_all(dist.join("wp-includes")).unwrap();
        fs::write(dist.join("wp-includes/version.php"), "<?php // fresh").unwrap();
        fs::write(dist.join("index.php"), "<?php // fresh index").unwrap();
        fs::write(dist.join("wp-config.php"), "<?php // SAMPLE CONFIG").unwrap();
        fs::create_dir_all(dist.join("wp-content/themes")).unwrap();
        fs::write(dist.join("wp-content/themes/index.php"), "<?php // theme").unwrap();
        dist
    }

    fn run_default(root: &Path, archive: &Path) -> Result<InstallReport> {
        run(
            root,
            archive,
            &InstallConfig::default(),
            &PreservedSet::default_policy(),
        )
    }

    #[test]
    fn new_subtrees_move_wholesale() {
        let scratch = tempfile::tempdir().unwrap();
        let site = tempfile::tempdir().unwrap();
        let dist = make_distribution(scratch.path());
        let archive = pack_archive(site.path(), &dist);

        run_default(site.path(), &archive).unwrap();

        assert!(site.path().join("wp-admin/index.php").exists());
        assert!(site.path().join("wp-includes/version.php").exists());
        assert!(site.path().join("index.php").exists());
    }

    #[test]
    fn preserved_config_is_never_overwritten() {
        let scratch = tempfile::tempdir().unwrap();
        let site = tempfile::tempdir().unwrap();
        fs::write(site.path().join("wp-config.php"), "<?php // REAL SECRETS").unwrap();
        let dist = make_distribution(scratch.path());
        let archive = pack_archive(site.path(), &dist);

        let report = run_default(site.path(), &archive).unwrap();

        let config = fs::read_to_string(site.path().join("wp-config.php")).unwrap();
        assert!(config.contains("REAL SECRETS"));
        assert!(
            report
                .skipped_preserved
                .contains(&"wp-config.php".to_string())
        );
    }

    #[test]
    fn preserved_name_absent_at_destination_is_still_skipped() {
        // The archive ships a wp-config.php sample; even with no local copy
        // it must not be installed, because skip is by name, not by collision.
        let scratch = tempfile::tempdir().unwrap();
        let site = tempfile::tempdir().unwrap();
        let dist = make_distribution(scratch.path());
        let archive = pack_archive(site.path(), &dist);

        run_default(site.path(), &archive).unwrap();
        assert!(!site.path().join("wp-config.php").exists());
    }

    #[test]
    fn existing_directories_are_merged_not_replaced() {
        let scratch = tempfile::tempdir().unwrap();
        let site = tempfile::tempdir().unwrap();
        fs::create_dir_all(site.path().join("wp-content/uploads")).unwrap();
        fs::write(site.path().join("wp-content/uploads/photo.jpg"), "jpg").unwrap();
        let dist = make_distribution(scratch.path());
        let archive = pack_archive(site.path(), &dist);

        run_default(site.path(), &archive).unwrap();

        // User data survives; fresh theme files arrive next to it.
        assert!(site.path().join("wp-content/uploads/photo.jpg").exists());
        assert!(site.path().join("wp-content/themes/index.php").exists());
    }

    #[test]
    fn plain_files_are_overwritten() {
        let scratch = tempfile::tempdir().unwrap();
        let site = tempfile::tempdir().unwrap();
        fs::write(site.path().join("index.php"), "<?php // BACKDOORED").unwrap();
        let dist = make_distribution(scratch.path());
        let archive = pack_archive(site.path(), &dist);

        run_default(site.path(), &archive).unwrap();

        let index = fs::read_to_string(site.path().join("index.php")).unwrap();
        assert!(index.contains("fresh index"));
    }

    #[test]
    fn staging_and_archive_are_gone_after_success() {
        let scratch = tempfile::tempdir().unwrap();
        let site = tempfile::tempdir().unwrap();
        let dist = make_distribution(scratch.path());
        let archive = pack_archive(site.path(), &dist);

        run_default(site.path(), &archive).unwrap();

        assert!(!site.path().join(".wp-rescue-staging").exists());
        assert!(!archive.exists());
    }

    #[test]
    fn corrupt_archive_aborts_before_merge_and_cleans_up() {
        let site = tempfile::tempdir().unwrap();
        let archive = site.path().join("latest.tar.gz");
        fs::write(&archive, b"this is not a gzip stream").unwrap();
        fs::write(site.path().join("index.php"), "<?php // untouched").unwrap();

        let err = run_default(site.path(), &archive).unwrap_err();
        assert_eq!(err.code(), "WPR-4001");

        // No merge step ran, no staging debris left.
        let index = fs::read_to_string(site.path().join("index.php")).unwrap();
        assert!(index.contains("untouched"));
        assert!(!site.path().join(".wp-rescue-staging").exists());
        assert!(!archive.exists());
    }

    #[test]
    fn missing_archive_is_an_archive_error() {
        let site = tempfile::tempdir().unwrap();
        let err = run_default(site.path(), &site.path().join("latest.tar.gz")).unwrap_err();
        assert_eq!(err.code(), "WPR-4001");
    }

    #[test]
    fn missing_distribution_folder_is_rejected() {
        let scratch = tempfile::tempdir().unwrap();
        let site = tempfile::tempdir().unwrap();
        // Archive whose top-level folder is not the expected one.
        let dist = make_distribution(scratch.path());
        let archive_path = site.path().join("latest.tar.gz");
        let file = File::create(&archive_path).unwrap();
        let encoder = GzEncoder::new(file, Compression::fast());
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all("not-wordpress", &dist).unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let err = run_default(site.path(), &archive_path).unwrap_err();
        assert_eq!(err.code(), "WPR-4002");
        assert!(!site.path().join(".wp-rescue-staging").exists());
        assert!(!archive_path.exists());
    }

    #[test]
    fn gzip_of_garbage_tar_is_an_archive_error() {
        let site = tempfile::tempdir().unwrap();
        let archive = site.path().join("latest.tar.gz");
        let file = File::create(&archive).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::fast());
        // A full header block that cannot pass the tar checksum.
        encoder.write_all(&[0xff_u8; 512]).unwrap();
        encoder.finish().unwrap();

        let err = run_default(site.path(), &archive).unwrap_err();
        assert_eq!(err.code(), "WPR-4001");
        assert!(!site.path().join(".wp-rescue-staging").exists());
        assert!(!archive.exists());
    }
}
