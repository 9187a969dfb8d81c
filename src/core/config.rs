//! Configuration system: TOML file + env override for the path + smart defaults.
//!
//! Every policy constant of the pipeline (preserved names, core directory
//! list, release URL, suspicious-token policy owner) lives here as an explicit
//! value passed into the stages, never as process-wide state. Alternate
//! policies can therefore be exercised in isolation by tests.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, WprError};

/// Env var that overrides the config file path when no `--config` is given.
pub const CONFIG_PATH_ENV: &str = "WPRESCUE_CONFIG";

/// Config file name looked up in the working directory by default.
pub const CONFIG_FILE_NAME: &str = "wp-rescue.toml";

/// Full wp-rescue configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub preserve: PreserveConfig,
    pub cleanup: CleanupConfig,
    pub fetch: FetchConfig,
    pub install: InstallConfig,
    pub scan: ScanConfig,
    pub log: LogConfig,
}

/// Names exempt from deletion and from merge overwrite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PreserveConfig {
    pub names: Vec<String>,
}

/// Which parts of the installation the cleanup stage erases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CleanupConfig {
    /// Core directories removed recursively from the root.
    pub core_dirs: Vec<String>,
    /// Extension of root-level script files swept by cleanup.
    pub script_extension: String,
}

/// Release package download policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FetchConfig {
    pub url: String,
    /// Whole-transfer timeout. Minutes, not seconds: the archive is tens of
    /// megabytes.
    pub timeout_secs: u64,
    /// Staging file name for the downloaded archive, relative to the root.
    pub archive_name: String,
    /// Optional expected SHA-256 of the archive (64 hex chars).
    pub expected_sha256: Option<String>,
}

/// Extraction and merge policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InstallConfig {
    /// Top-level folder inside the release archive holding the distribution.
    pub distribution_dir: String,
    /// Staging directory name, relative to the root.
    pub staging_dir: String,
}

/// Content scan policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScanConfig {
    /// Content directory name, relative to the root. Never deleted, only scanned.
    pub content_dir: String,
}

/// Activity log settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    pub enabled: bool,
    /// JSONL activity log file name, relative to the root.
    pub file_name: String,
}

impl Default for PreserveConfig {
    fn default() -> Self {
        Self {
            names: crate::pipeline::preserve::DEFAULT_PRESERVED
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            core_dirs: vec!["wp-admin".to_string(), "wp-includes".to_string()],
            script_extension: "php".to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            url: "https://wordpress.org/latest.tar.gz".to_string(),
            timeout_secs: 300,
            archive_name: "latest.tar.gz".to_string(),
            expected_sha256: None,
        }
    }
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            distribution_dir: "wordpress".to_string(),
            staging_dir: ".wp-rescue-staging".to_string(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            content_dir: "wp-content".to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_name: "wp-rescue-activity.jsonl".to_string(),
        }
    }
}

impl Config {
    /// Resolve the config path: explicit > `WPRESCUE_CONFIG` > working dir.
    #[must_use]
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Some(p) = env::var_os(CONFIG_PATH_ENV) {
            return PathBuf::from(p);
        }
        PathBuf::from(CONFIG_FILE_NAME)
    }

    /// Load config from an explicit or resolved path.
    ///
    /// A missing file is only an error when the path was given explicitly
    /// (flag or env var); otherwise defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path.is_some() || env::var_os(CONFIG_PATH_ENV).is_some();
        let path_buf = Self::resolve_path(path);

        let cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| WprError::Io {
                path: path_buf.clone(),
                source,
            })?;
            toml::from_str::<Self>(&raw)?
        } else if explicit {
            return Err(WprError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configs that would make the pipeline destroy the wrong things.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.url.is_empty() {
            return Err(invalid("fetch.url must not be empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(invalid("fetch.timeout_secs must be positive"));
        }
        if let Some(digest) = &self.fetch.expected_sha256 {
            let ok = digest.len() == 64 && digest.chars().all(|c| c.is_ascii_hexdigit());
            if !ok {
                return Err(invalid(
                    "fetch.expected_sha256 must be 64 hex characters when set",
                ));
            }
        }
        if self.cleanup.core_dirs.is_empty() {
            return Err(invalid("cleanup.core_dirs must not be empty"));
        }
        if self.cleanup.script_extension.is_empty() || self.cleanup.script_extension.contains('.') {
            return Err(invalid(
                "cleanup.script_extension must be a bare extension like `php`",
            ));
        }
        for name in self
            .cleanup
            .core_dirs
            .iter()
            .chain(self.preserve.names.iter())
            .chain([
                &self.install.distribution_dir,
                &self.install.staging_dir,
                &self.fetch.archive_name,
                &self.scan.content_dir,
                &self.log.file_name,
            ]) {
            if !is_plain_name(name) {
                return Err(invalid(&format!(
                    "`{name}` must be a plain file name (no separators, not `..`)"
                )));
            }
        }
        Ok(())
    }
}

fn invalid(details: &str) -> WprError {
    WprError::InvalidConfig {
        details: details.to_string(),
    }
}

/// A single path component: non-empty, no separators, no parent traversal.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != ".." && name != "." && !name.contains(['/', '\\'])
}
