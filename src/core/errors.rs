//! WPR-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, WprError>;

/// Top-level error type for wp-rescue.
///
/// Code ranges follow the stage taxonomy: 1xxx configuration, 2xxx
/// filesystem, 3xxx network, 4xxx archive, 5xxx serialization/internal.
#[derive(Debug, Error)]
pub enum WprError {
    #[error("[WPR-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[WPR-1002] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[WPR-1003] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[WPR-2001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "[WPR-2002] cleanup interrupted at {path}: {source}; removed [{}], not removed [{}]",
        .removed.join(", "),
        .remaining.join(", ")
    )]
    CleanupInterrupted {
        removed: Vec<String>,
        remaining: Vec<String>,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[WPR-2003] another recovery run holds the lock at {path}")]
    LockHeld { path: PathBuf },

    #[error("[WPR-3001] download of {url} failed with HTTP status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("[WPR-3002] download of {url} produced an empty file")]
    EmptyDownload { url: String },

    #[error("[WPR-3003] transfer failure for {url}: {details}")]
    Transfer { url: String, details: String },

    #[error("[WPR-3004] archive digest mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("[WPR-3005] download cancelled")]
    Cancelled,

    #[error("[WPR-4001] unreadable archive at {path}: {details}")]
    Archive { path: PathBuf, details: String },

    #[error("[WPR-4002] archive does not contain the expected distribution folder `{expected}`")]
    MissingDistribution { expected: String },

    #[error("[WPR-5001] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },
}

impl WprError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "WPR-1001",
            Self::ConfigParse { .. } => "WPR-1002",
            Self::MissingConfig { .. } => "WPR-1003",
            Self::Io { .. } => "WPR-2001",
            Self::CleanupInterrupted { .. } => "WPR-2002",
            Self::LockHeld { .. } => "WPR-2003",
            Self::HttpStatus { .. } => "WPR-3001",
            Self::EmptyDownload { .. } => "WPR-3002",
            Self::Transfer { .. } => "WPR-3003",
            Self::ChecksumMismatch { .. } => "WPR-3004",
            Self::Cancelled => "WPR-3005",
            Self::Archive { .. } => "WPR-4001",
            Self::MissingDistribution { .. } => "WPR-4002",
            Self::Serialization { .. } => "WPR-5001",
        }
    }

    /// Whether re-invoking the failed stage might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::Transfer { .. } | Self::EmptyDownload { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for WprError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for WprError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<reqwest::Error> for WprError {
    fn from(value: reqwest::Error) -> Self {
        let url = value
            .url()
            .map_or_else(|| "<unknown>".to_string(), ToString::to_string);
        let details = if value.is_timeout() {
            "transfer timed out".to_string()
        } else {
            value.to_string()
        };
        Self::Transfer { url, details }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_errors() -> Vec<WprError> {
        vec![
            WprError::InvalidConfig {
                details: String::new(),
            },
            WprError::ConfigParse {
                context: "",
                details: String::new(),
            },
            WprError::MissingConfig {
                path: PathBuf::new(),
            },
            WprError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            WprError::CleanupInterrupted {
                removed: Vec::new(),
                remaining: Vec::new(),
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            WprError::LockHeld {
                path: PathBuf::new(),
            },
            WprError::HttpStatus {
                url: String::new(),
                status: 404,
            },
            WprError::EmptyDownload { url: String::new() },
            WprError::Transfer {
                url: String::new(),
                details: String::new(),
            },
            WprError::ChecksumMismatch {
                expected: String::new(),
                actual: String::new(),
            },
            WprError::Cancelled,
            WprError::Archive {
                path: PathBuf::new(),
                details: String::new(),
            },
            WprError::MissingDistribution {
                expected: String::new(),
            },
            WprError::Serialization {
                context: "",
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = sample_errors();
        let codes: Vec<&str> = errors.iter().map(WprError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn error_codes_have_wpr_prefix() {
        for err in &sample_errors() {
            assert!(
                err.code().starts_with("WPR-"),
                "code {} must start with WPR-",
                err.code()
            );
        }
    }

    #[test]
    fn error_display_includes_code() {
        let err = WprError::HttpStatus {
            url: "https://wordpress.org/latest.tar.gz".to_string(),
            status: 404,
        };
        let msg = err.to_string();
        assert!(
            msg.contains("WPR-3001"),
            "display should contain error code: {msg}"
        );
        assert!(msg.contains("404"), "display should contain status: {msg}");
    }

    #[test]
    fn cleanup_interrupted_reports_both_sides() {
        let err = WprError::CleanupInterrupted {
            removed: vec!["wp-admin/".to_string()],
            remaining: vec!["wp-includes/".to_string(), "index.php".to_string()],
            path: PathBuf::from("/site/wp-includes"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        let msg = err.to_string();
        assert!(msg.contains("wp-admin/"), "removed list missing: {msg}");
        assert!(msg.contains("wp-includes/"), "remaining list missing: {msg}");
        assert!(msg.contains("index.php"), "remaining list missing: {msg}");
    }

    #[test]
    fn retryable_errors_are_correct() {
        assert!(
            WprError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            }
            .is_retryable()
        );
        assert!(
            WprError::Transfer {
                url: String::new(),
                details: String::new(),
            }
            .is_retryable()
        );

        assert!(
            !WprError::HttpStatus {
                url: String::new(),
                status: 404,
            }
            .is_retryable()
        );
        assert!(!WprError::Cancelled.is_retryable());
        assert!(
            !WprError::LockHeld {
                path: PathBuf::new(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn io_convenience_constructor() {
        let err = WprError::io(
            "/site/wp-admin",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "WPR-2001");
        assert!(err.to_string().contains("/site/wp-admin"));
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: WprError = toml_err.into();
        assert_eq!(err.code(), "WPR-1002");
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: WprError = json_err.into();
        assert_eq!(err.code(), "WPR-5001");
    }
}
