//! Fetch stage: stream the release archive to disk with bounded time.
//!
//! Success means the transfer completed, the HTTP status was a success code,
//! and the written file is non-empty. On every failure path — timeout,
//! status, zero-byte body, transfer error, digest mismatch, cancellation —
//! the partial file is removed before the stage reports, so a corrupt
//! archive never survives on disk.

#![allow(missing_docs)]

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::core::config::FetchConfig;
use crate::core::errors::{Result, WprError};

/// Streaming chunk size. Large enough to keep syscall count low, small
/// enough that cancellation latency stays under a chunk.
const CHUNK_BYTES: usize = 64 * 1024;

/// Where the archive landed and how big it is.
#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub archive_path: PathBuf,
    pub bytes: u64,
}

/// Download the configured release archive into `root`.
///
/// `cancel` is a cooperative flag checked between chunks; raising it aborts
/// the transfer and removes the partial file.
pub fn run(root: &Path, cfg: &FetchConfig, cancel: Option<&AtomicBool>) -> Result<FetchReport> {
    let archive_path = root.join(&cfg.archive_name);

    let outcome = download(&archive_path, cfg, cancel);
    if outcome.is_err() {
        // Best-effort: the error being reported is the transfer failure, not
        // the cleanup of its debris.
        let _ = fs::remove_file(&archive_path);
    }
    let bytes = outcome?;

    Ok(FetchReport {
        archive_path,
        bytes,
    })
}

fn download(archive_path: &Path, cfg: &FetchConfig, cancel: Option<&AtomicBool>) -> Result<u64> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .build()?;

    // Redirects are followed by the client's default policy; wordpress.org
    // serves the release behind at least one.
    let response = client.get(&cfg.url).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(WprError::HttpStatus {
            url: cfg.url.clone(),
            status: status.as_u16(),
        });
    }

    let mut file = File::create(archive_path).map_err(|e| WprError::io(archive_path, e))?;
    let mut body = response;
    let mut hasher = cfg.expected_sha256.as_ref().map(|_| Sha256::new());
    let mut buffer = vec![0_u8; CHUNK_BYTES];
    let mut written: u64 = 0;

    loop {
        if let Some(flag) = cancel
            && flag.load(Ordering::Relaxed)
        {
            return Err(WprError::Cancelled);
        }
        let read = body.read(&mut buffer).map_err(|e| WprError::Transfer {
            url: cfg.url.clone(),
            details: e.to_string(),
        })?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])
            .map_err(|e| WprError::io(archive_path, e))?;
        if let Some(h) = hasher.as_mut() {
            h.update(&buffer[..read]);
        }
        written += read as u64;
    }
    file.flush().map_err(|e| WprError::io(archive_path, e))?;

    if written == 0 {
        return Err(WprError::EmptyDownload {
            url: cfg.url.clone(),
        });
    }

    if let (Some(expected), Some(h)) = (cfg.expected_sha256.as_ref(), hasher) {
        let actual = format!("{:x}", h.finalize());
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(WprError::ChecksumMismatch {
                expected: expected.to_ascii_lowercase(),
                actual,
            });
        }
    }

    Ok(written)
}
