//! Detection rules: fixed, independent predicates over one filesystem entry.
//!
//! Each rule is evaluated on its own — an entry can match several — and new
//! content rules are added to the table here without touching traversal.
//! All results are advisory heuristics: they report, never remove.

#![allow(missing_docs)]

use std::fs::File;
use std::io::Read;
use std::path::Path;

use memchr::memmem;

use crate::scanner::walk::FilesystemEntry;

/// How much of a script file the content-signature rule reads.
///
/// Fixed, not configurable: injected payloads sit at the top of the file and
/// bounding the read bounds scan cost per file.
pub const SIGNATURE_PREFIX_BYTES: usize = 2048;

/// Extension of files the content-signature rule inspects.
pub const SCRIPT_EXTENSION: &str = "php";

/// Path segment that marks uploaded content.
pub const UPLOADS_SEGMENT: &str = "uploads";

/// Finding reasons, fixed per rule.
pub const REASON_HIDDEN_DIR: &str = "Hidden directory";
pub const REASON_SCRIPT_IN_UPLOADS: &str = "PHP file in uploads directory (High Risk)";
pub const REASON_WORLD_WRITABLE: &str = "777 permissions";
pub const REASON_SUSPICIOUS_CODE: &str = "Suspicious code pattern (eval/base64/obfuscation)";

/// One content-signature token.
#[derive(Debug, Clone, Copy)]
pub struct ContentRule {
    pub name: &'static str,
    pub needle: &'static [u8],
}

/// The signature table: dynamic code evaluation wrapped around a decoder,
/// raw superglobal-array obfuscation, and a hex-escaped spelling of the
/// evaluation keyword.
#[must_use]
pub const fn content_rules() -> &'static [ContentRule] {
    &[
        ContentRule {
            name: "eval-base64",
            needle: b"eval(base64_decode",
        },
        ContentRule {
            name: "eval-gzinflate",
            needle: b"eval(gzinflate",
        },
        ContentRule {
            name: "globals-obfuscation",
            needle: b"GLOBALS['",
        },
        ContentRule {
            name: "hex-eval",
            needle: br"\x65\x76\x61\x6c",
        },
    ]
}

/// Hidden-directory rule: a directory whose name starts with `.`.
///
/// Self/parent references never reach this check — `read_dir` does not
/// produce them.
#[must_use]
pub fn is_hidden_dir(entry: &FilesystemEntry) -> bool {
    entry.is_dir && entry.file_name().starts_with('.')
}

/// Script-in-uploads rule: a file below an `uploads` segment with the script
/// extension. Both conditions are required; either alone is benign.
#[must_use]
pub fn is_script_in_uploads(entry: &FilesystemEntry, relative: &Path) -> bool {
    if entry.is_dir {
        return false;
    }
    let in_uploads = relative
        .components()
        .any(|c| c.as_os_str() == UPLOADS_SEGMENT);
    in_uploads
        && entry
            .extension_lowercase()
            .is_some_and(|ext| ext == SCRIPT_EXTENSION)
}

/// World-writable rule: permission bits exactly full-open.
///
/// Exact match on the whole symbolic mode — extra bits beyond full-open
/// (setuid etc.) or one missing bit do not match. The broader "any
/// world-writable bit" policy was considered and deliberately not adopted.
#[must_use]
pub const fn is_world_writable(mode: u32) -> bool {
    mode & 0o7777 == 0o777
}

/// Whether the content-signature rule applies to this entry at all.
#[must_use]
pub fn wants_signature_check(entry: &FilesystemEntry) -> bool {
    !entry.is_dir
        && entry
            .extension_lowercase()
            .is_some_and(|ext| ext == SCRIPT_EXTENSION)
}

/// First matching signature token in a byte prefix, if any.
#[must_use]
pub fn match_signature(prefix: &[u8]) -> Option<&'static ContentRule> {
    content_rules()
        .iter()
        .find(|rule| memmem::find(prefix, rule.needle).is_some())
}

/// Read the bounded prefix the signature rule inspects.
pub fn read_prefix(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut prefix = Vec::with_capacity(SIGNATURE_PREFIX_BYTES);
    file.take(SIGNATURE_PREFIX_BYTES as u64)
        .read_to_end(&mut prefix)?;
    Ok(prefix)
}
