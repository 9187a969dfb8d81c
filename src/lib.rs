#![forbid(unsafe_code)]

//! wp-rescue — restore a compromised WordPress installation to a clean core
//! and flag suspicious artifacts left behind in user content.
//!
//! Four sequential stages:
//! 1. **Cleanup** — delete the replaceable core, respecting the preserved set
//! 2. **Fetch** — stream the release archive to disk with a bounded timeout
//! 3. **Install** — extract and merge without clobbering preserved files
//! 4. **Scan** — walk `wp-content` and report heuristic detections
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use wp_rescue::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use wp_rescue::core::config::Config;
//! use wp_rescue::pipeline::orchestrator::{Pipeline, Stage};
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod pipeline;
pub mod scanner;
