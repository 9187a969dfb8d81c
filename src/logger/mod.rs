//! Append-only JSONL activity logging for stage events.

pub mod jsonl;
