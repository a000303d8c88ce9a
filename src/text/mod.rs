//! Lossy, best-effort text parsers: feature reports, highlighting and
//! moderation heuristics.

pub mod features;
pub mod flags;
pub mod highlight;
