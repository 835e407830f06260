//! Audit log of directory mutations
//!
//! Every contact created or updated by alias integration, backfill or
//! registry enrichment is appended to `audit.log` as one JSON line, with the
//! before/after values and a one-line diff. Cache resets are recorded too.

mod diff;
mod entry;
mod logger;

pub use diff::generate_diff;
pub use entry::{AuditEntry, EntityType, Operation};
pub use logger::AuditLogger;
