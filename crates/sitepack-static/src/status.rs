//! Markers prefixed to status lines so build logs can be scanned by eye.

/// Step completed.
pub const OK: &str = "✅";

/// Optional step skipped or degraded; the pipeline continues.
pub const WARN: &str = "⚠️";

/// Pipeline stopped.
pub const FATAL: &str = "❌";
