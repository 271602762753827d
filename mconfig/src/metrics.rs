//! Metrics definitions for mconfig pipeline monitoring.

/// Label for the update variant (`config`, `gateway`, `tier`, `noop`).
pub const UPDATE_KIND_LABEL: &str = "update_kind";

/// Counter for CDC messages whose effects were persisted and committed.
pub const MCONFIG_MESSAGES_PROCESSED_TOTAL: &str = "mconfig_messages_processed_total";

/// Counter for bundles written or deleted while applying updates.
pub const MCONFIG_BUNDLES_WRITTEN_TOTAL: &str = "mconfig_bundles_written_total";

/// Counter for messages that decoded to no update.
pub const MCONFIG_NOOP_MESSAGES_TOTAL: &str = "mconfig_noop_messages_total";

/// Histogram of the time spent applying one update.
pub const MCONFIG_APPLY_DURATION_SECONDS: &str = "mconfig_apply_duration_seconds";
