//! HTTP boundary of the GoDisk console.
//!
//! Typed report payloads, the `ConsoleBackend` seam, the reqwest-backed
//! `GoDiskClient`, per-kind readiness predicates and the bounded retry poller
//! used to wait for reports to materialize after a script runs.
mod client;
mod listing;
mod mounts;
mod readiness;
mod retry;
mod types;

pub use client::{GoDiskClient, GoDiskClientConfig, DEFAULT_API_BASE, DEFAULT_REQUEST_TIMEOUT_MS};
pub use listing::{
    join_path, normalize_find_response, normalize_path, parent_path, path_breadcrumbs,
    Breadcrumb, DirectoryListing, FindQuery,
};
pub use mounts::{normalize_mount, normalize_mounts, MountRecord};
pub use readiness::{text_is_ready, ReportReadiness};
pub use retry::{
    poll_until_ready, Polled, RetryPolicy, DEFAULT_REPORT_RETRIES, DEFAULT_REPORT_RETRY_DELAY_MS,
};
pub use types::*;
