use futures_util::future::join_all;
use godisk_api::{
    ConsoleBackend, GoDiskApiError, InodeReport, InodeSummary, ReportKind, ReportPayload,
    ReportRequest,
};

/// Inodes fetched in full when an inode listing arrives.
pub const DEFAULT_MAX_CHAIN_NODES: usize = 10;

/// Full inode report for `index` on mount `id`.
pub async fn fetch_inode(
    backend: &dyn ConsoleBackend,
    id: &str,
    index: i64,
) -> Result<InodeReport, GoDiskApiError> {
    let request = ReportRequest::new(ReportKind::Inode, id).with_ruta(index.to_string());
    match backend.fetch_report(&request).await? {
        ReportPayload::Inode(report) => Ok(report),
        other => Err(GoDiskApiError::InvalidResponse(format!(
            "expected inode report, got {}",
            other.kind()
        ))),
    }
}

/// Fetches the first `max` inodes of a listing concurrently, preserving order.
///
/// Any failure fails the whole chain; callers show an empty chain then.
pub async fn fetch_inode_chain(
    backend: &dyn ConsoleBackend,
    id: &str,
    items: &[InodeSummary],
    max: usize,
) -> Result<Vec<InodeReport>, GoDiskApiError> {
    let fetches = items
        .iter()
        .take(max)
        .map(|item| fetch_inode(backend, id, item.index));
    join_all(fetches).await.into_iter().collect()
}
