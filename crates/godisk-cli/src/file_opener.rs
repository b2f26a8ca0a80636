use std::sync::Arc;

use async_trait::async_trait;
use godisk_api::{
    poll_until_ready, text_is_ready, ConsoleBackend, GoDiskClient, ReportKind, ReportPayload,
    ReportRequest, RetryPolicy,
};
use godisk_console::{ContentOpener, FileOpenRequest};

/// Fetches `file` reports and prints them to stdout.
pub(crate) struct StdoutFileOpener {
    client: Arc<GoDiskClient>,
    retry: RetryPolicy,
}

impl StdoutFileOpener {
    pub(crate) fn new(client: Arc<GoDiskClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }
}

/// Content of the `file` report for `ruta`, polled until non-empty.
pub(crate) async fn fetch_file_text(
    client: &GoDiskClient,
    retry: RetryPolicy,
    id: &str,
    ruta: &str,
) -> Result<String, godisk_api::GoDiskApiError> {
    let request = ReportRequest::new(ReportKind::File, id).with_ruta(ruta);
    let polled = poll_until_ready(
        retry,
        "file",
        || client.fetch_report(&request),
        |payload: &ReportPayload| match payload {
            ReportPayload::File(text) => text_is_ready(text),
            _ => false,
        },
    )
    .await?;
    match polled.payload {
        ReportPayload::File(text) => Ok(text),
        other => Err(godisk_api::GoDiskApiError::InvalidResponse(format!(
            "expected file report, got {}",
            other.kind()
        ))),
    }
}

#[async_trait]
impl ContentOpener for StdoutFileOpener {
    async fn open(&self, request: FileOpenRequest) {
        match fetch_file_text(&self.client, self.retry, &request.id, &request.ruta).await {
            Ok(text) => {
                println!("--- {} ({})", request.ruta, request.location);
                println!("{}", text.trim_end());
                println!("---");
            }
            Err(error) => {
                tracing::warn!(
                    location = %request.location,
                    error = %error.user_message(),
                    "file report could not be opened"
                );
            }
        }
    }
}
