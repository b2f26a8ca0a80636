use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A `file` report the console asks a viewer to open.
pub struct FileOpenRequest {
    pub id: String,
    pub ruta: String,
    /// Backend URL serving the file content.
    pub location: String,
}

#[async_trait]
/// Side-effect seam for `file` reports, which are shown outside the console.
pub trait ContentOpener: Send + Sync {
    async fn open(&self, request: FileOpenRequest);
}

#[derive(Debug, Clone, Copy, Default)]
/// Opener that ignores every request.
pub struct NoopContentOpener;

#[async_trait]
impl ContentOpener for NoopContentOpener {
    async fn open(&self, request: FileOpenRequest) {
        tracing::debug!(location = %request.location, "file report ignored by noop opener");
    }
}
