use std::time::Duration;

use async_trait::async_trait;
use godisk_core::current_unix_timestamp_ms;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde_json::{json, Value};

use crate::listing::{normalize_find_response, normalize_path, DirectoryListing, FindQuery};
use crate::mounts::{normalize_mounts, MountRecord};
use crate::types::{
    ConsoleBackend, ExecResponse, GoDiskApiError, LsReport, ReportKind, ReportPayload,
    ReportRequest,
};

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8080/api";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
/// Public struct `GoDiskClientConfig` used across GoDisk console components.
pub struct GoDiskClientConfig {
    /// Base URL including the `/api` prefix.
    pub api_base: String,
    pub request_timeout_ms: u64,
}

impl Default for GoDiskClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone)]
/// reqwest-backed [`ConsoleBackend`] talking to a GoDisk HTTP API.
pub struct GoDiskClient {
    http: reqwest::Client,
    config: GoDiskClientConfig,
}

impl GoDiskClient {
    pub fn new(config: GoDiskClientConfig) -> Result<Self, GoDiskApiError> {
        let api_base = config.api_base.trim();
        if api_base.is_empty() {
            return Err(GoDiskApiError::InvalidConfig(
                "api base URL cannot be empty".to_string(),
            ));
        }
        reqwest::Url::parse(api_base).map_err(|error| {
            GoDiskApiError::InvalidConfig(format!("invalid api base URL '{api_base}': {error}"))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain"));
        headers.insert(USER_AGENT, HeaderValue::from_static("godisk-console"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()?;

        Ok(Self {
            http,
            config: GoDiskClientConfig {
                api_base: api_base.trim_end_matches('/').to_string(),
                request_timeout_ms: config.request_timeout_ms,
            },
        })
    }

    pub fn api_base(&self) -> &str {
        &self.config.api_base
    }

    fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base, path.trim_start_matches('/'))
    }

    async fn send_for_text(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<String, GoDiskApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::debug!(operation, status = status.as_u16(), "backend request failed");
            return Err(GoDiskApiError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// GET with the `t=<millis>` cache-busting parameter appended.
    async fn get_text(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<String, GoDiskApiError> {
        let mut params = query.to_vec();
        params.push(("t", current_unix_timestamp_ms().to_string()));
        tracing::debug!(operation, path, "backend GET");
        let request = self.http.get(self.endpoint_url(path)).query(&params);
        self.send_for_text(operation, request).await
    }
}

/// Query parameters of a report fetch, excluding the cache-buster.
pub(crate) fn report_query(request: &ReportRequest) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    let id = request.id.trim();
    if !id.is_empty() {
        query.push(("id", id.to_string()));
    }
    let ruta = request
        .ruta
        .as_deref()
        .map(str::trim)
        .filter(|ruta| !ruta.is_empty());
    match (request.kind, ruta) {
        (_, Some(ruta)) => query.push(("ruta", ruta.to_string())),
        (ReportKind::Listing, None) => query.push(("ruta", "/".to_string())),
        _ => {}
    }
    if let Some(max) = request.max.filter(|max| *max > 0) {
        query.push(("max", max.to_string()));
    }
    query
}

#[async_trait]
impl ConsoleBackend for GoDiskClient {
    async fn execute(&self, script: &str) -> Result<ExecResponse, GoDiskApiError> {
        tracing::debug!(lines = script.lines().count(), "backend exec");
        let request = self
            .http
            .post(self.endpoint_url("exec"))
            .json(&json!({ "script": script }));
        let raw = self.send_for_text("exec", request).await?;
        if raw.trim().is_empty() {
            return Ok(ExecResponse::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    async fn fetch_report(
        &self,
        request: &ReportRequest,
    ) -> Result<ReportPayload, GoDiskApiError> {
        let path = format!("reports/{}", request.kind.as_str());
        let raw = self
            .get_text(request.kind.as_str(), &path, &report_query(request))
            .await?;
        ReportPayload::decode(request.kind, &raw)
    }

    async fn list_mounts(&self) -> Result<Vec<MountRecord>, GoDiskApiError> {
        let raw = self.get_text("mounts", "mounts", &[]).await?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        let value = serde_json::from_str::<Value>(trimmed)?;
        Ok(normalize_mounts(&value))
    }

    async fn find(&self, query: &FindQuery) -> Result<DirectoryListing, GoDiskApiError> {
        let ruta = normalize_path(&query.ruta);
        let mut params = Vec::new();
        match query.id.as_deref() {
            Some(id) => {
                params.push(("id", id.to_string()));
                params.push(("ruta", ruta.clone()));
            }
            None => {
                params.push(("ruta", ruta.clone()));
                params.push(("name", query.name.clone().unwrap_or_else(|| "*".to_string())));
            }
        }
        let raw = self.get_text("find", "fs/find", &params).await?;
        let value = serde_json::from_str::<Value>(raw.trim())?;
        Ok(normalize_find_response(&ruta, &value))
    }

    async fn list_directory(&self, id: &str, ruta: &str) -> Result<LsReport, GoDiskApiError> {
        let params = [("id", id.to_string()), ("ruta", normalize_path(ruta))];
        let raw = self.get_text("ls", "fs/ls", &params).await?;
        Ok(serde_json::from_str(raw.trim())?)
    }

    fn file_location(&self, id: &str, ruta: &str) -> String {
        let base = self.endpoint_url("reports/file");
        reqwest::Url::parse_with_params(&base, &[("id", id), ("ruta", ruta)])
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("{base}?id={id}&ruta={ruta}"))
    }
}
