use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use godisk_api::{GoDiskClient, GoDiskClientConfig, RetryPolicy};
use godisk_console::{ConsoleConfig, FileKeyValueStore, SessionStore};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use crate::cli_args::Cli;

const STATE_FILE_NAME: &str = "storage.json";

pub(crate) fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

pub(crate) fn build_client(cli: &Cli) -> Result<Arc<GoDiskClient>> {
    let client = GoDiskClient::new(GoDiskClientConfig {
        api_base: cli.api_base.clone(),
        request_timeout_ms: cli.request_timeout_ms,
    })
    .context("failed to configure GoDisk API client")?;
    Ok(Arc::new(client))
}

pub(crate) fn console_config(cli: &Cli) -> ConsoleConfig {
    ConsoleConfig {
        retry: RetryPolicy::new(cli.report_retries, cli.report_retry_delay_ms),
        ..ConsoleConfig::default()
    }
}

pub(crate) fn state_file_path(cli: &Cli) -> PathBuf {
    cli.state_dir.join(STATE_FILE_NAME)
}

pub(crate) fn open_session_store(cli: &Cli) -> Arc<SessionStore> {
    Arc::new(SessionStore::open(Box::new(FileKeyValueStore::new(
        state_file_path(cli),
    ))))
}
