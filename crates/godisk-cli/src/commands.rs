use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use godisk_api::{ConsoleBackend, FindQuery, GoDiskClient};
use godisk_console::{AuthService, Console, DispatchOutcome, SessionStore};

use crate::bootstrap_helpers::{build_client, console_config, open_session_store};
use crate::cli_args::{Cli, CliCommand};
use crate::file_opener::{fetch_file_text, StdoutFileOpener};
use crate::render::{render_directory, render_ls_items, render_mounts, render_surfaces};
use crate::repl::run_repl;
use crate::script_input::{read_script_files, read_stdin_script};

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let encoded = serde_json::to_string_pretty(value).context("failed to encode JSON output")?;
    println!("{encoded}");
    Ok(())
}

fn resolve_mount_id(explicit: Option<&str>, sessions: &SessionStore) -> Result<String> {
    if let Some(id) = explicit.map(str::trim).filter(|id| !id.is_empty()) {
        return Ok(id.to_string());
    }
    sessions
        .get()
        .map(|session| session.mount_id)
        .ok_or_else(|| anyhow!("no mount id given and no active session; pass --id or run `godisk login`"))
}

fn build_console(cli: &Cli, client: &Arc<GoDiskClient>) -> Arc<Console> {
    let config = console_config(cli);
    let opener = Arc::new(StdoutFileOpener::new(client.clone(), config.retry));
    Arc::new(Console::new(client.clone(), opener, config))
}

async fn run_script(cli: &Cli, client: &Arc<GoDiskClient>, script: &str) -> Result<()> {
    let console = build_console(cli, client);
    let outcome = console.execute(script).await;
    let surfaces = console.snapshot();
    if cli.json {
        print_json(&surfaces)?;
    } else {
        print!("{}", render_surfaces(&surfaces));
    }
    match outcome {
        DispatchOutcome::Applied { token, pending } => {
            if !pending.is_empty() {
                tracing::warn!(token, pending = ?pending, "reports still empty after polling");
            }
            Ok(())
        }
        DispatchOutcome::Failed { token, message } => {
            tracing::debug!(token, "script run failed");
            Err(anyhow!("script failed: {message}"))
        }
        DispatchOutcome::RejectedBlank => bail!("script is empty"),
        DispatchOutcome::RejectedBusy | DispatchOutcome::Discarded { .. } => {
            bail!("script run was superseded")
        }
    }
}

pub(crate) async fn run_cli(cli: Cli) -> Result<()> {
    let client = build_client(&cli)?;
    let sessions = open_session_store(&cli);
    let auth = AuthService::new(client.clone(), sessions.clone());

    match &cli.command {
        CliCommand::Exec {
            script_files,
            script,
        } => {
            let text = match script {
                Some(script) => script.clone(),
                None if !script_files.is_empty() => read_script_files(script_files)?,
                None => read_stdin_script()?,
            };
            run_script(&cli, &client, &text).await
        }
        CliCommand::Repl => run_repl(build_console(&cli, &client), &cli.state_dir).await,
        CliCommand::Login { user, password, id } => {
            let session = auth
                .login(user, password, id)
                .await
                .map_err(|error| anyhow!("login failed: {}", error.user_message()))?;
            if cli.json {
                return print_json(&session);
            }
            println!(
                "logged in as {} on {}{}",
                session.user,
                session.mount_id,
                if session.is_root { " (root)" } else { "" }
            );
            Ok(())
        }
        CliCommand::Logout => {
            if !sessions.is_logged_in() {
                bail!("no active session");
            }
            let output = auth
                .logout()
                .await
                .map_err(|error| anyhow!("logout failed: {}", error.user_message()))?;
            if !output.trim().is_empty() {
                println!("{}", output.trim_end());
            }
            Ok(())
        }
        CliCommand::Whoami => match sessions.get() {
            Some(session) if cli.json => print_json(&session),
            Some(session) => {
                println!(
                    "user={} mount={} root={}",
                    session.user, session.mount_id, session.is_root
                );
                Ok(())
            }
            None => {
                println!("not logged in");
                Ok(())
            }
        },
        CliCommand::Mounted => {
            let output = auth
                .mounted()
                .await
                .map_err(|error| anyhow!("mounted failed: {}", error.user_message()))?;
            println!("{output}");
            Ok(())
        }
        CliCommand::Mounts => {
            let mounts = client
                .list_mounts()
                .await
                .map_err(|error| anyhow!("failed to list mounts: {}", error.user_message()))?;
            if cli.json {
                return print_json(&mounts);
            }
            print!("{}", render_mounts(&mounts));
            Ok(())
        }
        CliCommand::Ls { id, ruta } => {
            let id = resolve_mount_id(id.as_deref(), &sessions)?;
            let report = client
                .list_directory(&id, ruta)
                .await
                .map_err(|error| anyhow!("ls failed: {}", error.user_message()))?;
            if cli.json {
                return print_json(&report);
            }
            let mut out = format!("LS {} {}\n", id, godisk_api::normalize_path(ruta));
            render_ls_items(&mut out, &report.sorted_items());
            print!("{out}");
            Ok(())
        }
        CliCommand::Browse { id, ruta, name } => {
            let query = match name {
                Some(name) => FindQuery::by_name(ruta, name.clone()),
                None => FindQuery::for_mount(resolve_mount_id(id.as_deref(), &sessions)?, ruta),
            };
            let listing = client
                .find(&query)
                .await
                .map_err(|error| anyhow!("browse failed: {}", error.user_message()))?;
            if cli.json {
                return print_json(&listing);
            }
            print!("{}", render_directory(&listing));
            Ok(())
        }
        CliCommand::File { id, ruta } => {
            let id = resolve_mount_id(id.as_deref(), &sessions)?;
            let ruta = godisk_api::normalize_path(ruta);
            let config = console_config(&cli);
            let text = fetch_file_text(&client, config.retry, &id, &ruta)
                .await
                .map_err(|error| anyhow!("failed to read {ruta}: {}", error.user_message()))?;
            println!("{}", text.trim_end());
            Ok(())
        }
    }
}
