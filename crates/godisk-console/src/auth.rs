use std::sync::{Arc, OnceLock};

use godisk_api::{ConsoleBackend, ExecResponse};
use regex::Regex;

use crate::error::ConsoleError;
use crate::session_store::{Session, SessionStore};

/// Failure text when a login produces no output at all.
pub const LOGIN_FAILURE_FALLBACK: &str = "Error desconocido de autenticación";
/// Shown by `mounted` when the backend lists nothing.
pub const NO_MOUNTS_PLACEHOLDER: &str = "(sin particiones montadas)";

fn error_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?im)^[ \t]*error(?:[: \t]|$)[ \t]*(.*)$").expect("valid regex")
    })
}

/// Message of the first error line in command output, if any.
///
/// A line counts when, after leading blanks, it starts with `error` followed
/// by `:`, whitespace or the end of the line (any case). The message is the
/// rest of that line.
pub fn output_error_message(output: &str) -> Option<String> {
    let captures = error_line_pattern().captures(output)?;
    let line = captures.get(0).map(|line| line.as_str().trim())?;
    let detail = captures
        .get(1)
        .map(|detail| detail.as_str().trim())
        .filter(|detail| !detail.is_empty());
    Some(detail.unwrap_or(line).to_string())
}

// Structured status wins; otherwise empty output or an error line fails.
fn login_failure(response: &ExecResponse) -> Option<String> {
    let structured_error = response
        .error
        .as_deref()
        .map(str::trim)
        .filter(|error| !error.is_empty());
    match response.ok {
        Some(true) => return None,
        Some(false) => {
            return Some(
                structured_error
                    .map(ToOwned::to_owned)
                    .or_else(|| output_error_message(&response.output))
                    .unwrap_or_else(|| LOGIN_FAILURE_FALLBACK.to_string()),
            )
        }
        None => {}
    }
    if let Some(error) = structured_error {
        return Some(error.to_string());
    }
    if response.output.trim().is_empty() {
        return Some(LOGIN_FAILURE_FALLBACK.to_string());
    }
    output_error_message(&response.output)
}

fn strip_quotes(value: &str) -> String {
    value.replace('"', "")
}

/// Login and logout on top of script execution, mirrored into a [`SessionStore`].
pub struct AuthService {
    backend: Arc<dyn ConsoleBackend>,
    sessions: Arc<SessionStore>,
}

impl AuthService {
    pub fn new(backend: Arc<dyn ConsoleBackend>, sessions: Arc<SessionStore>) -> Self {
        Self { backend, sessions }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// `login -usr="u" -pwd="p" -id="m"`; embedded double quotes are dropped.
    pub fn login_script(user: &str, password: &str, mount_id: &str) -> String {
        format!(
            "login -usr=\"{}\" -pwd=\"{}\" -id=\"{}\"",
            strip_quotes(user),
            strip_quotes(password),
            strip_quotes(mount_id)
        )
    }

    pub async fn login(
        &self,
        user: &str,
        password: &str,
        mount_id: &str,
    ) -> Result<Session, ConsoleError> {
        let user = user.trim();
        let mount_id = mount_id.trim();
        if user.is_empty() {
            return Err(ConsoleError::MissingField("user"));
        }
        if password.trim().is_empty() {
            return Err(ConsoleError::MissingField("password"));
        }
        if mount_id.is_empty() {
            return Err(ConsoleError::MissingField("mount id"));
        }

        let response = self
            .backend
            .execute(&Self::login_script(user, password, mount_id))
            .await?;
        if let Some(message) = login_failure(&response) {
            tracing::debug!(user, mount_id, "login rejected");
            return Err(ConsoleError::Authentication(message));
        }

        let session = Session::new(user, mount_id);
        if let Err(error) = self.sessions.set(session.clone()) {
            tracing::warn!(error = %error, "session not persisted");
        }
        tracing::debug!(user, mount_id, "login accepted");
        Ok(session)
    }

    /// Runs `logout`; the session is cleared only when the backend answered.
    pub async fn logout(&self) -> Result<String, ConsoleError> {
        let response = self.backend.execute("logout").await?;
        if let Err(error) = self.sessions.clear() {
            tracing::warn!(error = %error, "session removal not persisted");
        }
        Ok(response.output)
    }

    /// Output of the `mounted` command, with a placeholder when empty.
    pub async fn mounted(&self) -> Result<String, ConsoleError> {
        let response = self.backend.execute("mounted").await?;
        let output = response.output.trim();
        if output.is_empty() {
            return Ok(NO_MOUNTS_PLACEHOLDER.to_string());
        }
        Ok(output.to_string())
    }
}
