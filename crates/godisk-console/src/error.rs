use godisk_api::GoDiskApiError;
use thiserror::Error;

use crate::session_store::SessionStoreError;

#[derive(Debug, Error)]
/// Enumerates supported `ConsoleError` values.
pub enum ConsoleError {
    #[error(transparent)]
    Api(#[from] GoDiskApiError),
    #[error(transparent)]
    SessionStore(#[from] SessionStoreError),
    #[error("{0}")]
    Authentication(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("inode listing was replaced before inode {index} arrived")]
    StaleSelection { index: i64 },
}

impl ConsoleError {
    /// Message suitable for the console output pane.
    pub fn user_message(&self) -> String {
        match self {
            ConsoleError::Api(error) => error.user_message(),
            other => other.to_string(),
        }
    }
}
