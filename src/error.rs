//! Error type shared by every module of the crate.
//!
//! The variants follow the three failure families of the client: problems caught
//! locally before any request (validation, malformed import files), errors the
//! backend reports with a status code, and transport failures.

/// Errors produced by the table client.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Rejected locally; no request was sent.
    #[error("{0}")]
    Validation(String),

    /// The backend answered with a 4xx/5xx status. `message` is the body's
    /// `error` field verbatim when the backend provided one.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The request never produced an HTTP status (DNS, refused connection, timeout...).
    #[error("network error: {0}")]
    Transport(String),

    /// The import file is valid JSON but not a snapshot.
    #[error("invalid import file: {0}")]
    ImportFormat(String),

    /// The import file could not be parsed at all.
    #[error("could not parse import file: {0}")]
    ImportParse(String),

    #[error("unknown axis configuration {0}")]
    UnknownAxis(i64),

    #[error("render failed: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// True for failures detected before contacting the backend.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::ImportFormat(_) | Error::ImportParse(_)
        )
    }

    /// Message suitable for showing to the user next to the triggering action.
    pub fn user_message(&self) -> String {
        match self {
            Error::Server { message, .. } => format!("Error: {message}"),
            Error::Transport(_) => "Network error occurred".to_string(),
            other => other.to_string(),
        }
    }
}
