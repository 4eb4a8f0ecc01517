//! Error types for chatsql.

use thiserror::Error;

/// The main error type for chatsql operations.
#[derive(Debug, Error)]
pub enum ChatSqlError {
    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required environment variable is not set.
    #[error("Missing environment variable: {0}")]
    MissingVar(&'static str),

    /// The language model could not be reached or answered badly.
    #[error("Language model error: {0}")]
    Provider(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Spreadsheet or document rendering failed.
    #[error("Report error: {0}")]
    Report(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`ChatSqlError`], by pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Provider,
    Database,
    Report,
    Io,
}

impl ChatSqlError {
    /// The stage this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::MissingVar(_) => ErrorKind::Config,
            Self::Provider(_) => ErrorKind::Provider,
            Self::Connection(_) | Self::Execution(_) => ErrorKind::Database,
            Self::Report(_) => ErrorKind::Report,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<reqwest::Error> for ChatSqlError {
    fn from(e: reqwest::Error) -> Self {
        Self::Provider(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for ChatSqlError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        Self::Report(e.to_string())
    }
}

/// Result type alias for chatsql operations.
pub type ChatSqlResult<T> = Result<T, ChatSqlError>;
