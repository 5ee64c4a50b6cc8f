//! Compose multipart HTML mail and hand it to a sendmail compatible binary.

pub mod message;
pub mod transport;

use std::path::PathBuf;

use thiserror::Error;

pub use message::SimpleMail;
pub use transport::{MailTransport, Sendmail};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Header injection attempt in {field}: line breaks are not allowed")]
    HeaderInjection { field: &'static str },
    #[error("Malformed extra header line: {0:?}")]
    InvalidHeader(String),
    #[error("Failed to read attachment {path}: {source}")]
    Attachment {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Mail transport not found at {0}")]
    TransportNotFound(PathBuf),
    #[error("Mail transport failed: {0}")]
    SendFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
