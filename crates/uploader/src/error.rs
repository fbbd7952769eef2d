//! Upload error types.

use signurl_transfer::TransferError;

/// Failure reported by a caller-supplied callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CallbackError(pub String);

impl From<String> for CallbackError {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CallbackError {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Errors produced while orchestrating an upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("transfer error: {0}")]
    Transfer(TransferError),

    #[error("failed to create multipart session: {0}")]
    SessionCreate(CallbackError),

    #[error("failed to finalize multipart session: {0}")]
    Finalize(CallbackError),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("no abort callback configured")]
    MissingCallback,

    #[error("failed to abort multipart session: {0}")]
    Abort(CallbackError),

    #[error("no parts were dispatched")]
    NothingDispatched,

    #[error("config error: {0}")]
    Config(String),
}

impl From<TransferError> for UploadError {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::InvalidInput(msg) => UploadError::InvalidInput(msg),
            other => UploadError::Transfer(other),
        }
    }
}
