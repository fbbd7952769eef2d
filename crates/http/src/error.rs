//! HTTP adapter errors.

use signurl_transfer::TransferError;
use signurl_uploader::CallbackError;

/// Errors from the presigning backend client and the transfer worker.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("invalid header value: {0}")]
    InvalidHeader(String),

    #[error("config error: {0}")]
    Config(String),
}

impl From<HttpError> for CallbackError {
    fn from(e: HttpError) -> Self {
        CallbackError(e.to_string())
    }
}

impl From<HttpError> for TransferError {
    fn from(e: HttpError) -> Self {
        TransferError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_keeps_status_and_body() {
        let err: CallbackError = HttpError::Api {
            status: 403,
            body: "SignatureDoesNotMatch".into(),
        }
        .into();
        assert_eq!(err.0, "server returned 403: SignatureDoesNotMatch");
    }

    #[test]
    fn maps_to_transport_error() {
        let err: TransferError = HttpError::UnexpectedResponse("empty".into()).into();
        assert!(matches!(err, TransferError::Transport(ref m) if m.contains("empty")));
    }
}
