//! Signing boundary: the external authority that administers multipart
//! sessions and issues presigned transfer URLs.
//!
//! The caller implements these traits on top of whatever backend holds the
//! storage credentials. Keeping them as traits lets the orchestration core
//! stay transport-free and testable with mocks.

use std::future::Future;
use std::pin::Pin;

use signurl_protocol::{
    AbortSessionRequest, CreateSessionRequest, FinalizeSessionRequest, TransferUrlRequest,
};
use url::Url;

use crate::error::{CallbackError, UploadError};

/// Session administration and URL signing.
pub trait Signer: Send + Sync {
    /// Opens a multipart session and returns its id.
    ///
    /// Called once per upload, only when the object needs two or more parts.
    fn create_session(
        &self,
        req: CreateSessionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, CallbackError>> + Send + '_>>;

    /// Returns a presigned URL for one part or for the whole object.
    fn transfer_url(
        &self,
        req: TransferUrlRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, CallbackError>> + Send + '_>>;

    /// Assembles the object from its confirmed parts.
    fn finalize_session(
        &self,
        req: FinalizeSessionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), CallbackError>> + Send + '_>>;
}

/// Optional capability to release a multipart session on the store.
///
/// Required for [`Uploader::abort`](crate::Uploader::abort); without it an
/// abandoned session keeps holding storage.
pub trait SessionAborter: Send + Sync {
    fn abort_session(
        &self,
        req: AbortSessionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), CallbackError>> + Send + '_>>;
}

/// Requests a transfer URL and checks that it is usable.
///
/// A callback error, an empty string or anything that is not an absolute
/// http(s) URL is a [`UploadError::Signing`].
pub async fn request_transfer_url(
    signer: &dyn Signer,
    req: TransferUrlRequest,
) -> Result<Url, UploadError> {
    let raw = signer
        .transfer_url(req)
        .await
        .map_err(|e| UploadError::Signing(e.to_string()))?;
    parse_transfer_url(&raw)
}

fn parse_transfer_url(raw: &str) -> Result<Url, UploadError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UploadError::Signing("signer returned an empty URL".into()));
    }
    let url = Url::parse(trimmed)
        .map_err(|e| UploadError::Signing(format!("invalid transfer URL {trimmed:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(UploadError::Signing(format!(
            "unsupported transfer URL scheme: {other}"
        ))),
    }
}
