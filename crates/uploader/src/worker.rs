//! Transfer worker boundary.
//!
//! A worker moves one byte range of the source to a presigned URL and hands
//! back the confirmation tag the store returned. The core never performs
//! I/O against the store itself.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use signurl_transfer::{ByteRange, ByteSource, PartProgress, TransferError};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Everything a worker needs to transfer one part (or the whole object).
#[derive(Clone)]
pub struct TransferRequest {
    /// Presigned destination.
    pub url: Url,
    /// `None` for a single-shot whole-object transfer.
    pub part_number: Option<u32>,
    pub range: ByteRange,
    pub source: Arc<dyn ByteSource>,
    /// MIME type sent with the bytes.
    pub content_type: String,
    /// Byte-level progress sink for this transfer.
    pub progress: PartProgress,
    /// Fires when the upload is aborted; workers that can interrupt an
    /// in-flight request should do so.
    pub cancel: CancellationToken,
}

impl TransferRequest {
    /// Returns `true` for a single-shot `put_object` transfer.
    pub fn is_whole_object(&self) -> bool {
        self.part_number.is_none()
    }
}

/// Performs byte-range transfers.
pub trait TransferWorker: Send + Sync {
    /// Transfers `req.range` and returns the store's confirmation tag.
    ///
    /// A missing tag in an otherwise successful response must be reported as
    /// [`TransferError::MissingTag`].
    fn transfer(
        &self,
        req: TransferRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, TransferError>> + Send + '_>>;
}
