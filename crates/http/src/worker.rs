//! reqwest-backed transfer worker.
//!
//! Each transfer is a single `PUT` of the part's bytes to its presigned URL.
//! The body is streamed in fixed slices so progress moves while the request
//! is in flight. The store's `ETag` response header is the confirmation tag.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::stream::Stream;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{
    CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, ETAG, HeaderMap, HeaderValue,
};
use signurl_transfer::{PartProgress, TransferError};
use signurl_uploader::{TransferRequest, TransferWorker};
use tracing::debug;
use url::Url;

use crate::error::HttpError;

/// Size of each body slice handed to the HTTP client.
pub const UPLOAD_SLICE_SIZE: usize = 64 * 1024;

/// Transfers byte ranges with `PUT` requests.
#[derive(Clone)]
pub struct HttpTransferWorker {
    http: reqwest::Client,
}

impl HttpTransferWorker {
    pub fn new() -> Result<Self, HttpError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http })
    }

    /// Uses an existing client, e.g. one with proxy or TLS settings.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Uploads `req.range` and returns the raw `ETag` header value.
    pub async fn put(&self, req: &TransferRequest) -> Result<String, TransferError> {
        match (req.part_number, part_number_from_url(&req.url)) {
            (Some(expected), Some(found)) if expected != found => {
                return Err(TransferError::PartMismatch { expected, found });
            }
            _ => {}
        }

        let data = req.source.read_range(req.range).await?;
        let len = data.len() as u64;

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(&req.content_type).map_err(|_| {
                TransferError::InvalidInput(format!("invalid content type {:?}", req.content_type))
            })?,
        );
        headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
        let filename = req.source.filename();
        if req.is_whole_object() && !filename.is_empty() {
            headers.insert(CONTENT_DISPOSITION, content_disposition(filename)?);
        }

        let body = reqwest::Body::wrap_stream(sliced_body(data, req.progress.clone()));
        let resp = self
            .http
            .put(req.url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(HttpError::from)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HttpError::Api {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let tag = resp
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(TransferError::MissingTag)?
            .to_string();

        debug!(
            part_number = ?req.part_number,
            bytes = len,
            etag = %tag,
            "range transferred"
        );
        Ok(tag)
    }
}

impl TransferWorker for HttpTransferWorker {
    fn transfer(
        &self,
        req: TransferRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, TransferError>> + Send + '_>> {
        Box::pin(async move {
            tokio::select! {
                biased;
                _ = req.cancel.cancelled() => Err(TransferError::Cancelled),
                result = self.put(&req) => result,
            }
        })
    }
}

/// Reads the `partNumber` query parameter a part URL was signed for.
pub fn part_number_from_url(url: &Url) -> Option<u32> {
    url.query_pairs()
        .find(|(k, _)| k == "partNumber")
        .and_then(|(_, v)| v.parse().ok())
}

/// Splits `data` into slices and reports the running byte count as each
/// slice is handed over.
fn sliced_body(
    data: Bytes,
    progress: PartProgress,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync + 'static {
    let total = data.len();
    futures_util::stream::iter((0..total).step_by(UPLOAD_SLICE_SIZE).map(move |start| {
        let end = (start + UPLOAD_SLICE_SIZE).min(total);
        progress.report(end as u64);
        Ok(data.slice(start..end))
    }))
}

/// `attachment` disposition with an ASCII fallback name and an RFC 5987
/// encoded original.
fn content_disposition(filename: &str) -> Result<HeaderValue, TransferError> {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            ' ' => ' ',
            c if c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect();
    let encoded = utf8_percent_encode(filename, NON_ALPHANUMERIC);
    HeaderValue::from_str(&format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}"
    ))
    .map_err(|_| TransferError::InvalidInput(format!("invalid filename {filename:?}")))
}
