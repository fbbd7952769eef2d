//! HTTP collaborators for presigned multipart uploads.
//!
//! [`HttpSigner`] talks JSON to a presigning backend that holds the storage
//! credentials, and [`HttpTransferWorker`] `PUT`s byte ranges straight to the
//! presigned URLs it hands out. Both plug into
//! [`Uploader`](signurl_uploader::Uploader).

pub mod config;
pub mod error;
pub mod signer;
pub mod worker;

#[cfg(test)]
mod mock;

pub use config::HttpSignerConfig;
pub use error::HttpError;
pub use signer::HttpSigner;
pub use worker::{HttpTransferWorker, UPLOAD_SLICE_SIZE, part_number_from_url};
