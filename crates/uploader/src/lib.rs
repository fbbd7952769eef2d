//! Presigned multipart upload orchestration.
//!
//! This crate implements the **orchestration core** for uploading one large
//! object to an object store through presigned URLs. It has no HTTP or
//! credential handling of its own: the caller supplies a [`Signer`] that
//! administers multipart sessions and issues transfer URLs, and a
//! [`TransferWorker`] that moves bytes.
//!
//! # Flow
//!
//! 1. **Plan**: split the object into part-sized byte ranges
//! 2. **Open**: create a multipart session (skipped for single-part objects)
//! 3. **Transfer**: dispatch parts with bounded concurrency
//! 4. **Settle**: finalize, or keep the ledger for a later `resume`
//!
//! An upload can be aborted at any point while a multipart session is open.

pub mod abort;
pub mod completion;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod session;
pub mod signer;
pub mod types;
pub mod uploader;
pub mod worker;

#[cfg(test)]
mod testing;

pub use abort::AbortCoordinator;
pub use completion::{Assessment, CompletionCoordinator, assess};
pub use config::{DEFAULT_CONCURRENCY_LIMIT, UploaderConfig};
pub use error::{CallbackError, UploadError};
pub use scheduler::{PartScheduler, SessionTarget};
pub use session::{StatusMachine, UploadSession};
pub use signer::{SessionAborter, Signer, request_transfer_url};
pub use types::{LedgerEntry, StatusCallback, UploadCallbacks};
pub use uploader::Uploader;
pub use worker::{TransferRequest, TransferWorker};

pub use signurl_protocol::{Part, UploadProgress, UploadStatus};
pub use signurl_transfer::{ByteSource, FileSource, MemorySource, TransferError};
