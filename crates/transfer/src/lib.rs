//! Byte-level primitives for presigned multipart uploads.
//!
//! Splits an object into part-sized byte ranges, reads those ranges from a
//! source, and aggregates per-part transfer progress.

mod planner;
mod progress;
mod source;
mod types;
mod validation;

pub use planner::{ChunkPlan, UploadStrategy, plan_chunks};
pub use progress::{PartProgress, ProgressCallback, ProgressTracker};
pub use source::{ByteSource, FileSource, MemorySource};
pub use types::{ByteRange, PlannedPart};
pub use validation::{validate_chunk_size, validate_upload_target};

/// Default part size: 10 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

/// Smallest part size most object stores accept for non-final parts: 5 MiB.
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Content type used when the source does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("response carried no confirmation tag")]
    MissingTag,

    #[error("transfer URL is signed for part {found}, expected part {expected}")]
    PartMismatch { expected: u32, found: u32 },

    #[error("cancelled")]
    Cancelled,
}
