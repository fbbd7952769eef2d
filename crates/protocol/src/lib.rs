//! Boundary types for presigned multipart uploads.
//!
//! These are the shapes exchanged between the orchestration core and the
//! caller-supplied signing authority. They serialize to the snake_case JSON
//! a presigning backend expects.

pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use messages::{
    AbortSessionRequest, CreateSessionRequest, FinalizeSessionRequest, TransferUrlRequest,
};
pub use types::{ClientMethod, CompletedPart, Part, UploadProgress, UploadStatus};
