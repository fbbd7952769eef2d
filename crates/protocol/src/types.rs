use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UploadStatus {
    Ready,
    Uploading,
    Resumable,
    Success,
    Failed,
    Aborted,
}

impl UploadStatus {
    /// Returns `true` for statuses that never change again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            UploadStatus::Success | UploadStatus::Failed | UploadStatus::Aborted
        )
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UploadStatus::Ready => "Ready",
            UploadStatus::Uploading => "Uploading",
            UploadStatus::Resumable => "Resumable",
            UploadStatus::Success => "Success",
            UploadStatus::Failed => "Failed",
            UploadStatus::Aborted => "Aborted",
        };
        f.write_str(s)
    }
}

/// Storage operation a transfer URL is signed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMethod {
    #[serde(rename = "put_object")]
    PutObject,
    #[serde(rename = "upload_part")]
    UploadPart,
}

impl ClientMethod {
    /// Returns the wire name used by presigning backends.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientMethod::PutObject => "put_object",
            ClientMethod::UploadPart => "upload_part",
        }
    }
}

/// One entry of the part ledger.
///
/// `tag` is `None` until the remote store has confirmed the part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub part_number: u32,
    #[serde(rename = "etag", default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl Part {
    /// A part that has not been confirmed (yet).
    pub fn unconfirmed(part_number: u32) -> Self {
        Self {
            part_number,
            tag: None,
        }
    }

    /// A part confirmed with the given tag.
    pub fn confirmed(part_number: u32, tag: impl Into<String>) -> Self {
        Self {
            part_number,
            tag: Some(tag.into()),
        }
    }

    /// Returns `true` if the remote store confirmed this part.
    pub fn is_confirmed(&self) -> bool {
        self.tag.is_some()
    }

    /// Converts into a [`CompletedPart`] if confirmed.
    pub fn completed(&self) -> Option<CompletedPart> {
        self.tag.as_ref().map(|tag| CompletedPart {
            part_number: self.part_number,
            etag: tag.clone(),
        })
    }
}

/// A confirmed part as sent to the finalize callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    pub part_number: u32,
    pub etag: String,
}

/// Byte-level progress of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: u64,
    #[serde(default)]
    pub bytes_per_second: f64,
}

impl UploadProgress {
    /// Returns the upload progress as a percentage (0-100).
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.loaded as f64 / self.total as f64 * 100.0
    }

    /// Returns `true` once every byte has been loaded.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.loaded >= self.total
    }
}
