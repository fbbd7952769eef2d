use serde::{Deserialize, Serialize};

use crate::types::{ClientMethod, CompletedPart};

// ---------------------------------------------------------------------------
// Signing authority payloads
// ---------------------------------------------------------------------------

/// Opens a multipart session for an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub filename: String,
}

/// Asks for a presigned transfer URL.
///
/// `upload_id` and `part_number` are set for `upload_part` and absent for a
/// whole-object `put_object`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferUrlRequest {
    pub bucket: String,
    pub key: String,
    pub client_method: ClientMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_number: Option<u32>,
}

impl TransferUrlRequest {
    /// Request for a single-shot whole-object URL.
    pub fn put_object(bucket: &str, key: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            client_method: ClientMethod::PutObject,
            upload_id: None,
            part_number: None,
        }
    }

    /// Request for one part of a multipart session.
    pub fn upload_part(bucket: &str, key: &str, upload_id: &str, part_number: u32) -> Self {
        Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            client_method: ClientMethod::UploadPart,
            upload_id: Some(upload_id.to_string()),
            part_number: Some(part_number),
        }
    }
}

/// Assembles the object from its confirmed parts.
///
/// `parts` is always sorted ascending by part number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeSessionRequest {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
    pub parts: Vec<CompletedPart>,
}

/// Discards a multipart session and its stored parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbortSessionRequest {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
}
