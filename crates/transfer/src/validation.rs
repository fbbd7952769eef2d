use tracing::warn;

use crate::{MIN_PART_SIZE, TransferError};

/// Longest object key most stores accept, in bytes.
const MAX_KEY_LEN: usize = 1024;

/// Validates a configured part size.
///
/// Zero is rejected. Sizes below [`MIN_PART_SIZE`] are accepted with a
/// warning.
pub fn validate_chunk_size(chunk_size: u64) -> Result<(), TransferError> {
    if chunk_size == 0 {
        return Err(TransferError::InvalidInput(
            "chunk size must be greater than zero".into(),
        ));
    }
    if chunk_size < MIN_PART_SIZE {
        warn!(
            chunk_size,
            min = MIN_PART_SIZE,
            "chunk size below the usual store minimum"
        );
    }
    Ok(())
}

/// Validates the bucket and object key an upload targets.
///
/// Rejects:
/// - Empty bucket names or keys
/// - Keys longer than 1024 bytes
/// - Control characters in either
pub fn validate_upload_target(bucket: &str, key: &str) -> Result<(), TransferError> {
    if bucket.is_empty() {
        return Err(TransferError::InvalidInput("empty bucket name".into()));
    }
    if key.is_empty() {
        return Err(TransferError::InvalidInput("empty object key".into()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(TransferError::InvalidInput(format!(
            "object key is {} bytes, limit is {MAX_KEY_LEN}",
            key.len()
        )));
    }
    if bucket.chars().any(char::is_control) {
        return Err(TransferError::InvalidInput(format!(
            "control character in bucket name: {bucket:?}"
        )));
    }
    if key.chars().any(char::is_control) {
        return Err(TransferError::InvalidInput(format!(
            "control character in object key: {key:?}"
        )));
    }
    Ok(())
}
