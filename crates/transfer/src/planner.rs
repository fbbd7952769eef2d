use crate::types::{ByteRange, PlannedPart};
use crate::TransferError;

/// How an object is sent to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    /// One whole-object `put_object`; no session id.
    SingleShot,
    /// A multipart session with the given number of parts (always >= 2).
    Multipart { part_count: u32 },
}

/// The ordered parts an object is split into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    object_size: u64,
    chunk_size: u64,
    parts: Vec<PlannedPart>,
}

impl ChunkPlan {
    /// Total object size in bytes.
    pub fn object_size(&self) -> u64 {
        self.object_size
    }

    /// Configured part size in bytes.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Planned parts in part-number order.
    pub fn parts(&self) -> &[PlannedPart] {
        &self.parts
    }

    /// Number of planned parts (at least 1).
    pub fn part_count(&self) -> u32 {
        self.parts.len() as u32
    }

    pub fn strategy(&self) -> UploadStrategy {
        if self.parts.len() < 2 {
            UploadStrategy::SingleShot
        } else {
            UploadStrategy::Multipart {
                part_count: self.part_count(),
            }
        }
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self.strategy(), UploadStrategy::Multipart { .. })
    }

    /// Byte range of a part, if the number was planned.
    pub fn range_for(&self, part_number: u32) -> Option<ByteRange> {
        let index = (part_number as usize).checked_sub(1)?;
        self.parts.get(index).map(|p| p.range)
    }
}

/// Splits `object_size` bytes into `chunk_size` ranges.
///
/// Every range is `chunk_size` long except the last, which holds the
/// remainder. Part numbers start at 1.
pub fn plan_chunks(object_size: u64, chunk_size: u64) -> Result<ChunkPlan, TransferError> {
    if object_size == 0 {
        return Err(TransferError::InvalidInput(
            "cannot upload a zero-length object".into(),
        ));
    }
    crate::validate_chunk_size(chunk_size)?;

    let part_count = object_size.div_ceil(chunk_size).max(1);
    if u32::try_from(part_count).is_err() {
        return Err(TransferError::InvalidInput(format!(
            "{part_count} parts cannot be numbered"
        )));
    }

    let mut parts = Vec::with_capacity(part_count as usize);
    let mut start = 0u64;
    let mut part_number = 1u32;
    while start < object_size {
        let end = (start + chunk_size).min(object_size);
        parts.push(PlannedPart {
            part_number,
            range: ByteRange::new(start, end)?,
        });
        start = end;
        part_number += 1;
    }

    Ok(ChunkPlan {
        object_size,
        chunk_size,
        parts,
    })
}
