use std::fmt;
use std::ops::Range;

use crate::TransferError;

/// A half-open byte range `[start, end)` of the source object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Creates a non-empty range.
    pub fn new(start: u64, end: u64) -> Result<Self, TransferError> {
        if end <= start {
            return Err(TransferError::InvalidInput(format!(
                "empty or inverted byte range [{start}, {end})"
            )));
        }
        Ok(Self { start, end })
    }

    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Always `false`; ranges are non-empty by construction.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Returns `true` if `self` ends exactly where `next` starts.
    pub fn is_adjacent_to(&self, next: &ByteRange) -> bool {
        self.end == next.start
    }

    /// The range as a `usize` slice index, for in-memory buffers.
    pub fn as_index(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A part assigned at planning time: 1-based number plus its byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedPart {
    pub part_number: u32,
    pub range: ByteRange,
}
