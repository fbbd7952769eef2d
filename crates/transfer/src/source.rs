use std::future::Future;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::types::ByteRange;
use crate::{DEFAULT_CONTENT_TYPE, TransferError};

/// The object being uploaded.
///
/// Implementations must allow concurrent `read_range` calls; parts are read
/// independently by parallel transfer tasks.
pub trait ByteSource: Send + Sync {
    /// Total size in bytes.
    fn len(&self) -> u64;

    /// Returns `true` for a zero-length object.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Display filename, used for `Content-Disposition` and session creation.
    fn filename(&self) -> &str;

    /// MIME type of the object.
    fn content_type(&self) -> &str;

    /// Reads exactly the bytes in `range`.
    fn read_range(
        &self,
        range: ByteRange,
    ) -> Pin<Box<dyn Future<Output = Result<Bytes, TransferError>> + Send + '_>>;
}

fn check_bounds(range: ByteRange, len: u64) -> Result<(), TransferError> {
    if range.end > len {
        return Err(TransferError::InvalidInput(format!(
            "range {range} exceeds object length {len}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// FileSource
// ---------------------------------------------------------------------------

/// A file on disk, read range-by-range.
///
/// Each read opens its own handle so concurrent parts never share a cursor.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    len: u64,
    filename: String,
    content_type: String,
}

impl FileSource {
    /// Opens `path` and records its current size.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, TransferError> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(TransferError::InvalidInput(format!(
                "not a regular file: {}",
                path.display()
            )));
        }
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            path,
            len: metadata.len(),
            filename,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        })
    }

    /// Overrides the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Overrides the filename reported to the store.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn filename(&self) -> &str {
        &self.filename
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn read_range(
        &self,
        range: ByteRange,
    ) -> Pin<Box<dyn Future<Output = Result<Bytes, TransferError>> + Send + '_>> {
        Box::pin(async move {
            check_bounds(range, self.len)?;
            let mut file = tokio::fs::File::open(&self.path).await?;
            file.seek(SeekFrom::Start(range.start)).await?;
            let mut buf = vec![0u8; range.len() as usize];
            file.read_exact(&mut buf).await?;
            Ok(Bytes::from(buf))
        })
    }
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

/// An object already held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Bytes,
    filename: String,
    content_type: String,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>, filename: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            filename: filename.into(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    /// Overrides the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

impl ByteSource for MemorySource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn filename(&self) -> &str {
        &self.filename
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn read_range(
        &self,
        range: ByteRange,
    ) -> Pin<Box<dyn Future<Output = Result<Bytes, TransferError>> + Send + '_>> {
        Box::pin(async move {
            check_bounds(range, self.len())?;
            Ok(self.data.slice(range.as_index()))
        })
    }
}
