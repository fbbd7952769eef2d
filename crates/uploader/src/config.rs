//! Uploader configuration.
//!
//! Usually built in code, but can also be stored as TOML:
//!
//! ```toml
//! chunk_size = 10485760
//! concurrency_limit = 6
//! content_type = "video/mp4"
//! progress_interval_ms = 250
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use signurl_transfer::{DEFAULT_CHUNK_SIZE, validate_chunk_size};

use crate::error::UploadError;

/// Default number of parts transferred at the same time.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 6;

/// Tunables for one [`Uploader`](crate::Uploader).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploaderConfig {
    /// Part size in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Maximum transfers in flight at once.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Overrides the content type reported by the byte source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Minimum spacing between progress callbacks; 0 reports every update.
    #[serde(default)]
    pub progress_interval_ms: u64,
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_concurrency_limit() -> usize {
    DEFAULT_CONCURRENCY_LIMIT
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            concurrency_limit: default_concurrency_limit(),
            content_type: None,
            progress_interval_ms: 0,
        }
    }
}

impl UploaderConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| UploadError::Config(format!("{}: {e}", path.display())))?;
        let config: UploaderConfig = toml::from_str(&content)
            .map_err(|e| UploadError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), UploadError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| UploadError::Config(format!("{}: {e}", parent.display())))?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| UploadError::Config(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| UploadError::Config(format!("{}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Rejects values the orchestrator cannot work with.
    pub fn validate(&self) -> Result<(), UploadError> {
        validate_chunk_size(self.chunk_size)?;
        if self.concurrency_limit == 0 {
            return Err(UploadError::InvalidInput(
                "concurrency limit must be greater than zero".into(),
            ));
        }
        if let Some(ct) = &self.content_type
            && ct.trim().is_empty()
        {
            return Err(UploadError::InvalidInput("empty content type".into()));
        }
        Ok(())
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Progress throttle, `None` when every update is reported.
    pub fn progress_interval(&self) -> Option<Duration> {
        (self.progress_interval_ms > 0).then(|| Duration::from_millis(self.progress_interval_ms))
    }
}
