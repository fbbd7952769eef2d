//! Presigning backend configuration.
//!
//! Stored as a `[signer]` table in TOML:
//!
//! ```toml
//! [signer]
//! base_url = "https://uploads.example.com/api"
//! auth_token = "secret"
//! timeout_secs = 15
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::HttpError;

/// Where the presigning backend lives and how to call it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSignerConfig {
    /// Backend root, endpoint paths are appended to it.
    pub base_url: String,

    /// Sent as `Authorization: Bearer <token>` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    #[serde(default = "default_create_path")]
    pub create_path: String,

    #[serde(default = "default_presign_path")]
    pub presign_path: String,

    #[serde(default = "default_complete_path")]
    pub complete_path: String,

    #[serde(default = "default_abort_path")]
    pub abort_path: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_create_path() -> String {
    "/create_multipart_upload".into()
}

fn default_presign_path() -> String {
    "/generate_presigned_url".into()
}

fn default_complete_path() -> String {
    "/complete_multipart_upload".into()
}

fn default_abort_path() -> String {
    "/abort_multipart_upload".into()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Deserialize)]
struct ConfigFile {
    signer: HttpSignerConfig,
}

impl HttpSignerConfig {
    /// Config with default endpoint paths under `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            create_path: default_create_path(),
            presign_path: default_presign_path(),
            complete_path: default_complete_path(),
            abort_path: default_abort_path(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Reads the `[signer]` table of a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HttpError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| HttpError::Config(format!("{}: {e}", path.display())))?;
        let file: ConfigFile = toml::from_str(&content)
            .map_err(|e| HttpError::Config(format!("{}: {e}", path.display())))?;
        file.signer.validate()?;
        Ok(file.signer)
    }

    pub fn validate(&self) -> Result<(), HttpError> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| HttpError::Config(format!("invalid base_url {:?}: {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(HttpError::Config(format!(
                "base_url must be http(s): {}",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(HttpError::Config("timeout_secs must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full URL of an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
