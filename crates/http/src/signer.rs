//! JSON client for a presigning backend.
//!
//! Every call is a `POST` with a snake_case JSON body to one of the
//! configured endpoint paths.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use signurl_protocol::{
    AbortSessionRequest, CreateSessionRequest, FinalizeSessionRequest, TransferUrlRequest,
};
use signurl_uploader::{CallbackError, SessionAborter, Signer};
use tracing::debug;

use crate::config::HttpSignerConfig;
use crate::error::HttpError;

/// Session id as returned by `create_multipart_upload`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SessionIdResponse {
    Bare(String),
    Wrapped { upload_id: String },
}

/// URL as returned by `generate_presigned_url`.
#[derive(Deserialize)]
#[serde(untagged)]
enum UrlResponse {
    Bare(String),
    List(Vec<String>),
    Wrapped { url: String },
}

/// Signer and session aborter backed by an HTTP presigning service.
pub struct HttpSigner {
    http: reqwest::Client,
    config: HttpSignerConfig,
}

impl HttpSigner {
    /// Builds a client for the configured backend.
    pub fn new(config: HttpSignerConfig) -> Result<Self, HttpError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| HttpError::InvalidHeader("auth_token".into()))?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &HttpSignerConfig {
        &self.config
    }

    async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<Bytes, HttpError> {
        let url = self.config.endpoint(path);
        debug!(url = %url, "signer request");
        let resp = self.http.post(&url).json(body).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HttpError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.bytes().await?)
    }

    /// Opens a multipart session and returns its upload id.
    pub async fn create_multipart_upload(
        &self,
        req: &CreateSessionRequest,
    ) -> Result<String, HttpError> {
        let body = self.post_json(&self.config.create_path, req).await?;
        let id = match serde_json::from_slice::<SessionIdResponse>(&body)? {
            SessionIdResponse::Bare(id) | SessionIdResponse::Wrapped { upload_id: id } => id,
        };
        if id.trim().is_empty() {
            return Err(HttpError::UnexpectedResponse("empty upload id".into()));
        }
        Ok(id)
    }

    /// Requests a presigned transfer URL.
    pub async fn generate_presigned_url(
        &self,
        req: &TransferUrlRequest,
    ) -> Result<String, HttpError> {
        let body = self.post_json(&self.config.presign_path, req).await?;
        match serde_json::from_slice::<UrlResponse>(&body)? {
            UrlResponse::Bare(url) | UrlResponse::Wrapped { url } => Ok(url),
            UrlResponse::List(mut urls) if urls.len() == 1 => Ok(urls.remove(0)),
            UrlResponse::List(urls) => Err(HttpError::UnexpectedResponse(format!(
                "expected one presigned URL, got {}",
                urls.len()
            ))),
        }
    }

    pub async fn complete_multipart_upload(
        &self,
        req: &FinalizeSessionRequest,
    ) -> Result<(), HttpError> {
        self.post_json(&self.config.complete_path, req).await?;
        Ok(())
    }

    pub async fn abort_multipart_upload(&self, req: &AbortSessionRequest) -> Result<(), HttpError> {
        self.post_json(&self.config.abort_path, req).await?;
        Ok(())
    }
}

impl Signer for HttpSigner {
    fn create_session(
        &self,
        req: CreateSessionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, CallbackError>> + Send + '_>> {
        Box::pin(async move {
            self.create_multipart_upload(&req)
                .await
                .map_err(CallbackError::from)
        })
    }

    fn transfer_url(
        &self,
        req: TransferUrlRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, CallbackError>> + Send + '_>> {
        Box::pin(async move {
            self.generate_presigned_url(&req)
                .await
                .map_err(CallbackError::from)
        })
    }

    fn finalize_session(
        &self,
        req: FinalizeSessionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), CallbackError>> + Send + '_>> {
        Box::pin(async move {
            self.complete_multipart_upload(&req)
                .await
                .map_err(CallbackError::from)
        })
    }
}

impl SessionAborter for HttpSigner {
    fn abort_session(
        &self,
        req: AbortSessionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), CallbackError>> + Send + '_>> {
        Box::pin(async move {
            self.abort_multipart_upload(&req)
                .await
                .map_err(CallbackError::from)
        })
    }
}
