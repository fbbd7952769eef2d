//! Upload facade: plans the object, drives the single-shot or multipart
//! path and exposes resume and abort.

use std::sync::{Arc, OnceLock};

use signurl_protocol::{
    CreateSessionRequest, Part, TransferUrlRequest, UploadProgress, UploadStatus,
};
use signurl_transfer::{
    ByteRange, ByteSource, ChunkPlan, DEFAULT_CONTENT_TYPE, PlannedPart, ProgressTracker,
    TransferError, UploadStrategy, plan_chunks, validate_upload_target,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::abort::AbortCoordinator;
use crate::completion::CompletionCoordinator;
use crate::config::UploaderConfig;
use crate::error::{CallbackError, UploadError};
use crate::scheduler::{PartScheduler, SessionTarget};
use crate::session::UploadSession;
use crate::signer::request_transfer_url;
use crate::types::UploadCallbacks;
use crate::worker::{TransferRequest, TransferWorker};

/// Uploads one object to one bucket/key.
///
/// Share it behind an `Arc` to call [`abort`](Self::abort) while
/// [`upload`](Self::upload) or [`resume`](Self::resume) is running.
pub struct Uploader {
    config: UploaderConfig,
    callbacks: UploadCallbacks,
    worker: Arc<dyn TransferWorker>,
    session: UploadSession,
    cancel: CancellationToken,
    run: OnceLock<RunState>,
}

/// Per-object state fixed when `upload` starts and reused by `resume`.
struct RunState {
    source: Arc<dyn ByteSource>,
    content_type: String,
    progress: Arc<ProgressTracker>,
}

impl Uploader {
    /// Creates an uploader after validating the target and configuration.
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        config: UploaderConfig,
        callbacks: UploadCallbacks,
        worker: Arc<dyn TransferWorker>,
    ) -> Result<Self, UploadError> {
        let bucket = bucket.into();
        let key = key.into();
        validate_upload_target(&bucket, &key)?;
        config.validate()?;

        let session = UploadSession::new(
            bucket,
            key,
            config.concurrency_limit,
            callbacks.on_status_change.clone(),
        );
        Ok(Self {
            config,
            callbacks,
            worker,
            session,
            cancel: CancellationToken::new(),
            run: OnceLock::new(),
        })
    }

    pub fn bucket(&self) -> &str {
        self.session.bucket()
    }

    pub fn key(&self) -> &str {
        self.session.key()
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    pub fn status(&self) -> UploadStatus {
        self.session.status()
    }

    /// Returns a receiver that tracks every status change.
    pub fn subscribe(&self) -> watch::Receiver<UploadStatus> {
        self.session.subscribe()
    }

    /// Multipart session id, once one has been opened.
    pub fn session_id(&self) -> Option<String> {
        self.session.session_id()
    }

    /// Snapshot of the part ledger.
    pub fn parts(&self) -> Vec<Part> {
        self.session.parts()
    }

    /// Parts a `resume` would re-dispatch.
    pub fn outstanding_parts(&self) -> Vec<PlannedPart> {
        self.session.outstanding()
    }

    /// Current byte progress; `None` before `upload` starts.
    pub fn progress(&self) -> Option<UploadProgress> {
        self.run.get().map(|run| run.progress.snapshot())
    }

    /// Returns the token that cancels this upload's in-flight transfers.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Uploads `source`.
    ///
    /// Returns `Success`, `Resumable` (some parts unconfirmed, call
    /// [`resume`](Self::resume)) or `Aborted`. Errors leave the upload
    /// `Failed`, except invalid input, which is rejected before anything is
    /// sent and leaves it `Ready`.
    pub async fn upload(
        &self,
        source: Arc<dyn ByteSource>,
    ) -> Result<UploadStatus, UploadError> {
        let _pass = self.session.begin_pass()?;
        let status = self.status();
        if status != UploadStatus::Ready || self.run.get().is_some() {
            return Err(UploadError::IllegalState(format!(
                "upload already started ({status})"
            )));
        }

        let plan = plan_chunks(source.len(), self.config.chunk_size)?;
        let content_type = self.content_type_for(source.as_ref());
        let run = self.run.get_or_init(|| RunState {
            progress: Arc::new(ProgressTracker::new(
                plan.object_size(),
                self.callbacks.on_progress.clone(),
                self.config.progress_interval(),
            )),
            source,
            content_type,
        });
        self.session.plan(&plan)?;

        info!(
            bucket = %self.bucket(),
            key = %self.key(),
            size = plan.object_size(),
            parts = plan.part_count(),
            "starting upload"
        );

        match plan.strategy() {
            UploadStrategy::SingleShot => self.upload_whole(run, &plan).await,
            UploadStrategy::Multipart { .. } => self.upload_multipart(run, &plan).await,
        }
    }

    /// Re-dispatches the parts that are still unconfirmed.
    ///
    /// Only legal from `Resumable`.
    pub async fn resume(&self) -> Result<UploadStatus, UploadError> {
        let _pass = self.session.begin_pass()?;
        let status = self.status();
        if status != UploadStatus::Resumable {
            return Err(UploadError::IllegalState(format!(
                "resume requires a resumable upload, status is {status}"
            )));
        }
        let run = self
            .run
            .get()
            .ok_or_else(|| UploadError::IllegalState("no upload to resume".into()))?;

        let outstanding = self.session.outstanding();
        info!(
            key = %self.key(),
            parts = outstanding.len(),
            "resuming upload"
        );
        self.dispatch(run, outstanding).await
    }

    /// Aborts a multipart upload in progress.
    ///
    /// Needs an abort callback and an open multipart session, and is refused
    /// once finalize has started. Once marked `Aborted` the upload stays
    /// aborted, even if the callback then fails.
    pub async fn abort(&self) -> Result<(), UploadError> {
        AbortCoordinator::new(
            &self.session,
            self.callbacks.aborter.as_deref(),
            &self.cancel,
        )
        .abort()
        .await
    }

    fn content_type_for(&self, source: &dyn ByteSource) -> String {
        self.config
            .content_type
            .as_deref()
            .or_else(|| Some(source.content_type()).filter(|ct| !ct.is_empty()))
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string()
    }

    async fn upload_whole(
        &self,
        run: &RunState,
        plan: &ChunkPlan,
    ) -> Result<UploadStatus, UploadError> {
        let range = ByteRange::new(0, plan.object_size())?;
        match self.transfer_whole(run, range).await {
            Ok(tag) => {
                self.session.record(vec![Part::confirmed(1, tag)]);
                info!(key = %self.key(), size = range.len(), "object uploaded");
                self.session.settle(UploadStatus::Success)
            }
            Err(e) => {
                run.progress.reset_part(1);
                error!(key = %self.key(), error = %e, "upload failed");
                self.session.settle(UploadStatus::Failed)?;
                Err(e)
            }
        }
    }

    async fn transfer_whole(
        &self,
        run: &RunState,
        range: ByteRange,
    ) -> Result<String, UploadError> {
        let req = TransferUrlRequest::put_object(self.bucket(), self.key());
        let url = request_transfer_url(self.callbacks.signer.as_ref(), req).await?;
        let tag = self
            .worker
            .transfer(TransferRequest {
                url,
                part_number: None,
                range,
                source: Arc::clone(&run.source),
                content_type: run.content_type.clone(),
                progress: run.progress.part(1),
                cancel: self.cancel.clone(),
            })
            .await?;
        if tag.trim().is_empty() {
            return Err(TransferError::MissingTag.into());
        }
        Ok(tag)
    }

    async fn upload_multipart(
        &self,
        run: &RunState,
        plan: &ChunkPlan,
    ) -> Result<UploadStatus, UploadError> {
        self.session.transition(UploadStatus::Uploading)?;

        let req = CreateSessionRequest {
            bucket: self.bucket().to_string(),
            key: self.key().to_string(),
            content_type: run.content_type.clone(),
            filename: run.source.filename().to_string(),
        };
        let session_id = match self.callbacks.signer.create_session(req).await {
            Ok(id) if !id.trim().is_empty() => id,
            Ok(_) => return self.fail_session_create(CallbackError::from("empty session id")),
            Err(e) => return self.fail_session_create(e),
        };
        info!(
            key = %self.key(),
            session_id = %session_id,
            parts = plan.part_count(),
            "multipart session created"
        );
        self.session.attach_session_id(session_id)?;

        self.dispatch(run, plan.parts().to_vec()).await
    }

    fn fail_session_create(&self, e: CallbackError) -> Result<UploadStatus, UploadError> {
        error!(key = %self.key(), error = %e, "could not create multipart session");
        self.session.settle(UploadStatus::Failed)?;
        Err(UploadError::SessionCreate(e))
    }

    /// Runs one scheduling pass over `parts` and settles the outcome.
    async fn dispatch(
        &self,
        run: &RunState,
        parts: Vec<PlannedPart>,
    ) -> Result<UploadStatus, UploadError> {
        let session_id = self
            .session
            .session_id()
            .ok_or_else(|| UploadError::IllegalState("no multipart session".into()))?;
        let target = SessionTarget {
            bucket: self.bucket().to_string(),
            key: self.key().to_string(),
            session_id,
            content_type: run.content_type.clone(),
        };
        let scheduler = PartScheduler::new(
            Arc::clone(&self.callbacks.signer),
            Arc::clone(&self.worker),
            Arc::clone(&run.source),
            Arc::clone(&run.progress),
            self.cancel.clone(),
            self.session.concurrency_limit(),
        );

        let results = scheduler.run(target, parts).await;
        CompletionCoordinator::new(&self.session, self.callbacks.signer.as_ref())
            .complete(results)
            .await
    }
}
