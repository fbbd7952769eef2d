//! Bounded-concurrency part dispatch.
//!
//! Each planned part goes through two steps, get a presigned URL from the
//! signer and then hand the range to the transfer worker. A slot from the
//! scheduler's semaphore is taken before the URL is requested and held
//! until the transfer settles, so no more than `concurrency_limit`
//! transfers are ever in flight.

use std::collections::BTreeMap;
use std::sync::Arc;

use signurl_protocol::{Part, TransferUrlRequest};
use signurl_transfer::{ByteSource, PlannedPart, ProgressTracker, TransferError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::UploadError;
use crate::signer::{Signer, request_transfer_url};
use crate::worker::{TransferRequest, TransferWorker};

/// Identifies the multipart session parts are uploaded into.
#[derive(Debug, Clone)]
pub struct SessionTarget {
    pub bucket: String,
    pub key: String,
    pub session_id: String,
    pub content_type: String,
}

/// Dispatches one transfer per part with a bounded number in flight.
///
/// One scheduler serves one pass; its slot pool is dropped with it.
pub struct PartScheduler {
    signer: Arc<dyn Signer>,
    worker: Arc<dyn TransferWorker>,
    source: Arc<dyn ByteSource>,
    progress: Arc<ProgressTracker>,
    cancel: CancellationToken,
    slots: Arc<Semaphore>,
    limit: usize,
}

impl PartScheduler {
    pub fn new(
        signer: Arc<dyn Signer>,
        worker: Arc<dyn TransferWorker>,
        source: Arc<dyn ByteSource>,
        progress: Arc<ProgressTracker>,
        cancel: CancellationToken,
        concurrency_limit: usize,
    ) -> Self {
        let limit = concurrency_limit.max(1);
        Self {
            signer,
            worker,
            source,
            progress,
            cancel,
            slots: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Number of transfers currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.limit - self.slots.available_permits()
    }

    /// Uploads `parts` and returns one result per input part, in input
    /// order, each keyed by its original part number.
    ///
    /// Per-part failures never escape: a part whose URL could not be
    /// obtained, whose transfer failed, or that was cancelled comes back
    /// without a tag.
    pub async fn run(&self, target: SessionTarget, parts: Vec<PlannedPart>) -> Vec<Part> {
        let target = Arc::new(target);
        let numbers: Vec<u32> = parts.iter().map(|p| p.part_number).collect();
        let mut tasks: JoinSet<Part> = JoinSet::new();

        for planned in parts {
            if self.cancel.is_cancelled() {
                break;
            }
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                permit = Arc::clone(&self.slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let task = PartTask {
                signer: Arc::clone(&self.signer),
                worker: Arc::clone(&self.worker),
                source: Arc::clone(&self.source),
                progress: Arc::clone(&self.progress),
                cancel: self.cancel.clone(),
                target: Arc::clone(&target),
            };
            tasks.spawn(async move {
                let _permit = permit;
                task.run(planned).await
            });
        }

        let mut results: BTreeMap<u32, Part> = BTreeMap::new();
        let mut cancelled = false;
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled(), if !cancelled => {
                    debug!(pending = tasks.len(), "cancelling in-flight transfers");
                    tasks.abort_all();
                    cancelled = true;
                }
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok(part)) => {
                        results.insert(part.part_number, part);
                    }
                    Some(Err(e)) if e.is_panic() => {
                        warn!(error = %e, "transfer task panicked");
                    }
                    Some(Err(_)) => {}
                },
            }
        }

        numbers
            .into_iter()
            .map(|n| {
                results.remove(&n).unwrap_or_else(|| {
                    self.progress.reset_part(n);
                    Part::unconfirmed(n)
                })
            })
            .collect()
    }
}

struct PartTask {
    signer: Arc<dyn Signer>,
    worker: Arc<dyn TransferWorker>,
    source: Arc<dyn ByteSource>,
    progress: Arc<ProgressTracker>,
    cancel: CancellationToken,
    target: Arc<SessionTarget>,
}

impl PartTask {
    async fn run(self, planned: PlannedPart) -> Part {
        let part_number = planned.part_number;
        match self.transfer(planned).await {
            Ok(tag) => {
                debug!(part_number, %tag, "part confirmed");
                Part::confirmed(part_number, tag)
            }
            Err(e) => {
                warn!(part_number, error = %e, "part not confirmed");
                self.progress.reset_part(part_number);
                Part::unconfirmed(part_number)
            }
        }
    }

    async fn transfer(&self, planned: PlannedPart) -> Result<String, UploadError> {
        let req = TransferUrlRequest::upload_part(
            &self.target.bucket,
            &self.target.key,
            &self.target.session_id,
            planned.part_number,
        );
        let url = request_transfer_url(self.signer.as_ref(), req).await?;

        if self.cancel.is_cancelled() {
            return Err(TransferError::Cancelled.into());
        }
        debug!(part_number = planned.part_number, range = %planned.range, "dispatching part");

        let tag = self
            .worker
            .transfer(TransferRequest {
                url,
                part_number: Some(planned.part_number),
                range: planned.range,
                source: Arc::clone(&self.source),
                content_type: self.target.content_type.clone(),
                progress: self.progress.part(planned.part_number),
                cancel: self.cancel.clone(),
            })
            .await?;
        if tag.trim().is_empty() {
            return Err(TransferError::MissingTag.into());
        }
        Ok(tag)
    }
}
