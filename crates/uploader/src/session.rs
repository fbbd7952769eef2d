//! Upload session: identity, part ledger and status.
//!
//! The session is the single source of truth for an upload. Only the
//! orchestrating flow mutates it; transfer tasks hand their results back to
//! the scheduler, which returns them to the orchestrator for recording.

use std::sync::{Mutex, MutexGuard, PoisonError};

use signurl_protocol::{
    AbortSessionRequest, CompletedPart, FinalizeSessionRequest, Part, UploadStatus,
};
use signurl_transfer::{ChunkPlan, PlannedPart};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::UploadError;
use crate::types::{LedgerEntry, StatusCallback};

// ---------------------------------------------------------------------------
// StatusMachine
// ---------------------------------------------------------------------------

/// Enforces legal status transitions and fans changes out to observers.
pub struct StatusMachine {
    status: UploadStatus,
    observer: Option<StatusCallback>,
    watch_tx: watch::Sender<UploadStatus>,
}

/// A status change that still has to be delivered to the observer.
///
/// Produced under the session lock, delivered after it is released so the
/// observer may call back into the uploader.
#[must_use = "a status notice does nothing until delivered"]
pub struct StatusNotice {
    observer: Option<StatusCallback>,
    status: UploadStatus,
}

impl StatusNotice {
    pub fn deliver(self) {
        if let Some(cb) = self.observer {
            cb(self.status);
        }
    }
}

impl StatusMachine {
    pub fn new(observer: Option<StatusCallback>) -> Self {
        let (watch_tx, _) = watch::channel(UploadStatus::Ready);
        Self {
            status: UploadStatus::Ready,
            observer,
            watch_tx,
        }
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    /// Returns a receiver that always holds the latest status.
    pub fn subscribe(&self) -> watch::Receiver<UploadStatus> {
        self.watch_tx.subscribe()
    }

    /// Returns `true` if `from -> to` is an allowed transition.
    ///
    /// `Resumable -> Resumable` is allowed (a resume pass that still leaves
    /// parts outstanding) but is not a change.
    pub fn is_legal(from: UploadStatus, to: UploadStatus) -> bool {
        use UploadStatus::*;
        matches!(
            (from, to),
            (Ready, Uploading | Success | Failed)
                | (Uploading, Success | Failed | Resumable)
                | (Resumable, Success | Failed | Resumable)
                | (Ready | Uploading | Resumable, Aborted)
        )
    }

    /// Moves to `to`, returning a notice if the status actually changed.
    pub fn transition(&mut self, to: UploadStatus) -> Result<Option<StatusNotice>, UploadError> {
        let from = self.status;
        if !Self::is_legal(from, to) {
            return Err(UploadError::IllegalState(format!(
                "cannot move from {from} to {to}"
            )));
        }
        if from == to {
            return Ok(None);
        }
        self.status = to;
        self.watch_tx.send_replace(to);
        debug!(%from, %to, "status changed");
        Ok(Some(StatusNotice {
            observer: self.observer.clone(),
            status: to,
        }))
    }
}

// ---------------------------------------------------------------------------
// UploadSession
// ---------------------------------------------------------------------------

/// State of one upload attempt.
pub struct UploadSession {
    bucket: String,
    key: String,
    concurrency_limit: usize,
    inner: Mutex<SessionInner>,
}

struct SessionInner {
    session_id: Option<String>,
    ledger: Vec<LedgerEntry>,
    machine: StatusMachine,
    finalize_attempted: bool,
    pass_active: bool,
}

/// Marks a scheduling pass as running until dropped.
pub struct PassGuard<'a> {
    session: &'a UploadSession,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.session.lock().pass_active = false;
    }
}

impl UploadSession {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        concurrency_limit: usize,
        observer: Option<StatusCallback>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            concurrency_limit,
            inner: Mutex::new(SessionInner {
                session_id: None,
                ledger: Vec::new(),
                machine: StatusMachine::new(observer),
                finalize_attempted: false,
                pass_active: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub fn status(&self) -> UploadStatus {
        self.lock().machine.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadStatus> {
        self.lock().machine.subscribe()
    }

    pub fn is_aborted(&self) -> bool {
        self.status() == UploadStatus::Aborted
    }

    /// Multipart session id; `None` for single-shot uploads.
    pub fn session_id(&self) -> Option<String> {
        self.lock().session_id.clone()
    }

    /// Snapshot of the part ledger in part-number order.
    pub fn parts(&self) -> Vec<Part> {
        self.lock().ledger.iter().map(|e| e.part.clone()).collect()
    }

    /// Number of parts the object was planned into.
    pub fn expected_parts(&self) -> usize {
        self.lock().ledger.len()
    }

    /// Parts without a confirmation tag, with their planned ranges.
    pub fn outstanding(&self) -> Vec<PlannedPart> {
        self.lock()
            .ledger
            .iter()
            .filter(|e| !e.part.is_confirmed())
            .map(LedgerEntry::to_planned)
            .collect()
    }

    /// Starts a scheduling pass; only one may run at a time.
    pub fn begin_pass(&self) -> Result<PassGuard<'_>, UploadError> {
        let mut inner = self.lock();
        if inner.pass_active {
            return Err(UploadError::IllegalState(
                "an upload pass is already running".into(),
            ));
        }
        inner.pass_active = true;
        Ok(PassGuard { session: self })
    }

    /// Seeds the ledger from a chunk plan. Only legal once, from `Ready`.
    pub fn plan(&self, plan: &ChunkPlan) -> Result<(), UploadError> {
        let mut inner = self.lock();
        if inner.machine.status() != UploadStatus::Ready || !inner.ledger.is_empty() {
            return Err(UploadError::IllegalState("upload already planned".into()));
        }
        inner.ledger = plan.parts().iter().map(LedgerEntry::planned).collect();
        Ok(())
    }

    /// Records the id of the multipart session opened for this upload.
    pub fn attach_session_id(&self, session_id: String) -> Result<(), UploadError> {
        let mut inner = self.lock();
        if inner.session_id.is_some() {
            return Err(UploadError::IllegalState(
                "multipart session already open".into(),
            ));
        }
        inner.session_id = Some(session_id);
        Ok(())
    }

    /// Moves to `to` and notifies the observer after releasing the lock.
    pub fn transition(&self, to: UploadStatus) -> Result<(), UploadError> {
        let notice = self.lock().machine.transition(to)?;
        if let Some(notice) = notice {
            notice.deliver();
        }
        Ok(())
    }

    /// Like [`transition`](Self::transition), but an aborted session stays
    /// aborted. Returns the resulting status.
    pub fn settle(&self, to: UploadStatus) -> Result<UploadStatus, UploadError> {
        let notice = {
            let mut inner = self.lock();
            if inner.machine.status() == UploadStatus::Aborted {
                return Ok(UploadStatus::Aborted);
            }
            inner.machine.transition(to)?
        };
        if let Some(notice) = notice {
            notice.deliver();
        }
        Ok(to)
    }

    /// Merges a pass's results into the ledger.
    ///
    /// Returns `false` (and records nothing) once the session is aborted.
    /// Confirmed entries are never downgraded.
    pub fn record(&self, results: Vec<Part>) -> bool {
        let mut inner = self.lock();
        if inner.machine.status() == UploadStatus::Aborted {
            return false;
        }
        for result in results {
            let Some(entry) = inner
                .ledger
                .iter_mut()
                .find(|e| e.part.part_number == result.part_number)
            else {
                warn!(
                    part_number = result.part_number,
                    "result for unplanned part ignored"
                );
                continue;
            };
            if !entry.part.is_confirmed() {
                entry.part.tag = result.tag;
            }
        }
        true
    }

    /// Claims the single finalize attempt and builds its request.
    ///
    /// Returns `None` when the session was aborted; finalize must then never
    /// be called.
    pub fn begin_finalize(&self) -> Result<Option<FinalizeSessionRequest>, UploadError> {
        let mut inner = self.lock();
        if inner.machine.status() == UploadStatus::Aborted {
            return Ok(None);
        }
        if inner.finalize_attempted {
            return Err(UploadError::IllegalState(
                "finalize already attempted".into(),
            ));
        }
        let upload_id = inner.session_id.clone().ok_or_else(|| {
            UploadError::IllegalState("no multipart session to finalize".into())
        })?;

        let mut parts: Vec<CompletedPart> =
            inner.ledger.iter().filter_map(|e| e.part.completed()).collect();
        if parts.len() != inner.ledger.len() {
            return Err(UploadError::IllegalState(
                "cannot finalize with unconfirmed parts".into(),
            ));
        }
        parts.sort_by_key(|p| p.part_number);
        inner.finalize_attempted = true;

        Ok(Some(FinalizeSessionRequest {
            bucket: self.bucket.clone(),
            key: self.key.clone(),
            upload_id,
            parts,
        }))
    }

    /// Moves to `Aborted` and builds the abort callback request.
    ///
    /// Requires an open multipart session and a non-terminal status. Once
    /// finalize has been claimed the upload is committed and abort is refused.
    pub fn begin_abort(&self) -> Result<AbortSessionRequest, UploadError> {
        let (req, notice) = {
            let mut inner = self.lock();
            let status = inner.machine.status();
            if status.is_terminal() {
                return Err(UploadError::IllegalState(format!(
                    "cannot abort a finished upload ({status})"
                )));
            }
            if inner.finalize_attempted {
                return Err(UploadError::IllegalState("finalize in progress".into()));
            }
            let upload_id = inner.session_id.clone().ok_or_else(|| {
                UploadError::IllegalState("no multipart session to abort".into())
            })?;
            let notice = inner.machine.transition(UploadStatus::Aborted)?;
            let req = AbortSessionRequest {
                bucket: self.bucket.clone(),
                key: self.key.clone(),
                upload_id,
            };
            (req, notice)
        };
        if let Some(notice) = notice {
            notice.deliver();
        }
        Ok(req)
    }
}
