//! Decides what a finished scheduling pass means for the session.

use signurl_protocol::{Part, UploadStatus};
use tracing::{debug, error, info};

use crate::error::UploadError;
use crate::session::UploadSession;
use crate::signer::Signer;

/// Outcome of inspecting the part ledger after a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assessment {
    /// Every planned part is confirmed; the session can be finalized.
    Complete,
    /// Some parts still lack a tag.
    Incomplete { unconfirmed: Vec<u32> },
}

/// Splits `parts` into confirmed and unconfirmed and checks the count.
pub fn assess(parts: &[Part], expected: usize) -> Assessment {
    let (confirmed, unconfirmed): (Vec<&Part>, Vec<&Part>) =
        parts.iter().partition(|p| p.is_confirmed());
    if unconfirmed.is_empty() && confirmed.len() == expected {
        Assessment::Complete
    } else {
        Assessment::Incomplete {
            unconfirmed: unconfirmed.iter().map(|p| p.part_number).collect(),
        }
    }
}

/// Records a pass's results and settles the session status.
pub struct CompletionCoordinator<'a> {
    session: &'a UploadSession,
    signer: &'a dyn Signer,
}

impl<'a> CompletionCoordinator<'a> {
    pub fn new(session: &'a UploadSession, signer: &'a dyn Signer) -> Self {
        Self { session, signer }
    }

    /// Merges `results` into the ledger and finalizes, marks resumable or
    /// fails.
    ///
    /// Results arriving after an abort are discarded and `Aborted` is
    /// returned; finalize is never called for an aborted session. Once
    /// finalize is claimed abort is refused, so its outcome decides the
    /// final status.
    pub async fn complete(&self, results: Vec<Part>) -> Result<UploadStatus, UploadError> {
        if results.is_empty() {
            if self.session.settle(UploadStatus::Failed)? == UploadStatus::Aborted {
                return Ok(UploadStatus::Aborted);
            }
            error!(key = %self.session.key(), "no parts were dispatched");
            return Err(UploadError::NothingDispatched);
        }

        if !self.session.record(results) {
            debug!(key = %self.session.key(), "discarding results of aborted upload");
            return Ok(UploadStatus::Aborted);
        }

        let parts = self.session.parts();
        let expected = self.session.expected_parts();
        if let Assessment::Incomplete { unconfirmed } = assess(&parts, expected) {
            info!(
                key = %self.session.key(),
                confirmed = parts.len() - unconfirmed.len(),
                unconfirmed = ?unconfirmed,
                "upload incomplete, resumable"
            );
            return self.session.settle(UploadStatus::Resumable);
        }

        let Some(req) = self.session.begin_finalize()? else {
            return Ok(UploadStatus::Aborted);
        };
        let upload_id = req.upload_id.clone();
        let part_count = req.parts.len();

        match self.signer.finalize_session(req).await {
            Ok(()) => {
                info!(
                    key = %self.session.key(),
                    session_id = %upload_id,
                    parts = part_count,
                    "multipart upload finalized"
                );
                self.session.settle(UploadStatus::Success)
            }
            Err(e) => {
                error!(
                    key = %self.session.key(),
                    session_id = %upload_id,
                    error = %e,
                    "finalize failed"
                );
                self.session.settle(UploadStatus::Failed)?;
                Err(UploadError::Finalize(e))
            }
        }
    }
}
