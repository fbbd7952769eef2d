//! Callback bundle and ledger types.

use std::fmt;
use std::sync::Arc;

use signurl_protocol::{Part, UploadStatus};
use signurl_transfer::{ByteRange, PlannedPart, ProgressCallback};

use crate::signer::{SessionAborter, Signer};

/// Observer invoked with the new status after every status change.
pub type StatusCallback = Arc<dyn Fn(UploadStatus) + Send + Sync>;

/// Caller-supplied capabilities for one upload.
#[derive(Clone)]
pub struct UploadCallbacks {
    pub signer: Arc<dyn Signer>,
    pub aborter: Option<Arc<dyn SessionAborter>>,
    pub on_status_change: Option<StatusCallback>,
    pub on_progress: Option<ProgressCallback>,
}

impl UploadCallbacks {
    /// Callbacks with only the mandatory signer.
    pub fn new(signer: Arc<dyn Signer>) -> Self {
        Self {
            signer,
            aborter: None,
            on_status_change: None,
            on_progress: None,
        }
    }

    pub fn with_aborter(mut self, aborter: Arc<dyn SessionAborter>) -> Self {
        self.aborter = Some(aborter);
        self
    }

    pub fn on_status_change(mut self, cb: impl Fn(UploadStatus) + Send + Sync + 'static) -> Self {
        self.on_status_change = Some(Arc::new(cb));
        self
    }

    pub fn on_progress(
        mut self,
        cb: impl Fn(signurl_protocol::UploadProgress) + Send + Sync + 'static,
    ) -> Self {
        self.on_progress = Some(Arc::new(cb));
        self
    }
}

impl fmt::Debug for UploadCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadCallbacks")
            .field("aborter", &self.aborter.is_some())
            .field("on_status_change", &self.on_status_change.is_some())
            .field("on_progress", &self.on_progress.is_some())
            .finish_non_exhaustive()
    }
}

/// A ledger entry: the part and the byte range it was planned for.
///
/// The range is kept so a resume pass can re-read an unconfirmed part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub part: Part,
    pub range: ByteRange,
}

impl LedgerEntry {
    pub fn planned(planned: &PlannedPart) -> Self {
        Self {
            part: Part::unconfirmed(planned.part_number),
            range: planned.range,
        }
    }

    pub fn to_planned(&self) -> PlannedPart {
        PlannedPart {
            part_number: self.part.part_number,
            range: self.range,
        }
    }
}
