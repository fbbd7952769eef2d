//! Mock signing and transfer collaborators shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use signurl_protocol::{
    AbortSessionRequest, ClientMethod, CreateSessionRequest, FinalizeSessionRequest,
    TransferUrlRequest,
};
use signurl_transfer::{ByteRange, TransferError};

use crate::error::CallbackError;
use crate::signer::{SessionAborter, Signer};
use crate::worker::{TransferRequest, TransferWorker};

/// Mock signing authority that records every call.
#[derive(Default)]
pub struct MockSigner {
    pub fail_create: AtomicBool,
    pub fail_finalize: AtomicBool,
    /// Time the finalize call takes before answering.
    pub finalize_delay: Mutex<Duration>,
    pub bad_url_parts: Mutex<HashSet<u32>>,
    pub created: Mutex<Vec<CreateSessionRequest>>,
    pub url_requests: Mutex<Vec<TransferUrlRequest>>,
    pub finalized: Mutex<Vec<FinalizeSessionRequest>>,
}

impl MockSigner {
    pub fn finalize_count(&self) -> usize {
        self.finalized.lock().unwrap().len()
    }

    pub fn url_parts(&self) -> Vec<Option<u32>> {
        self.url_requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.part_number)
            .collect()
    }
}

impl Signer for MockSigner {
    fn create_session(
        &self,
        req: CreateSessionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, CallbackError>> + Send + '_>> {
        self.created.lock().unwrap().push(req);
        Box::pin(async move {
            if self.fail_create.load(Ordering::SeqCst) {
                Err(CallbackError::from("create refused"))
            } else {
                Ok("upload-1".to_string())
            }
        })
    }

    fn transfer_url(
        &self,
        req: TransferUrlRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, CallbackError>> + Send + '_>> {
        let url = match (req.client_method, req.part_number) {
            (ClientMethod::UploadPart, Some(n)) => {
                if self.bad_url_parts.lock().unwrap().contains(&n) {
                    String::new()
                } else {
                    format!(
                        "https://store.test/{}/{}?partNumber={n}&uploadId={}",
                        req.bucket,
                        req.key,
                        req.upload_id.clone().unwrap_or_default()
                    )
                }
            }
            _ => format!("https://store.test/{}/{}", req.bucket, req.key),
        };
        self.url_requests.lock().unwrap().push(req);
        Box::pin(async move { Ok(url) })
    }

    fn finalize_session(
        &self,
        req: FinalizeSessionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), CallbackError>> + Send + '_>> {
        self.finalized.lock().unwrap().push(req);
        let delay = *self.finalize_delay.lock().unwrap();
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self.fail_finalize.load(Ordering::SeqCst) {
                Err(CallbackError::from("finalize refused"))
            } else {
                Ok(())
            }
        })
    }
}

/// Mock abort callback.
#[derive(Default)]
pub struct MockAborter {
    pub fail: AtomicBool,
    pub aborted: Mutex<Vec<AbortSessionRequest>>,
}

impl SessionAborter for MockAborter {
    fn abort_session(
        &self,
        req: AbortSessionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), CallbackError>> + Send + '_>> {
        self.aborted.lock().unwrap().push(req);
        Box::pin(async move {
            if self.fail.load(Ordering::SeqCst) {
                Err(CallbackError::from("abort refused"))
            } else {
                Ok(())
            }
        })
    }
}

/// Mock transfer worker.
///
/// Reads the requested range, reports progress, sleeps for `delay` (or the
/// part's entry in `part_delays`) and returns `etag-<part>`. Parts listed in
/// `fail_parts` fail after reading; parts in `untagged_parts` succeed
/// without a tag.
#[derive(Default)]
pub struct MockWorker {
    pub delay: Duration,
    pub part_delays: Mutex<HashMap<u32, Duration>>,
    pub fail_parts: Mutex<HashSet<u32>>,
    pub untagged_parts: Mutex<HashSet<u32>>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub transfers: Mutex<Vec<(Option<u32>, ByteRange, usize)>>,
    pub completed: AtomicUsize,
}

impl MockWorker {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn fail(&self, parts: &[u32]) {
        let mut set = self.fail_parts.lock().unwrap();
        set.clear();
        set.extend(parts.iter().copied());
    }

    pub fn transferred_parts(&self) -> Vec<Option<u32>> {
        let mut parts: Vec<Option<u32>> =
            self.transfers.lock().unwrap().iter().map(|t| t.0).collect();
        parts.sort();
        parts
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TransferWorker for MockWorker {
    fn transfer(
        &self,
        req: TransferRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, TransferError>> + Send + '_>> {
        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            let _guard = InFlight(&self.in_flight);
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let data = req.source.read_range(req.range).await?;
            self.transfers
                .lock()
                .unwrap()
                .push((req.part_number, req.range, data.len()));
            req.progress.report(data.len() as u64 / 2);

            let number = req.part_number.unwrap_or(0);
            let delay = self
                .part_delays
                .lock()
                .unwrap()
                .get(&number)
                .copied()
                .unwrap_or(self.delay);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            if self.fail_parts.lock().unwrap().contains(&number) {
                return Err(TransferError::Transport("connection reset".into()));
            }
            req.progress.report(data.len() as u64);
            self.completed.fetch_add(1, Ordering::SeqCst);
            if self.untagged_parts.lock().unwrap().contains(&number) {
                return Err(TransferError::MissingTag);
            }
            Ok(format!("etag-{number}"))
        })
    }
}
