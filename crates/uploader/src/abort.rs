//! Cooperative abort of a multipart upload.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::UploadError;
use crate::session::UploadSession;
use crate::signer::SessionAborter;

/// Marks a session aborted, cancels its in-flight work and releases the
/// remote multipart session.
pub struct AbortCoordinator<'a> {
    session: &'a UploadSession,
    aborter: Option<&'a dyn SessionAborter>,
    cancel: &'a CancellationToken,
}

impl<'a> AbortCoordinator<'a> {
    pub fn new(
        session: &'a UploadSession,
        aborter: Option<&'a dyn SessionAborter>,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            session,
            aborter,
            cancel,
        }
    }

    /// Aborts the upload.
    ///
    /// The status becomes `Aborted` before anything is awaited. If the abort
    /// callback itself fails the error is returned but the status stays
    /// `Aborted`.
    pub async fn abort(&self) -> Result<(), UploadError> {
        let aborter = self.aborter.ok_or(UploadError::MissingCallback)?;
        let req = self.session.begin_abort()?;
        self.cancel.cancel();

        let upload_id = req.upload_id.clone();
        match aborter.abort_session(req).await {
            Ok(()) => {
                info!(
                    key = %self.session.key(),
                    session_id = %upload_id,
                    "multipart upload aborted"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    key = %self.session.key(),
                    session_id = %upload_id,
                    error = %e,
                    "abort callback failed, remote session may linger"
                );
                Err(UploadError::Abort(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockAborter;
    use signurl_protocol::UploadStatus;
    use signurl_transfer::plan_chunks;
    use std::sync::atomic::Ordering;

    fn uploading_session() -> UploadSession {
        let session = UploadSession::new("test", "obj.bin", 2, None);
        session.plan(&plan_chunks(30, 10).unwrap()).unwrap();
        session.transition(UploadStatus::Uploading).unwrap();
        session
    }

    #[tokio::test]
    async fn aborts_open_session() {
        let session = uploading_session();
        session.attach_session_id("upload-1".into()).unwrap();
        let aborter = MockAborter::default();
        let cancel = CancellationToken::new();

        AbortCoordinator::new(&session, Some(&aborter), &cancel)
            .abort()
            .await
            .unwrap();

        assert_eq!(session.status(), UploadStatus::Aborted);
        assert!(cancel.is_cancelled());
        let aborted = aborter.aborted.lock().unwrap();
        assert_eq!(aborted.len(), 1);
        assert_eq!(aborted[0].upload_id, "upload-1");
        assert_eq!(aborted[0].bucket, "test");
    }

    #[tokio::test]
    async fn missing_callback_leaves_status() {
        let session = uploading_session();
        session.attach_session_id("upload-1".into()).unwrap();
        let cancel = CancellationToken::new();

        let result = AbortCoordinator::new(&session, None, &cancel).abort().await;

        assert!(matches!(result, Err(UploadError::MissingCallback)));
        assert_eq!(session.status(), UploadStatus::Uploading);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn no_session_id_is_illegal() {
        let session = uploading_session();
        let aborter = MockAborter::default();
        let cancel = CancellationToken::new();

        let result = AbortCoordinator::new(&session, Some(&aborter), &cancel)
            .abort()
            .await;

        assert!(matches!(result, Err(UploadError::IllegalState(_))));
        assert!(aborter.aborted.lock().unwrap().is_empty());
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn failed_callback_stays_aborted() {
        let session = uploading_session();
        session.attach_session_id("upload-1".into()).unwrap();
        let aborter = MockAborter::default();
        aborter.fail.store(true, Ordering::SeqCst);
        let cancel = CancellationToken::new();

        let result = AbortCoordinator::new(&session, Some(&aborter), &cancel)
            .abort()
            .await;

        assert!(matches!(result, Err(UploadError::Abort(_))));
        assert_eq!(session.status(), UploadStatus::Aborted);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn second_abort_is_illegal() {
        let session = uploading_session();
        session.attach_session_id("upload-1".into()).unwrap();
        let aborter = MockAborter::default();
        let cancel = CancellationToken::new();
        let coord = AbortCoordinator::new(&session, Some(&aborter), &cancel);

        coord.abort().await.unwrap();
        assert!(matches!(
            coord.abort().await,
            Err(UploadError::IllegalState(_))
        ));
        assert_eq!(aborter.aborted.lock().unwrap().len(), 1);
    }
}
