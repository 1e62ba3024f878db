//! Bounded pool of icon download tasks.

use crate::assets::{AssetDownloader, commit};
use crate::error::Error;
use crate::layout::partial_path;
use crate::types::{ArtifactOutcome, Event, Failure};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// One icon download, keyed by the channel's slot in the run report
pub(crate) struct IconJob {
    pub(crate) slot: usize,
    pub(crate) descriptor: String,
    pub(crate) url: String,
    pub(crate) dest: PathBuf,
}

/// Icon downloads scheduled during one run
///
/// [`schedule`](IconPool::schedule) never waits: the permit is acquired inside
/// the spawned task, so the caller keeps writing launchers while at most
/// `max_concurrent` downloads are in flight.
///
/// Cancellation interrupts waiting for a permit and the transfer into the
/// `.part` file. Moving a finished transfer into place is not interrupted,
/// so an icon reported as cancelled was never written.
pub(crate) struct IconPool {
    downloader: AssetDownloader,
    concurrent_limit: Arc<Semaphore>,
    event_tx: broadcast::Sender<Event>,
    cancel: CancellationToken,
    tasks: JoinSet<(usize, ArtifactOutcome)>,
    /// Destination of every scheduled job, by slot
    destinations: HashMap<usize, PathBuf>,
}

impl IconPool {
    pub(crate) fn new(
        downloader: AssetDownloader,
        max_concurrent: usize,
        event_tx: broadcast::Sender<Event>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            downloader,
            concurrent_limit: Arc::new(Semaphore::new(max_concurrent)),
            event_tx,
            cancel,
            tasks: JoinSet::new(),
            destinations: HashMap::new(),
        }
    }

    /// Spawn the download for `job`
    pub(crate) fn schedule(&mut self, job: IconJob) {
        let downloader = self.downloader.clone();
        let concurrent_limit = Arc::clone(&self.concurrent_limit);
        let event_tx = self.event_tx.clone();
        let cancel = self.cancel.clone();
        self.destinations.insert(job.slot, job.dest.clone());

        self.tasks.spawn(async move {
            let IconJob {
                slot,
                descriptor,
                url,
                dest,
            } = job;

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(Error::Cancelled),
                result = async {
                    let _permit = concurrent_limit
                        .acquire_owned()
                        .await
                        .map_err(|_| Error::Cancelled)?;
                    downloader.fetch(&url, &dest).await
                } => result,
            };
            let result = match fetched {
                Ok(bytes) => commit(&dest).await.map(|()| bytes),
                Err(e) => Err(e),
            };

            let outcome = match result {
                Ok(bytes) => {
                    tracing::debug!(descriptor = %descriptor, bytes, "icon saved");
                    event_tx
                        .send(Event::IconDownloaded {
                            descriptor,
                            path: dest.clone(),
                            bytes,
                        })
                        .ok();
                    ArtifactOutcome::Written { path: dest }
                }
                Err(e) => {
                    if matches!(e, Error::Cancelled) {
                        // The transfer may have been dropped mid-stream
                        let _ = tokio::fs::remove_file(partial_path(&dest)).await;
                    }
                    tracing::warn!(
                        descriptor = %descriptor,
                        url = %url,
                        error = %e,
                        "icon download failed"
                    );
                    let failure = Failure::from(&e);
                    event_tx
                        .send(Event::IconFailed {
                            descriptor,
                            failure: failure.clone(),
                        })
                        .ok();
                    ArtifactOutcome::Failed { failure }
                }
            };

            (slot, outcome)
        });
    }

    /// Wait for every scheduled download to settle
    ///
    /// Returns the outcome of each task that ran to completion, keyed by slot.
    /// A panicked task has no entry and its partial file is removed; the
    /// caller reports its slot as failed.
    pub(crate) async fn join(mut self) -> HashMap<usize, ArtifactOutcome> {
        let mut outcomes = HashMap::with_capacity(self.destinations.len());

        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((slot, outcome)) => {
                    outcomes.insert(slot, outcome);
                }
                Err(e) => {
                    tracing::error!(error = %e, "icon download task did not complete");
                }
            }
        }

        for (slot, dest) in &self.destinations {
            if !outcomes.contains_key(slot) {
                let _ = tokio::fs::remove_file(partial_path(dest)).await;
            }
        }

        outcomes
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AssetConfig, RetryConfig};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pool(cancel: CancellationToken) -> IconPool {
        let downloader =
            AssetDownloader::new(&AssetConfig::default(), RetryConfig::default()).unwrap();
        let (event_tx, _rx) = broadcast::channel(16);
        IconPool::new(downloader, 2, event_tx, cancel)
    }

    #[tokio::test]
    async fn test_join_removes_partial_file_of_panicked_task() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dest = temp_dir.path().join("icon-tv1.png");
        tokio::fs::write(partial_path(&dest), b"half an icon")
            .await
            .unwrap();

        let mut pool = pool(CancellationToken::new());
        pool.destinations.insert(0, dest.clone());
        pool.tasks.spawn(async { panic!("worker died") });

        let outcomes = pool.join().await;
        assert!(outcomes.is_empty());
        assert!(!partial_path(&dest).exists());
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_join_keeps_completed_icons() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
            .mount(&mock_server)
            .await;

        let temp_dir = tempfile::tempdir().unwrap();
        let dest = temp_dir.path().join("icon-tv1.png");

        let mut pool = pool(CancellationToken::new());
        pool.schedule(IconJob {
            slot: 0,
            descriptor: "tv1".to_string(),
            url: format!("{}/channelsLogo/tv1/default", mock_server.uri()),
            dest: dest.clone(),
        });

        let outcomes = pool.join().await;
        assert_eq!(outcomes[&0], ArtifactOutcome::Written { path: dest.clone() });
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"png");
    }

    #[tokio::test]
    async fn test_cancelled_icon_is_never_written() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dest = temp_dir.path().join("icon-tv1.png");

        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut pool = pool(cancel);
        pool.schedule(IconJob {
            slot: 0,
            descriptor: "tv1".to_string(),
            // Never contacted: the token is already cancelled
            url: "http://127.0.0.1:1/channelsLogo/tv1/default".to_string(),
            dest: dest.clone(),
        });

        let outcomes = pool.join().await;
        assert_eq!(
            outcomes[&0].failure().unwrap().kind,
            crate::types::FailureKind::Cancelled
        );
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }
}
