use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use opal_store::{AnchorStore, StorageEngine};
use opal_types::LedgerAnchor;

use crate::builder::AnchorBuilder;
use crate::error::AnchorResult;
use crate::recorder::AnchorRecorder;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(60);

/// Long-lived anchor loop: one cycle in flight at a time, polling at a fixed
/// interval and backing off after an error.
///
/// The host owns the lifecycle: it spawns [`Self::run`] and flips the watch
/// channel to `true` to stop it. Cancellation is observed at each iteration
/// boundary, never mid-cycle, so no partial checkpoint is persisted.
pub struct AnchorWorker<S> {
    builder: AnchorBuilder<S>,
    recorder: Arc<dyn AnchorRecorder>,
    poll_interval: Duration,
    error_backoff: Duration,
}

impl<S: StorageEngine + AnchorStore> AnchorWorker<S> {
    pub fn new(storage: Arc<S>, recorder: Arc<dyn AnchorRecorder>) -> Self {
        Self {
            builder: AnchorBuilder::new(storage),
            recorder,
            poll_interval: DEFAULT_POLL_INTERVAL,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }

    pub fn with_intervals(mut self, poll_interval: Duration, error_backoff: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.error_backoff = error_backoff;
        self
    }

    /// Run until the shutdown channel reads `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("anchor worker started");
        let mut delay = self.poll_interval;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            match self.cycle().await {
                Ok(_) => delay = self.poll_interval,
                Err(err) => {
                    error!(error = %err, "anchor cycle failed");
                    delay = self.error_backoff;
                }
            }
        }
        info!("anchor worker stopped");
    }

    /// One anchor cycle: compute, publish, persist.
    async fn cycle(&self) -> AnchorResult<Option<LedgerAnchor>> {
        if !self.recorder.can_record_anchor().await {
            return Ok(None);
        }
        let Some(anchor) = self.builder.create_anchor().await? else {
            return Ok(None);
        };
        self.recorder.record_anchor(&anchor).await?;
        self.builder.commit_anchor(&anchor).await?;
        info!(
            position = %anchor.position.to_hex(),
            transaction_count = anchor.transaction_count,
            "anchor committed"
        );
        Ok(Some(anchor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnchorError;
    use async_trait::async_trait;
    use opal_store::InMemoryLedger;
    use opal_types::{
        serialize_mutation, serialize_transaction, ByteString, Mutation, Record, Transaction,
    };
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    struct TestRecorder {
        available: AtomicBool,
        fail_next: AtomicBool,
        recorded: Mutex<Vec<LedgerAnchor>>,
    }

    impl TestRecorder {
        fn new() -> Self {
            Self {
                available: AtomicBool::new(true),
                fail_next: AtomicBool::new(false),
                recorded: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AnchorRecorder for TestRecorder {
        async fn can_record_anchor(&self) -> bool {
            self.available.load(Ordering::SeqCst)
        }

        async fn record_anchor(&self, anchor: &LedgerAnchor) -> AnchorResult<()> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(AnchorError::Recorder("publication unavailable".into()));
            }
            self.recorded.lock().unwrap().push(anchor.clone());
            Ok(())
        }
    }

    async fn commit_one(store: &InMemoryLedger, n: u8) {
        let record = Record::new(
            ByteString::from(format!("/k{n}/:DATA:x").as_str()),
            Some("v".into()),
            ByteString::empty(),
        );
        let mutation = Mutation::new("ns".into(), vec![record], ByteString::empty());
        let transaction = Transaction::new(
            ByteString::new(serialize_mutation(&mutation)),
            u64::from(n),
            ByteString::empty(),
        );
        let raw = ByteString::new(serialize_transaction(&transaction));
        store.add_transactions(&[raw]).await.unwrap();
    }

    fn worker(
        store: Arc<InMemoryLedger>,
        recorder: Arc<TestRecorder>,
    ) -> AnchorWorker<InMemoryLedger> {
        AnchorWorker::new(store, recorder)
            .with_intervals(Duration::from_millis(1), Duration::from_millis(1))
    }

    #[tokio::test]
    async fn cycle_records_then_persists() {
        let store = Arc::new(InMemoryLedger::new());
        commit_one(&store, 1).await;
        let recorder = Arc::new(TestRecorder::new());
        let worker = worker(store, recorder.clone());

        let anchor = worker.cycle().await.unwrap().unwrap();
        assert_eq!(recorder.recorded.lock().unwrap().as_slice(), &[anchor]);

        // Nothing new: the next cycle is a no-op.
        assert!(worker.cycle().await.unwrap().is_none());
        assert_eq!(recorder.recorded.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unavailable_recorder_skips_the_cycle() {
        let store = Arc::new(InMemoryLedger::new());
        commit_one(&store, 1).await;
        let recorder = Arc::new(TestRecorder::new());
        recorder.available.store(false, Ordering::SeqCst);
        let worker = worker(store, recorder.clone());

        assert!(worker.cycle().await.unwrap().is_none());
        assert!(recorder.recorded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_publication_is_retried_with_the_same_anchor() {
        let store = Arc::new(InMemoryLedger::new());
        commit_one(&store, 1).await;
        let recorder = Arc::new(TestRecorder::new());
        recorder.fail_next.store(true, Ordering::SeqCst);
        let worker = worker(store.clone(), recorder.clone());

        assert!(worker.cycle().await.is_err());
        // The checkpoint was not persisted, so the retry recomputes it.
        assert!(store.get_last_anchor().await.unwrap().is_none());

        let anchor = worker.cycle().await.unwrap().unwrap();
        assert_eq!(store.get_last_anchor().await.unwrap(), Some(anchor));
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let store = Arc::new(InMemoryLedger::new());
        let recorder = Arc::new(TestRecorder::new());
        let worker = worker(store, recorder);

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(worker.run(rx));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
