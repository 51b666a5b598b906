//! Background sync daemon.
//!
//! `SyncDaemon` runs a tokio loop that wakes every check interval and asks the
//! [`SyncService`] whether a pass is due. The service stays synchronous: each
//! check moves it onto the blocking pool, since a pass does file I/O under the
//! graph store lock, and takes it back when the check returns. Stopping is cooperative: [`SyncHandle::stop`] clears
//! the run flag and wakes the loop, which exits before its next check and never
//! interrupts a pass in progress.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

use super::SyncService;

/// Cloneable control handle for a running daemon.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl SyncHandle {
    /// Ask the daemon to stop after its current iteration.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.wake.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Long-running loop around a [`SyncService`].
pub struct SyncDaemon {
    service: SyncService,
    check_interval: Duration,
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl SyncDaemon {
    pub fn new(service: SyncService) -> Self {
        let check_interval = service.config().check_interval;
        Self {
            service,
            check_interval,
            running: Arc::new(AtomicBool::new(true)),
            wake: Arc::new(Notify::new()),
        }
    }

    pub fn handle(&self) -> SyncHandle {
        SyncHandle {
            running: Arc::clone(&self.running),
            wake: Arc::clone(&self.wake),
        }
    }

    /// Run until stopped, then hand the service back.
    ///
    /// The first check happens immediately, so a fresh daemon syncs at once.
    /// Returns `None` when a pass panicked; the daemon stops in that case.
    pub async fn run(self) -> Option<SyncService> {
        let Self {
            mut service,
            check_interval,
            running,
            wake,
        } = self;
        tracing::info!(
            interval_secs = service.config().interval.as_secs(),
            check_secs = check_interval.as_secs(),
            "sync daemon started"
        );

        while running.load(Ordering::SeqCst) {
            let now = tokio::time::Instant::now().into_std();
            let check = tokio::task::spawn_blocking(move || {
                let report = service.tick(now);
                (service, report)
            })
            .await;
            let report = match check {
                Ok((returned, report)) => {
                    service = returned;
                    report
                }
                Err(e) => {
                    tracing::error!(error = %e, "sync pass did not complete; stopping daemon");
                    running.store(false, Ordering::SeqCst);
                    return None;
                }
            };
            if let Some(report) = report {
                tracing::debug!(
                    total = report.total_items_cleaned,
                    failures = report.failures.len(),
                    "daemon: sync pass finished"
                );
            }

            tokio::select! {
                _ = tokio::time::sleep(check_interval) => {}
                _ = wake.notified() => {}
            }
        }

        tracing::info!(passes = service.passes(), "sync daemon stopped");
        Some(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::seed::SeedGraph;
    use crate::graph::store::GraphStore;
    use crate::sync::{ConversationRecord, JsonRecordStore, RecordFile, SyncConfig};

    fn service(records: Arc<JsonRecordStore>) -> SyncService {
        SyncService::new(
            records.clone(),
            records,
            Arc::new(GraphStore::in_memory(SeedGraph::empty())),
            SyncConfig::default(),
        )
    }

    struct PanickingStore;

    impl crate::sync::ConversationStore for PanickingStore {
        fn list_conversations(&self) -> crate::sync::SyncResult<Vec<ConversationRecord>> {
            panic!("store backend crashed");
        }
        fn delete_conversation(&self, _: &str) -> crate::sync::SyncResult<()> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn panicking_pass_stops_the_daemon() {
        let records = Arc::new(JsonRecordStore::in_memory(RecordFile::default()));
        let daemon = SyncDaemon::new(SyncService::new(
            Arc::new(PanickingStore),
            records,
            Arc::new(GraphStore::in_memory(SeedGraph::empty())),
            SyncConfig::default(),
        ));
        let handle = daemon.handle();

        assert!(daemon.run().await.is_none());
        assert!(!handle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn first_pass_runs_immediately_then_waits_for_interval() {
        let records = Arc::new(JsonRecordStore::in_memory(RecordFile::default()));
        let daemon = SyncDaemon::new(service(records));
        let handle = daemon.handle();
        let task = tokio::spawn(daemon.run());

        // 29 minutes in: only the initial pass has run.
        tokio::time::sleep(Duration::from_secs(29 * 60)).await;
        handle.stop();
        let service = task.await.unwrap().unwrap();
        assert_eq!(service.passes(), 1);
        assert!(!handle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn second_pass_after_interval_cleans_new_duplicates() {
        let records = Arc::new(JsonRecordStore::in_memory(RecordFile::default()));
        let daemon = SyncDaemon::new(service(records.clone()));
        let handle = daemon.handle();
        let task = tokio::spawn(daemon.run());

        tokio::time::sleep(Duration::from_secs(10)).await;
        records
            .add_conversation(ConversationRecord::new("a", "same question", ""))
            .unwrap();
        records
            .add_conversation(ConversationRecord::new("b", "Same question", ""))
            .unwrap();

        tokio::time::sleep(Duration::from_secs(31 * 60)).await;
        handle.stop();
        let service = task.await.unwrap().unwrap();

        assert_eq!(service.passes(), 2);
        assert_eq!(records.conversations().len(), 1);
        assert_eq!(service.last_report().unwrap().conversations_removed, 1);
    }
}
