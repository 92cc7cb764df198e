//! Ingestion Coordinator
//!
//! Two intake modes over one shared store:
//! - single submissions, queued to an async worker pool and never reported back
//! - batches, processed synchronously with a success count

pub mod batch;
pub mod retry;
pub mod source;
pub mod worker;

pub use batch::{BatchIngestor, BatchItem, BatchReport, ItemOutcome};
pub use retry::RetryPolicy;
pub use source::read_batch_file;
pub use worker::{IngestMetrics, Job, MetricsSnapshot, WorkerContext, WorkerPool};

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::extract::Extractor;
use crate::storage::GraphStore;
use crate::{Error, Result};

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Receipt for a queued statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionHandle {
    pub job_id: Uuid,
    pub status: String,
}

impl SubmissionHandle {
    fn queued(job_id: Uuid) -> Self {
        Self {
            job_id,
            status: "queued".to_string(),
        }
    }
}

/// Worker pool and retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    pub workers: usize,
    pub queue_capacity: usize,
    pub retry: RetryPolicy,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            retry: RetryPolicy::default(),
        }
    }
}

/// Owns the job queue, the worker pool and the batch path.
///
/// Must be created inside a tokio runtime.
pub struct IngestCoordinator {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    pool: Mutex<Option<WorkerPool>>,
    batch: BatchIngestor,
    metrics: Arc<IngestMetrics>,
}

impl IngestCoordinator {
    pub fn new(store: Arc<dyn GraphStore>, extractor: Extractor, options: IngestOptions) -> Self {
        let metrics = Arc::new(IngestMetrics::default());
        let (sender, receiver) = mpsc::channel(options.queue_capacity.max(1));

        let ctx = Arc::new(WorkerContext {
            store: Arc::clone(&store),
            extractor: extractor.clone(),
            retry: options.retry,
            metrics: Arc::clone(&metrics),
        });
        let pool = WorkerPool::spawn(options.workers, receiver, ctx);
        info!(workers = pool.size(), dialect = extractor.dialect_name(), "ingestion workers started");

        Self {
            sender: Mutex::new(Some(sender)),
            pool: Mutex::new(Some(pool)),
            batch: BatchIngestor::new(store, extractor).with_retry(options.retry),
            metrics,
        }
    }

    /// Queue one statement for extraction and merge.
    ///
    /// Returns once the job is enqueued; waits only when the queue is full.
    pub async fn submit_lineage(&self, sql: impl Into<String>) -> Result<SubmissionHandle> {
        let sender = self
            .sender
            .lock()
            .map_err(|_| Error::QueueClosed)?
            .clone()
            .ok_or(Error::QueueClosed)?;

        let job = Job {
            job_id: Uuid::new_v4(),
            sql: sql.into(),
        };
        let job_id = job.job_id;

        sender.send(job).await.map_err(|_| Error::QueueClosed)?;
        self.metrics.record_submitted();
        debug!(%job_id, "job queued");

        Ok(SubmissionHandle::queued(job_id))
    }

    /// Process a batch synchronously. Blocks the calling thread.
    pub fn bulk_ingest(&self, items: &[BatchItem]) -> BatchReport {
        self.batch.run(items)
    }

    pub fn batch(&self) -> &BatchIngestor {
        &self.batch
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Close the queue and wait for queued jobs to finish. Later submissions
    /// fail with `QueueClosed`.
    pub async fn shutdown(&self) {
        let sender = self.sender.lock().ok().and_then(|mut sender| sender.take());
        drop(sender);

        let pool = self.pool.lock().ok().and_then(|mut pool| pool.take());
        if let Some(pool) = pool {
            pool.shutdown().await;
            info!(metrics = ?self.metrics.snapshot(), "ingestion workers stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::LineageEdge;
    use crate::node::ColumnId;
    use crate::storage::{MemoryStore, SqliteStore};

    #[tokio::test]
    async fn test_submission_lands_after_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = IngestCoordinator::new(store.clone(), Extractor::default(), IngestOptions::default());

        let handle = coordinator
            .submit_lineage("INSERT INTO T SELECT a.x AS y FROM A a")
            .await
            .unwrap();
        assert_eq!(handle.status, "queued");

        coordinator.shutdown().await;

        let graph = store.read_all().unwrap();
        assert!(graph.contains_edge(&LineageEdge::derived(
            ColumnId::new("A", "x"),
            ColumnId::new("T", "y")
        )));
        assert!(graph.contains_edge(&LineageEdge::impacts("A", "T")));
        assert_eq!(coordinator.metrics().processed, 1);
    }

    #[tokio::test]
    async fn test_failed_submission_still_returns_handle() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = IngestCoordinator::new(store.clone(), Extractor::default(), IngestOptions::default());

        let first = coordinator.submit_lineage("garbage in").await.unwrap();
        let second = coordinator.submit_lineage("garbage in").await.unwrap();
        assert_ne!(first.job_id, second.job_id);

        coordinator.shutdown().await;
        let metrics = coordinator.metrics();
        assert_eq!(metrics.failed, 2);
        assert_eq!(metrics.pending(), 0);
        assert_eq!(store.read_all().unwrap().node_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_rejected() {
        let coordinator = IngestCoordinator::new(
            Arc::new(MemoryStore::new()),
            Extractor::default(),
            IngestOptions::default(),
        );
        coordinator.shutdown().await;

        let err = coordinator.submit_lineage("INSERT INTO b SELECT * FROM a").await.unwrap_err();
        assert!(matches!(err, Error::QueueClosed));
    }

    #[tokio::test]
    async fn test_concurrent_submissions_converge() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let coordinator = IngestCoordinator::new(store.clone(), Extractor::default(), IngestOptions::default());

        for _ in 0..20 {
            coordinator
                .submit_lineage("INSERT INTO total_sales SELECT a.price * b.qty AS revenue FROM orders a JOIN prices b")
                .await
                .unwrap();
        }
        coordinator.shutdown().await;

        let stats = store.stats().unwrap();
        assert_eq!(stats.tables, 3);
        assert_eq!(stats.columns, 3);
        assert_eq!(stats.total_edges(), 7);
    }

    #[tokio::test]
    async fn test_bulk_ingest_through_coordinator() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = IngestCoordinator::new(store, Extractor::default(), IngestOptions::default());

        let report = coordinator.bulk_ingest(&[
            BatchItem::new("INSERT INTO b SELECT * FROM a"),
            BatchItem::new("not a statement at all"),
            BatchItem::new("INSERT INTO c SELECT * FROM b"),
        ]);
        assert_eq!(report, BatchReport { success_count: 2, total_count: 3 });
        coordinator.shutdown().await;
    }
}
