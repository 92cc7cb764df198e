//! Async worker pool for single submissions

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::retry::RetryPolicy;
use crate::extract::Extractor;
use crate::storage::GraphStore;

/// One queued statement
#[derive(Debug, Clone)]
pub struct Job {
    pub job_id: Uuid,
    pub sql: String,
}

/// Counters for work the submitter never hears back about
#[derive(Debug, Default)]
pub struct IngestMetrics {
    submitted: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub processed: u64,
    pub failed: u64,
}

impl MetricsSnapshot {
    pub fn pending(&self) -> u64 {
        self.submitted.saturating_sub(self.processed + self.failed)
    }
}

impl IngestMetrics {
    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// What a worker needs to process one job
pub struct WorkerContext {
    pub store: Arc<dyn GraphStore>,
    pub extractor: Extractor,
    pub retry: RetryPolicy,
    pub metrics: Arc<IngestMetrics>,
}

impl WorkerContext {
    /// Extract and merge one statement. Blocking; failures are logged and counted.
    pub fn process(&self, job: &Job) {
        let edges = match self.extractor.extract(&job.sql) {
            Ok(edges) => edges,
            Err(err) => {
                warn!(job_id = %job.job_id, error = %err, "extraction failed");
                self.metrics.record_failed();
                return;
            }
        };

        match self.retry.run(|| self.store.upsert_edges(&edges)) {
            Ok(stats) => {
                info!(
                    job_id = %job.job_id,
                    edges = edges.len(),
                    nodes_created = stats.nodes_created,
                    edges_created = stats.edges_created,
                    "lineage merged"
                );
                self.metrics.record_processed();
            }
            Err(err) => {
                warn!(job_id = %job.job_id, error = %err, "store write failed");
                self.metrics.record_failed();
            }
        }
    }
}

/// Fixed set of tokio tasks draining one job queue
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(count: usize, receiver: mpsc::Receiver<Job>, ctx: Arc<WorkerContext>) -> Self {
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..count.max(1))
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    loop {
                        let job = receiver.lock().await.recv().await;
                        let Some(job) = job else { break };

                        debug!(worker, job_id = %job.job_id, "job picked up");
                        let ctx = Arc::clone(&ctx);
                        if let Err(err) = tokio::task::spawn_blocking(move || ctx.process(&job)).await {
                            warn!(worker, error = %err, "job task panicked");
                        }
                    }
                    debug!(worker, "worker exiting");
                })
            })
            .collect();

        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to drain the queue and exit.
    /// The queue's senders must be dropped first.
    pub async fn shutdown(self) {
        for handle in self.handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "worker task failed");
            }
        }
    }
}
