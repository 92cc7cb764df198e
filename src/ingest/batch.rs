//! Batch ingestion
//!
//! Table-level extraction runs in parallel on scoped threads; results flow
//! back over a crossbeam channel and are merged into the store on the
//! calling thread. Failed items are counted, never raised.

use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::retry::RetryPolicy;
use crate::Result;
use crate::extract::{Extractor, TableLineage};
use crate::storage::GraphStore;

/// One batch record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    #[serde(default)]
    pub sql_text: String,
}

impl BatchItem {
    pub fn new(sql_text: impl Into<String>) -> Self {
        Self { sql_text: sql_text.into() }
    }

    pub fn is_blank(&self) -> bool {
        self.sql_text.trim().is_empty()
    }
}

/// Outcome counts of one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub success_count: usize,
    pub total_count: usize,
}

impl BatchReport {
    pub fn failed_count(&self) -> usize {
        self.total_count - self.success_count
    }
}

/// Per-item outcome passed to progress observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Merged { edges: usize },
    Skipped,
    Failed,
}

/// Runs batches against one store
#[derive(Clone)]
pub struct BatchIngestor {
    store: Arc<dyn GraphStore>,
    extractor: Extractor,
    retry: RetryPolicy,
    threads: usize,
}

impl BatchIngestor {
    pub fn new(store: Arc<dyn GraphStore>, extractor: Extractor) -> Self {
        Self {
            store,
            extractor,
            retry: RetryPolicy::default(),
            threads: default_threads(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn run(&self, items: &[BatchItem]) -> BatchReport {
        self.run_with_progress(items, |_, _| {})
    }

    /// Run a batch, calling `on_item(index, outcome)` as each item settles
    pub fn run_with_progress(
        &self,
        items: &[BatchItem],
        mut on_item: impl FnMut(usize, ItemOutcome),
    ) -> BatchReport {
        let mut report = BatchReport {
            success_count: 0,
            total_count: items.len(),
        };

        let (work_tx, work_rx) = crossbeam::channel::unbounded::<(usize, &str)>();
        let (result_tx, result_rx) = crossbeam::channel::unbounded::<(usize, Result<TableLineage>)>();

        for (index, item) in items.iter().enumerate() {
            if item.is_blank() {
                debug!(index, "skipping blank batch item");
                on_item(index, ItemOutcome::Skipped);
            } else {
                // Receiver is alive until the scope below ends
                let _ = work_tx.send((index, item.sql_text.as_str()));
            }
        }
        drop(work_tx);

        let extractor = &self.extractor;
        thread::scope(|scope| {
            for _ in 0..self.threads {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for (index, sql) in work_rx {
                        if result_tx.send((index, extractor.extract_tables(sql))).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            for (index, extracted) in result_rx {
                let outcome = self.merge_item(index, extracted);
                if matches!(outcome, ItemOutcome::Merged { .. }) {
                    report.success_count += 1;
                }
                on_item(index, outcome);
            }
        });

        info!(
            success = report.success_count,
            total = report.total_count,
            "batch ingestion finished"
        );
        report
    }

    fn merge_item(&self, index: usize, extracted: Result<TableLineage>) -> ItemOutcome {
        let lineage = match extracted {
            Ok(lineage) => lineage,
            Err(err) => {
                warn!(index, error = %err, "batch item failed extraction");
                return ItemOutcome::Failed;
            }
        };

        let edges = lineage.spark_processed_edges();
        match self.retry.run(|| self.store.upsert_edges(&edges)) {
            Ok(_) => {
                debug!(index, target = %lineage.target, edges = edges.len(), "batch item merged");
                ItemOutcome::Merged { edges: edges.len() }
            }
            Err(err) => {
                warn!(index, error = %err, "batch item failed to merge");
                ItemOutcome::Failed
            }
        }
    }
}

fn default_threads() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}
