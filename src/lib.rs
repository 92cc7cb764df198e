//! # sqlineage - SQL lineage extraction and impact graph
//!
//! Derives table- and column-level lineage from SQL statements and answers
//! "if this column disappears, what breaks downstream?".
//!
//! sqlineage provides:
//! - A pluggable SQL adapter producing a lineage-oriented statement tree
//! - An extractor turning one statement into IMPACTS / DERIVED_TO edges
//! - An idempotent graph store (SQLite or in-memory)
//! - Cycle-safe impact analysis over DERIVED_TO edges
//! - An ingestion coordinator with an async worker pool and a batch path

pub mod node;
pub mod edge;
pub mod graph;
pub mod adapter;
pub mod extract;
pub mod storage;
pub mod query;
pub mod ingest;
pub mod server;
pub mod sentinel;
pub mod config;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use node::{ColumnId, NodeId};
pub use edge::{EdgeKind, LineageEdge};
pub use graph::LineageGraph;
pub use extract::Extractor;
pub use storage::{GraphReader, GraphStore, MemoryStore, SqliteStore};
pub use query::{ImpactAnalyzer, ImpactReport, ImpactStatus};
pub use ingest::{BatchItem, BatchReport, IngestCoordinator, SubmissionHandle};

/// Result type alias for sqlineage operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for sqlineage operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported statement: {0}")]
    UnsupportedStatement(String),

    #[error("Store write failed: {0}")]
    StoreWrite(String),

    #[error("Storage error: {0}")]
    Storage(#[source] rusqlite::Error),

    #[error("Invalid node key: {0}")]
    InvalidNode(String),

    #[error("Invalid edge: {0}")]
    InvalidEdge(String),

    #[error("Ingestion queue is closed")]
    QueueClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::StoreWrite(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked) => {
                Error::StoreWrite(err.to_string())
            }
            _ => Error::Storage(err),
        }
    }
}
