//! Storage Layer - lineage graph persistence
//!
//! System of record is SQLite with tables:
//! - nodes(key, label, table_name, column_name)
//! - edges(kind, from_key, to_key, endpoint table/column names), unique per
//!   (kind, from_key, to_key)
//!
//! `MemoryStore` offers the same contract without persistence, for tests
//! and ephemeral runs.

pub mod schema;
pub mod sqlite;
pub mod memory;

pub use sqlite::SqliteStore;
pub use memory::MemoryStore;

use crate::Result;
use crate::edge::LineageEdge;
use crate::graph::{GraphStats, LineageGraph, MergeStats};
use crate::node::ColumnId;

/// Read access needed by impact analysis
pub trait GraphReader {
    /// Whether a Column node with this identity exists
    fn contains_column(&self, column: &ColumnId) -> Result<bool>;

    /// Direct DERIVED_TO successors of a column
    fn derived_targets(&self, column: &ColumnId) -> Result<Vec<ColumnId>>;

    /// Table at the end of the column's BELONGS_TO edge
    fn owning_table(&self, column: &ColumnId) -> Result<Option<String>>;
}

/// A lineage graph store with create-if-absent merge semantics.
///
/// Upserts racing on the same identity are safe: each node and edge is
/// created at most once and never overwritten. A failure part-way through
/// one `upsert_edges` call may leave the edges before it merged.
pub trait GraphStore: GraphReader + Send + Sync {
    /// Merge edges and their endpoint nodes; columns also get their table
    /// and BELONGS_TO edge.
    fn upsert_edges(&self, edges: &[LineageEdge]) -> Result<MergeStats>;

    /// Full node and edge projection
    fn read_all(&self) -> Result<LineageGraph>;

    /// Node and edge counts
    fn stats(&self) -> Result<GraphStats>;
}
