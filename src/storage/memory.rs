//! In-memory graph store

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{GraphReader, GraphStore};
use crate::edge::LineageEdge;
use crate::graph::{GraphStats, LineageGraph, MergeStats};
use crate::node::ColumnId;
use crate::{Error, Result};

/// A `GraphStore` over a lock-guarded `LineageGraph`. Nothing is persisted.
#[derive(Default)]
pub struct MemoryStore {
    graph: RwLock<LineageGraph>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from an existing graph
    pub fn from_graph(graph: LineageGraph) -> Self {
        Self { graph: RwLock::new(graph) }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LineageGraph>> {
        self.graph
            .read()
            .map_err(|_| Error::StoreWrite("graph lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LineageGraph>> {
        self.graph
            .write()
            .map_err(|_| Error::StoreWrite("graph lock poisoned".to_string()))
    }
}

impl GraphReader for MemoryStore {
    fn contains_column(&self, column: &ColumnId) -> Result<bool> {
        self.read()?.contains_column(column)
    }

    fn derived_targets(&self, column: &ColumnId) -> Result<Vec<ColumnId>> {
        self.read()?.derived_targets(column)
    }

    fn owning_table(&self, column: &ColumnId) -> Result<Option<String>> {
        self.read()?.owning_table(column)
    }
}

impl GraphStore for MemoryStore {
    fn upsert_edges(&self, edges: &[LineageEdge]) -> Result<MergeStats> {
        self.write()?.merge_edges(edges)
    }

    fn read_all(&self) -> Result<LineageGraph> {
        Ok(self.read()?.clone())
    }

    fn stats(&self) -> Result<GraphStats> {
        Ok(self.read()?.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::EdgeKind;
    use crate::node::NodeId;

    #[test]
    fn test_memory_store_merge() {
        let store = MemoryStore::new();
        let edges = vec![
            LineageEdge::derived(ColumnId::new("a", "x"), ColumnId::new("b", "y")),
            LineageEdge::impacts("a", "b"),
        ];

        let first = store.upsert_edges(&edges).unwrap();
        assert_eq!(first.nodes_created, 4);
        assert_eq!(first.edges_created, 4);
        assert!(store.upsert_edges(&edges).unwrap().is_noop());

        let stats = store.stats().unwrap();
        assert_eq!(stats.tables, 2);
        assert_eq!(stats.columns, 2);
        assert_eq!(stats.edges_of(EdgeKind::BelongsTo), 2);
    }

    #[test]
    fn test_memory_store_matches_sqlite() {
        let edges = vec![
            LineageEdge::derived(ColumnId::new("orders", "amount"), ColumnId::new("report", "total")),
            LineageEdge::spark_processed("orders", "report"),
            LineageEdge::impacts("orders", "report"),
        ];

        let memory = MemoryStore::new();
        let sqlite = super::super::SqliteStore::open_in_memory().unwrap();
        memory.upsert_edges(&edges).unwrap();
        sqlite.upsert_edges(&edges).unwrap();

        assert_eq!(memory.read_all().unwrap(), sqlite.read_all().unwrap());
        assert_eq!(memory.stats().unwrap(), sqlite.stats().unwrap());
    }

    #[test]
    fn test_from_graph() {
        let mut graph = LineageGraph::new();
        graph.add_node(NodeId::column("t", "c"));
        let store = MemoryStore::from_graph(graph);
        assert!(store.contains_column(&ColumnId::new("t", "c")).unwrap());
        assert_eq!(store.owning_table(&ColumnId::new("t", "c")).unwrap(), Some("t".into()));
    }
}
