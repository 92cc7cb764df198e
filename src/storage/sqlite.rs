//! SQLite storage implementation

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, params};

use super::{GraphReader, GraphStore, schema};
use crate::edge::{EdgeKind, LineageEdge};
use crate::graph::{GraphStats, LineageGraph, MergeStats};
use crate::node::{ColumnId, NodeId};
use crate::{Error, Result};

/// How long a writer waits on a locked database before failing with a
/// transient `StoreWrite` error
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed storage for the lineage graph.
///
/// The connection sits behind a mutex so one store can be shared by the
/// worker pool; every node and edge insert is `INSERT OR IGNORE`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self { conn: Mutex::new(conn) };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn: Mutex::new(conn) };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::StoreWrite("connection lock poisoned".to_string()))
    }

    // ========== Node Operations ==========

    /// Create a node if absent. Returns the number of rows created.
    fn insert_node(conn: &Connection, node: &NodeId) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT OR IGNORE INTO nodes (key, label, table_name, column_name)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                node.to_key_string(),
                node.label(),
                node.table_name(),
                column_part(node)
            ],
        )
    }

    /// Create a node, and for a column its table and BELONGS_TO edge, if absent
    fn ensure_node(conn: &Connection, node: &NodeId) -> rusqlite::Result<MergeStats> {
        let mut stats = MergeStats::default();
        if let NodeId::Column(col) = node {
            let owner = LineageEdge::belongs_to(col.clone());
            stats.nodes_created += Self::insert_node(conn, &owner.to)?;
            stats.nodes_created += Self::insert_node(conn, node)?;
            stats.edges_created += Self::insert_edge(conn, &owner)?;
        } else {
            stats.nodes_created += Self::insert_node(conn, node)?;
        }
        Ok(stats)
    }

    // ========== Edge Operations ==========

    /// Create an edge if absent. Returns the number of rows created.
    fn insert_edge(conn: &Connection, edge: &LineageEdge) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT OR IGNORE INTO edges
                 (kind, from_key, to_key, from_table, from_column, to_table, to_column)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                edge.kind.as_str(),
                edge.from.to_key_string(),
                edge.to.to_key_string(),
                edge.from.table_name(),
                column_part(&edge.from),
                edge.to.table_name(),
                column_part(&edge.to),
            ],
        )
    }

    /// Targets of a node's outgoing edges of one kind
    fn targets_of(&self, from: &NodeId, kind: EdgeKind) -> Result<Vec<NodeId>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT to_table, to_column FROM edges WHERE from_key = ?1 AND kind = ?2 ORDER BY id",
        )?;

        let targets = stmt
            .query_map(params![from.to_key_string(), kind.as_str()], |row| {
                Ok(node_from_parts(row.get(0)?, row.get(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(targets)
    }

    /// Count all nodes
    pub fn count_nodes(&self) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Count all edges
    pub fn count_edges(&self) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn column_part(node: &NodeId) -> Option<&str> {
    node.as_column().map(|col| col.column.as_str())
}

fn node_from_parts(table: String, column: Option<String>) -> NodeId {
    match column {
        Some(column) => NodeId::column(table, column),
        None => NodeId::table(table),
    }
}

impl GraphReader for SqliteStore {
    fn contains_column(&self, column: &ColumnId) -> Result<bool> {
        let found: Option<i64> = self
            .conn()?
            .query_row(
                "SELECT 1 FROM nodes WHERE table_name = ?1 AND column_name = ?2",
                params![column.table, column.column],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn derived_targets(&self, column: &ColumnId) -> Result<Vec<ColumnId>> {
        let targets = self.targets_of(&NodeId::Column(column.clone()), EdgeKind::DerivedTo)?;
        Ok(targets
            .into_iter()
            .filter_map(|node| node.as_column().cloned())
            .collect())
    }

    fn owning_table(&self, column: &ColumnId) -> Result<Option<String>> {
        let owners = self.targets_of(&NodeId::Column(column.clone()), EdgeKind::BelongsTo)?;
        Ok(owners.first().map(|node| node.table_name().to_string()))
    }
}

impl GraphStore for SqliteStore {
    fn upsert_edges(&self, edges: &[LineageEdge]) -> Result<MergeStats> {
        let mut conn = self.conn()?;
        let mut stats = MergeStats::default();

        // One transaction per edge: an edge never lands without its endpoints,
        // but the call as a whole is not atomic.
        for edge in edges {
            edge.validate()?;

            let tx = conn.transaction()?;
            stats.absorb(Self::ensure_node(&tx, &edge.from)?);
            stats.absorb(Self::ensure_node(&tx, &edge.to)?);
            stats.edges_created += Self::insert_edge(&tx, edge)?;
            tx.commit()?;
        }

        Ok(stats)
    }

    fn read_all(&self) -> Result<LineageGraph> {
        let conn = self.conn()?;

        let nodes = conn
            .prepare("SELECT table_name, column_name FROM nodes ORDER BY key")?
            .query_map([], |row| Ok(node_from_parts(row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let edge_rows = conn
            .prepare(
                "SELECT kind, from_table, from_column, to_table, to_column
                 FROM edges ORDER BY id",
            )?
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    node_from_parts(row.get(1)?, row.get(2)?),
                    node_from_parts(row.get(3)?, row.get(4)?),
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(conn);

        let mut graph = LineageGraph::new();
        for node in nodes {
            graph.add_node(node);
        }
        for (kind, from, to) in edge_rows {
            graph.merge_edge(LineageEdge {
                from,
                to,
                kind: kind.parse()?,
            })?;
        }

        Ok(graph)
    }

    fn stats(&self) -> Result<GraphStats> {
        let conn = self.conn()?;
        let mut stats = GraphStats::default();

        let labels = conn
            .prepare("SELECT label, COUNT(*) FROM nodes GROUP BY label")?
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for (label, count) in labels {
            match label.as_str() {
                "Table" => stats.tables = count as usize,
                "Column" => stats.columns = count as usize,
                _ => {}
            }
        }

        let kinds = conn
            .prepare("SELECT kind, COUNT(*) FROM edges GROUP BY kind")?
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for (kind, count) in kinds {
            stats.edges_by_kind.insert(kind.parse()?, count as usize);
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ImpactAnalyzer, ImpactStatus};
    use std::sync::Arc;

    fn derived(a: (&str, &str), b: (&str, &str)) -> LineageEdge {
        LineageEdge::derived(ColumnId::new(a.0, a.1), ColumnId::new(b.0, b.1))
    }

    fn sample_edges() -> Vec<LineageEdge> {
        vec![
            derived(("orders", "price"), ("total_sales", "revenue")),
            derived(("prices", "qty"), ("total_sales", "revenue")),
            LineageEdge::impacts("orders", "total_sales"),
            LineageEdge::impacts("prices", "total_sales"),
        ]
    }

    #[test]
    fn test_upsert_creates_nodes_and_ownership() {
        let store = SqliteStore::open_in_memory().unwrap();
        let stats = store.upsert_edges(&sample_edges()).unwrap();

        // 3 tables + 3 columns; 2 DERIVED_TO + 2 IMPACTS + 3 BELONGS_TO
        assert_eq!(stats.nodes_created, 6);
        assert_eq!(stats.edges_created, 7);
        assert_eq!(store.count_nodes().unwrap(), 6);
        assert_eq!(store.count_edges().unwrap(), 7);

        let revenue = ColumnId::new("total_sales", "revenue");
        assert!(store.contains_column(&revenue).unwrap());
        assert_eq!(store.owning_table(&revenue).unwrap(), Some("total_sales".to_string()));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_edges(&sample_edges()).unwrap();
        let once = store.read_all().unwrap();

        for _ in 0..4 {
            let stats = store.upsert_edges(&sample_edges()).unwrap();
            assert!(stats.is_noop());
        }

        assert_eq!(store.read_all().unwrap(), once);
        assert_eq!(store.count_edges().unwrap(), 7);
    }

    #[test]
    fn test_duplicates_within_one_call() {
        let store = SqliteStore::open_in_memory().unwrap();
        let edge = LineageEdge::spark_processed("raw", "clean");
        store.upsert_edges(&[edge.clone(), edge.clone(), edge]).unwrap();
        assert_eq!(store.count_edges().unwrap(), 1);
    }

    #[test]
    fn test_same_name_different_tables() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_edges(&[derived(("a", "id"), ("c", "id")), derived(("b", "id"), ("c", "id"))])
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.columns, 3);
        assert_eq!(stats.tables, 3);
    }

    #[test]
    fn test_derived_targets() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_edges(&[derived(("a", "x"), ("b", "y")), derived(("a", "x"), ("c", "z"))])
            .unwrap();

        let targets = store.derived_targets(&ColumnId::new("a", "x")).unwrap();
        assert_eq!(targets, vec![ColumnId::new("b", "y"), ColumnId::new("c", "z")]);
        assert!(store.derived_targets(&ColumnId::new("b", "y")).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_edge_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let bad = LineageEdge {
            from: NodeId::table("a"),
            to: NodeId::column("b", "y"),
            kind: EdgeKind::Impacts,
        };
        assert!(matches!(store.upsert_edges(&[bad]), Err(Error::InvalidEdge(_))));
        assert_eq!(store.count_nodes().unwrap(), 0);
    }

    #[test]
    fn test_stats_by_kind() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_edges(&sample_edges()).unwrap();
        store.upsert_edges(&[LineageEdge::spark_processed("orders", "total_sales")]).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.edges_of(EdgeKind::Impacts), 2);
        assert_eq!(stats.edges_of(EdgeKind::SparkProcessed), 1);
        assert_eq!(stats.edges_of(EdgeKind::BelongsTo), 3);
        assert_eq!(stats.edges_of(EdgeKind::DerivedTo), 2);
    }

    #[test]
    fn test_concurrent_upserts_converge() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let mut edges = sample_edges();
                    edges.push(LineageEdge::impacts(format!("src_{}", i), "total_sales"));
                    store.upsert_edges(&edges).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 7 shared edges + one distinct IMPACTS per thread
        assert_eq!(store.count_edges().unwrap(), 15);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineage.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.upsert_edges(&sample_edges()).unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.count_edges().unwrap(), 7);
        assert!(reopened.contains_column(&ColumnId::new("orders", "price")).unwrap());
    }

    #[test]
    fn test_hash_in_column_names_reads_back() {
        let extractor = crate::Extractor::new(crate::adapter::default_adapter(
            crate::adapter::SqlDialect::Generic,
            1 << 20,
        ));
        let edges = extractor
            .extract("INSERT INTO t SELECT CONCAT(o.a, '#') FROM orders o")
            .unwrap();

        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_edges(&edges).unwrap();

        let graph = store.read_all().unwrap();
        assert!(graph.contains_column(&ColumnId::new("t", "CONCAT(o.a, '#')")).unwrap());
        assert_eq!(graph.edge_count(), store.count_edges().unwrap());

        let report = ImpactAnalyzer::new(&store).check_impact("orders", "a").unwrap();
        assert_eq!(report.status, ImpactStatus::Danger);
        assert_eq!(report.impacted_tables, vec!["t".to_string()]);
    }

    #[test]
    fn test_hash_in_names_does_not_collide() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_edges(&[derived(("s", "a#b"), ("u", "v"))]).unwrap();

        assert!(store.contains_column(&ColumnId::new("s", "a#b")).unwrap());
        assert!(!store.contains_column(&ColumnId::new("s#a", "b")).unwrap());

        let report = ImpactAnalyzer::new(&store).check_impact("s#a", "b").unwrap();
        assert_eq!(report.status, ImpactStatus::Safe);
        let report = ImpactAnalyzer::new(&store).check_impact("s", "a#b").unwrap();
        assert_eq!(report.impacted_tables, vec!["u".to_string()]);

        let graph = store.read_all().unwrap();
        assert_eq!(graph.node_count(), 4);
        assert!(graph.contains_node(&NodeId::table("s")));
        assert!(!graph.contains_node(&NodeId::table("s#a")));
    }
}
