//! Impact analysis
//!
//! Answers "if this column is removed, which tables break?":
//! - locate the column node
//! - BFS over outgoing DERIVED_TO edges, each node visited once
//! - project reachable columns to their owning tables

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;
use crate::node::ColumnId;
use crate::storage::GraphReader;

/// Verdict of an impact check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImpactStatus {
    Safe,
    Danger,
}

impl ImpactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactStatus::Safe => "SAFE",
            ImpactStatus::Danger => "DANGER",
        }
    }

    pub fn is_danger(&self) -> bool {
        matches!(self, ImpactStatus::Danger)
    }
}

impl fmt::Display for ImpactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of an impact check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactReport {
    pub status: ImpactStatus,
    /// Owning tables of every reachable column, sorted and unique
    pub impacted_tables: Vec<String>,
    /// `table.column` that was checked
    pub deleted_field: String,
    /// Every column reachable over DERIVED_TO, sorted
    #[serde(default)]
    pub impacted_columns: Vec<ColumnId>,
}

impl ImpactReport {
    fn safe(origin: &ColumnId) -> Self {
        Self {
            status: ImpactStatus::Safe,
            impacted_tables: Vec::new(),
            deleted_field: origin.qualified_name(),
            impacted_columns: Vec::new(),
        }
    }

    pub fn is_danger(&self) -> bool {
        self.status.is_danger()
    }
}

/// Impact analyzer over any graph reader (a store or an in-memory snapshot)
pub struct ImpactAnalyzer<'a, R: GraphReader + ?Sized> {
    reader: &'a R,
}

impl<'a, R: GraphReader + ?Sized> ImpactAnalyzer<'a, R> {
    pub fn new(reader: &'a R) -> Self {
        Self { reader }
    }

    /// Downstream tables affected by removing `table.column`.
    ///
    /// An unknown column is SAFE, not an error.
    pub fn check_impact(&self, table: &str, column: &str) -> Result<ImpactReport> {
        let origin = ColumnId::new(table, column);
        if !self.reader.contains_column(&origin)? {
            debug!(column = %origin, "column not in graph");
            return Ok(ImpactReport::safe(&origin));
        }

        let reachable = self.reachable_columns(&origin)?;

        let mut tables = BTreeSet::new();
        for col in &reachable {
            let owner = self
                .reader
                .owning_table(col)?
                .unwrap_or_else(|| col.table.clone());
            tables.insert(owner);
        }

        let status = if tables.is_empty() {
            ImpactStatus::Safe
        } else {
            ImpactStatus::Danger
        };
        debug!(column = %origin, reachable = reachable.len(), %status, "impact computed");

        Ok(ImpactReport {
            status,
            impacted_tables: tables.into_iter().collect(),
            deleted_field: origin.qualified_name(),
            impacted_columns: reachable.into_iter().collect(),
        })
    }

    /// Columns reachable in one or more DERIVED_TO hops. The origin is
    /// included only if a cycle leads back to it.
    fn reachable_columns(&self, origin: &ColumnId) -> Result<BTreeSet<ColumnId>> {
        let mut visited = HashSet::new();
        let mut reachable = BTreeSet::new();
        let mut queue = VecDeque::new();

        queue.push_back(origin.clone());

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }

            for next in self.reader.derived_targets(&current)? {
                reachable.insert(next.clone());
                if !visited.contains(&next) {
                    queue.push_back(next);
                }
            }
        }

        Ok(reachable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::LineageEdge;
    use crate::graph::LineageGraph;
    use crate::storage::{GraphStore, SqliteStore};

    fn derived(a: (&str, &str), b: (&str, &str)) -> LineageEdge {
        LineageEdge::derived(ColumnId::new(a.0, a.1), ColumnId::new(b.0, b.1))
    }

    fn graph_of(edges: &[LineageEdge]) -> LineageGraph {
        let mut graph = LineageGraph::new();
        graph.merge_edges(edges).unwrap();
        graph
    }

    #[test]
    fn test_chain_reaches_all_downstream_tables() {
        let graph = graph_of(&[derived(("A", "x"), ("B", "y")), derived(("B", "y"), ("C", "z"))]);

        let report = ImpactAnalyzer::new(&graph).check_impact("A", "x").unwrap();
        assert_eq!(report.status, ImpactStatus::Danger);
        assert_eq!(report.impacted_tables, vec!["B".to_string(), "C".to_string()]);
        assert_eq!(report.deleted_field, "A.x");
        assert_eq!(
            report.impacted_columns,
            vec![ColumnId::new("B", "y"), ColumnId::new("C", "z")]
        );
    }

    #[test]
    fn test_cycle_terminates() {
        let graph = graph_of(&[derived(("A", "x"), ("B", "y")), derived(("B", "y"), ("A", "x"))]);

        let report = ImpactAnalyzer::new(&graph).check_impact("A", "x").unwrap();
        assert!(report.is_danger());
        assert_eq!(report.impacted_tables, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(report.impacted_columns.len(), 2);
    }

    #[test]
    fn test_leaf_column_is_safe() {
        let graph = graph_of(&[derived(("A", "x"), ("B", "y"))]);

        let report = ImpactAnalyzer::new(&graph).check_impact("B", "y").unwrap();
        assert_eq!(report.status, ImpactStatus::Safe);
        assert!(report.impacted_tables.is_empty());
    }

    #[test]
    fn test_unknown_column_is_safe() {
        let graph = LineageGraph::new();
        let report = ImpactAnalyzer::new(&graph).check_impact("nope", "missing").unwrap();
        assert_eq!(report.status, ImpactStatus::Safe);
        assert_eq!(report.deleted_field, "nope.missing");
    }

    #[test]
    fn test_diamond_deduplicates_tables() {
        let graph = graph_of(&[
            derived(("orders", "amount"), ("daily", "total")),
            derived(("orders", "amount"), ("daily", "avg")),
            derived(("daily", "total"), ("report", "sum")),
            derived(("daily", "avg"), ("report", "sum")),
        ]);

        let report = ImpactAnalyzer::new(&graph).check_impact("orders", "amount").unwrap();
        assert_eq!(report.impacted_tables, vec!["daily".to_string(), "report".to_string()]);
        assert_eq!(report.impacted_columns.len(), 3);
    }

    #[test]
    fn test_against_sqlite_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_edges(&[derived(("A", "x"), ("B", "y")), derived(("B", "y"), ("C", "z"))])
            .unwrap();

        let store: &dyn GraphStore = &store;
        let report = ImpactAnalyzer::new(store).check_impact("A", "x").unwrap();
        assert_eq!(report.impacted_tables, vec!["B".to_string(), "C".to_string()]);
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&ImpactStatus::Danger).unwrap();
        assert_eq!(json, "\"DANGER\"");
    }
}
