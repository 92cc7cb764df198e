//! Lineage extraction
//!
//! Turns one SQL statement into lineage edges:
//! - one `DERIVED_TO` per qualified column reference feeding a projection
//! - one `IMPACTS` per distinct source table
//!
//! Unqualified column references are ambiguous without a schema and produce
//! no edge. A reference through a subquery alias is traced to the columns
//! that feed the subquery's output column.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::adapter::{ExprNode, SqlAdapter, SqlParserAdapter, StatementTree};
use crate::edge::LineageEdge;
use crate::node::ColumnId;
use crate::{Error, Result};

/// Table-level lineage of one statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLineage {
    pub target: String,
    /// Distinct source tables in order of first appearance, target excluded
    pub sources: Vec<String>,
}

impl TableLineage {
    /// Batch-path edges: one SPARK_PROCESSED per source
    pub fn spark_processed_edges(&self) -> Vec<LineageEdge> {
        self.sources
            .iter()
            .map(|source| LineageEdge::spark_processed(source.clone(), self.target.clone()))
            .collect()
    }
}

/// Stateless extractor over an injected SQL adapter. Safe to share across threads.
#[derive(Clone)]
pub struct Extractor {
    adapter: Arc<dyn SqlAdapter>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(Arc::new(SqlParserAdapter::default()))
    }
}

impl Extractor {
    pub fn new(adapter: Arc<dyn SqlAdapter>) -> Self {
        Self { adapter }
    }

    pub fn dialect_name(&self) -> &str {
        self.adapter.dialect_name()
    }

    /// Column- and table-level edges for one statement
    pub fn extract(&self, sql: &str) -> Result<Vec<LineageEdge>> {
        let tree = self.adapter.parse(sql)?;
        lineage_from_tree(&tree)
    }

    /// Table-level lineage only; does not require a SELECT clause
    pub fn extract_tables(&self, sql: &str) -> Result<TableLineage> {
        let tree = self.adapter.parse(sql)?;
        table_lineage_from_tree(&tree)
    }
}

/// Derive lineage edges from a statement tree.
///
/// The target table is the first table reference; each projection's output
/// name is the target column.
pub fn lineage_from_tree(tree: &StatementTree) -> Result<Vec<LineageEdge>> {
    let projections = tree.projections.as_ref().ok_or_else(|| {
        Error::UnsupportedStatement("statement has no SELECT clause".to_string())
    })?;
    let tables = table_lineage_from_tree(tree)?;

    let mut edges = Vec::new();

    for projection in projections {
        let target_column = projection.output_name();
        if target_column.is_empty() {
            continue;
        }

        let mut sources = Vec::new();
        collect_sources(tree, &projection.expr, &mut sources);

        for source in sources {
            edges.push(LineageEdge::derived(
                source,
                ColumnId::new(tables.target.clone(), target_column),
            ));
        }
    }

    for source in &tables.sources {
        edges.push(LineageEdge::impacts(source.clone(), tables.target.clone()));
    }

    Ok(edges)
}

/// Target plus distinct source tables of a statement tree
pub fn table_lineage_from_tree(tree: &StatementTree) -> Result<TableLineage> {
    let target = tree
        .first_table()
        .map(|t| t.name.clone())
        .ok_or_else(|| Error::UnsupportedStatement("statement references no table".to_string()))?;

    let mut seen = BTreeSet::new();
    let sources = tree
        .tables
        .iter()
        .map(|t| t.name.clone())
        .filter(|name| *name != target && seen.insert(name.clone()))
        .collect();

    Ok(TableLineage { target, sources })
}

/// Depth-first walk collecting the source column of every qualified reference
fn collect_sources(tree: &StatementTree, node: &ExprNode, out: &mut Vec<ColumnId>) {
    match node {
        ExprNode::Column {
            qualifier: Some(qualifier),
            qualifier_quoted,
            name,
        } => resolve_reference(tree, qualifier, *qualifier_quoted, name, out),
        ExprNode::Column { qualifier: None, .. } | ExprNode::Literal(_) => {}
        ExprNode::Composite { children, .. } => {
            for child in children {
                collect_sources(tree, child, out);
            }
        }
    }
}

fn resolve_reference(
    tree: &StatementTree,
    qualifier: &str,
    quoted: bool,
    column: &str,
    out: &mut Vec<ColumnId>,
) {
    if column.is_empty() {
        return;
    }

    if let Some(derived) = tree.derived_table(qualifier, quoted) {
        // Output columns the subquery does not name (wildcards) stay untraced
        if let Some(projection) = derived.output_column(column) {
            collect_sources(&derived.tree, &projection.expr, out);
        }
        return;
    }

    let table = tree.resolve_qualifier(qualifier, quoted);
    if !table.is_empty() {
        out.push(ColumnId::new(table, column));
    }
}
