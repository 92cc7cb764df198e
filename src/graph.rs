//! Lineage Graph - In-memory representation of the lineage graph
//!
//! Used as the snapshot returned by `GraphStore::read_all`, as the backing
//! structure of `MemoryStore`, and directly by the impact analyzer.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use serde::{Deserialize, Serialize};
use crate::edge::{EdgeKind, LineageEdge};
use crate::node::{ColumnId, NodeId};
use crate::storage::GraphReader;
use crate::Result;

/// Counts of what a merge actually created. Zero on a repeated merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    pub nodes_created: usize,
    pub edges_created: usize,
}

impl MergeStats {
    pub fn absorb(&mut self, other: MergeStats) {
        self.nodes_created += other.nodes_created;
        self.edges_created += other.edges_created;
    }

    pub fn is_noop(&self) -> bool {
        self.nodes_created == 0 && self.edges_created == 0
    }
}

/// In-memory lineage graph with set semantics for nodes and edges.
#[derive(Debug, Default, Clone)]
pub struct LineageGraph {
    /// All nodes, ordered by key
    nodes: BTreeSet<NodeId>,
    /// All edges, unique per (kind, from, to)
    edges: BTreeSet<LineageEdge>,
    /// Outgoing edges per node
    edges_from: HashMap<NodeId, Vec<LineageEdge>>,
}

impl LineageGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a node exists. A new column also gets its table and BELONGS_TO edge.
    pub fn add_node(&mut self, node: NodeId) -> MergeStats {
        let mut stats = MergeStats::default();
        if self.nodes.contains(&node) {
            return stats;
        }

        if let NodeId::Column(col) = &node {
            let owner = LineageEdge::belongs_to(col.clone());
            if self.nodes.insert(owner.to.clone()) {
                stats.nodes_created += 1;
            }
            self.nodes.insert(node);
            stats.nodes_created += 1;
            if self.insert_edge(owner) {
                stats.edges_created += 1;
            }
        } else {
            self.nodes.insert(node);
            stats.nodes_created += 1;
        }

        stats
    }

    /// Create-if-absent merge of one edge and its endpoints
    pub fn merge_edge(&mut self, edge: LineageEdge) -> Result<MergeStats> {
        edge.validate()?;

        let mut stats = self.add_node(edge.from.clone());
        stats.absorb(self.add_node(edge.to.clone()));
        if self.insert_edge(edge) {
            stats.edges_created += 1;
        }
        Ok(stats)
    }

    /// Merge a whole edge set
    pub fn merge_edges(&mut self, edges: &[LineageEdge]) -> Result<MergeStats> {
        let mut stats = MergeStats::default();
        for edge in edges {
            stats.absorb(self.merge_edge(edge.clone())?);
        }
        Ok(stats)
    }

    fn insert_edge(&mut self, edge: LineageEdge) -> bool {
        if !self.edges.insert(edge.clone()) {
            return false;
        }
        self.edges_from.entry(edge.from.clone()).or_default().push(edge);
        true
    }

    pub fn contains_node(&self, node: &NodeId) -> bool {
        self.nodes.contains(node)
    }

    pub fn contains_edge(&self, edge: &LineageEdge) -> bool {
        self.edges.contains(edge)
    }

    /// Get outgoing edges from a node
    pub fn get_edges_from(&self, node: &NodeId) -> &[LineageEdge] {
        self.edges_from.get(node).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Get outgoing edges of a specific kind
    pub fn get_edges_from_by_kind(&self, node: &NodeId, kind: EdgeKind) -> Vec<&LineageEdge> {
        self.get_edges_from(node)
            .iter()
            .filter(|e| e.kind == kind)
            .collect()
    }

    /// Get all nodes
    pub fn all_nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter()
    }

    /// Get all edges
    pub fn all_edges(&self) -> impl Iterator<Item = &LineageEdge> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Projection for visualization: nodes by name, edges by endpoint names
    pub fn view(&self) -> GraphView {
        let nodes = self
            .nodes
            .iter()
            .map(|node| GraphNodeView {
                key: node.to_key_string(),
                name: node.display_name(),
                label: node.label().to_string(),
            })
            .collect();

        let edges = self
            .edges
            .iter()
            .map(|edge| GraphEdgeView {
                source: edge.from.display_name(),
                target: edge.to.display_name(),
                relation: edge.kind,
            })
            .collect();

        GraphView { nodes, edges }
    }

    /// Get statistics about the graph
    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats::default();
        for node in &self.nodes {
            match node {
                NodeId::Table(_) => stats.tables += 1,
                NodeId::Column(_) => stats.columns += 1,
            }
        }
        for edge in &self.edges {
            *stats.edges_by_kind.entry(edge.kind).or_default() += 1;
        }
        stats
    }
}

// Two graphs are equal when they hold the same node and edge sets,
// regardless of insertion order.
impl PartialEq for LineageGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.edges == other.edges
    }
}

impl Eq for LineageGraph {}

impl GraphReader for LineageGraph {
    fn contains_column(&self, column: &ColumnId) -> Result<bool> {
        Ok(self.nodes.contains(&NodeId::Column(column.clone())))
    }

    fn derived_targets(&self, column: &ColumnId) -> Result<Vec<ColumnId>> {
        let node = NodeId::Column(column.clone());
        Ok(self
            .get_edges_from_by_kind(&node, EdgeKind::DerivedTo)
            .into_iter()
            .filter_map(|edge| edge.to.as_column().cloned())
            .collect())
    }

    fn owning_table(&self, column: &ColumnId) -> Result<Option<String>> {
        let node = NodeId::Column(column.clone());
        Ok(self
            .get_edges_from_by_kind(&node, EdgeKind::BelongsTo)
            .first()
            .map(|edge| edge.to.table_name().to_string()))
    }
}

/// Graph node as exposed to visualization clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNodeView {
    pub key: String,
    pub name: String,
    pub label: String,
}

/// Graph edge as exposed to visualization clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdgeView {
    pub source: String,
    pub target: String,
    pub relation: EdgeKind,
}

/// Full node and edge projection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNodeView>,
    pub edges: Vec<GraphEdgeView>,
}

/// Statistics about a lineage graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub tables: usize,
    pub columns: usize,
    pub edges_by_kind: BTreeMap<EdgeKind, usize>,
}

impl GraphStats {
    pub fn total_edges(&self) -> usize {
        self.edges_by_kind.values().sum()
    }

    pub fn edges_of(&self, kind: EdgeKind) -> usize {
        self.edges_by_kind.get(&kind).copied().unwrap_or(0)
    }
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Lineage Graph Statistics:")?;
        writeln!(f, "  Tables: {}", self.tables)?;
        writeln!(f, "  Columns: {}", self.columns)?;
        write!(f, "  Edges: {}", self.total_edges())?;
        for kind in EdgeKind::all() {
            write!(f, "\n    {}: {}", kind, self.edges_of(*kind))?;
        }
        Ok(())
    }
}
