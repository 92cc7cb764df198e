//! Edge types - lineage relationships
//!
//! Four relations make up the lineage graph:
//! - `Impacts`: table → table, from single-statement extraction
//! - `SparkProcessed`: table → table, from batch log ingestion
//! - `BelongsTo`: column → table (ownership)
//! - `DerivedTo`: column → column, the field-level lineage used by impact queries

use crate::node::{ColumnId, NodeId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lineage edge kinds. Wire names match the graph relation names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    Impacts,
    SparkProcessed,
    BelongsTo,
    DerivedTo,
}

impl EdgeKind {
    /// Get the string representation of the edge kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Impacts => "IMPACTS",
            EdgeKind::SparkProcessed => "SPARK_PROCESSED",
            EdgeKind::BelongsTo => "BELONGS_TO",
            EdgeKind::DerivedTo => "DERIVED_TO",
        }
    }

    /// Get all edge kinds
    pub fn all() -> &'static [EdgeKind] {
        &[
            EdgeKind::Impacts,
            EdgeKind::SparkProcessed,
            EdgeKind::BelongsTo,
            EdgeKind::DerivedTo,
        ]
    }

    /// Table-level lineage relations
    pub fn is_table_level(&self) -> bool {
        matches!(self, EdgeKind::Impacts | EdgeKind::SparkProcessed)
    }

    /// Check that `from` and `to` have the node labels this kind connects
    pub fn accepts(&self, from: &NodeId, to: &NodeId) -> bool {
        match self {
            EdgeKind::Impacts | EdgeKind::SparkProcessed => from.is_table() && to.is_table(),
            EdgeKind::BelongsTo => !from.is_table() && to.is_table(),
            EdgeKind::DerivedTo => !from.is_table() && !to.is_table(),
        }
    }
}

impl FromStr for EdgeKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "IMPACTS" => Ok(EdgeKind::Impacts),
            "SPARK_PROCESSED" => Ok(EdgeKind::SparkProcessed),
            "BELONGS_TO" => Ok(EdgeKind::BelongsTo),
            "DERIVED_TO" => Ok(EdgeKind::DerivedTo),
            _ => Err(crate::Error::InvalidEdge(format!("Unknown edge kind: {}", s))),
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed lineage relationship.
///
/// Identity is the `(kind, from, to)` triple: the store keeps at most one
/// edge per triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineageEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
}

impl LineageEdge {
    /// Field-level lineage: `source` feeds `target`
    pub fn derived(source: ColumnId, target: ColumnId) -> Self {
        Self {
            from: NodeId::Column(source),
            to: NodeId::Column(target),
            kind: EdgeKind::DerivedTo,
        }
    }

    /// Table-level lineage from single-statement extraction
    pub fn impacts(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            from: NodeId::table(source),
            to: NodeId::table(target),
            kind: EdgeKind::Impacts,
        }
    }

    /// Table-level lineage from batch ingestion
    pub fn spark_processed(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            from: NodeId::table(source),
            to: NodeId::table(target),
            kind: EdgeKind::SparkProcessed,
        }
    }

    /// Ownership edge for a column
    pub fn belongs_to(column: ColumnId) -> Self {
        let table = NodeId::table(column.table.clone());
        Self {
            from: NodeId::Column(column),
            to: table,
            kind: EdgeKind::BelongsTo,
        }
    }

    /// Check endpoint labels against the kind
    pub fn validate(&self) -> crate::Result<()> {
        if !self.kind.accepts(&self.from, &self.to) {
            return Err(crate::Error::InvalidEdge(format!(
                "{} cannot connect {} to {}",
                self.kind,
                self.from.label(),
                self.to.label()
            )));
        }
        if self.kind == EdgeKind::BelongsTo && self.from.table_name() != self.to.table_name() {
            return Err(crate::Error::InvalidEdge(format!(
                "{} cannot belong to {}",
                self.from, self.to
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for LineageEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -[{}]-> {}",
            self.from.display_name(),
            self.kind,
            self.to.display_name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_kind_roundtrip() {
        for kind in EdgeKind::all() {
            let parsed: EdgeKind = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
        assert!("calls".parse::<EdgeKind>().is_err());
    }

    #[test]
    fn test_serde_wire_name() {
        let json = serde_json::to_string(&EdgeKind::SparkProcessed).unwrap();
        assert_eq!(json, "\"SPARK_PROCESSED\"");
    }

    #[test]
    fn test_constructors_are_valid() {
        let col = ColumnId::new("orders", "amount");
        assert!(LineageEdge::derived(col.clone(), ColumnId::new("sales", "total")).validate().is_ok());
        assert!(LineageEdge::impacts("orders", "sales").validate().is_ok());
        assert!(LineageEdge::spark_processed("orders", "sales").validate().is_ok());
        assert!(LineageEdge::belongs_to(col).validate().is_ok());
    }

    #[test]
    fn test_mismatched_endpoints_rejected() {
        let edge = LineageEdge {
            from: NodeId::table("orders"),
            to: NodeId::column("sales", "total"),
            kind: EdgeKind::DerivedTo,
        };
        assert!(edge.validate().is_err());

        let foreign_owner = LineageEdge {
            from: NodeId::column("orders", "amount"),
            to: NodeId::table("sales"),
            kind: EdgeKind::BelongsTo,
        };
        assert!(foreign_owner.validate().is_err());
    }

    #[test]
    fn test_edge_identity_ignores_construction_path() {
        let a = LineageEdge::impacts("a", "b");
        let b = LineageEdge {
            from: NodeId::table("a"),
            to: NodeId::table("b"),
            kind: EdgeKind::Impacts,
        };
        assert_eq!(a, b);
        assert_ne!(a, LineageEdge::spark_processed("a", "b"));
    }
}
