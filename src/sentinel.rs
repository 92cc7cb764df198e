//! Schema sentinel
//!
//! Turns an impact report for a vanished column into a block/continue
//! verdict, for use as a pipeline gate.

use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::info;

use crate::Result;
use crate::query::{ImpactAnalyzer, ImpactReport};
use crate::storage::GraphReader;
use crate::ui::{theme, Icons};

/// What a pipeline should do about a schema change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Downstream tables derive from the column
    Block,
    Continue,
}

#[derive(Debug, Clone, Serialize)]
pub struct SentinelOutcome {
    pub verdict: Verdict,
    pub report: ImpactReport,
}

impl SentinelOutcome {
    pub fn from_report(report: ImpactReport) -> Self {
        let verdict = if report.is_danger() {
            Verdict::Block
        } else {
            Verdict::Continue
        };
        Self { verdict, report }
    }

    /// Process exit code: 2 blocks the pipeline, 0 lets it continue
    pub fn exit_code(&self) -> i32 {
        match self.verdict {
            Verdict::Block => 2,
            Verdict::Continue => 0,
        }
    }

    /// Human-readable verdict lines
    pub fn render(&self) -> Vec<String> {
        match self.verdict {
            Verdict::Block => vec![
                format!(
                    "{} {}",
                    Icons::DIRECT,
                    "Blocking change: downstream jobs will fail".style(theme().error.clone())
                ),
                format!("{} Change source: {}", Icons::DIRECT, self.report.deleted_field),
                format!(
                    "{} Impacted tables: {}",
                    Icons::DIRECT,
                    self.report.impacted_tables.join(", ")
                ),
            ],
            Verdict::Continue => vec![format!(
                "{} {}",
                Icons::CHECK,
                "No downstream dependency, safe to continue".style(theme().success.clone())
            )],
        }
    }
}

/// Check a column that disappeared from the schema
pub fn check_column<R: GraphReader + ?Sized>(reader: &R, table: &str, column: &str) -> Result<SentinelOutcome> {
    info!(table, column, "schema change detected, checking impact");
    let report = ImpactAnalyzer::new(reader).check_impact(table, column)?;
    Ok(SentinelOutcome::from_report(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::LineageEdge;
    use crate::graph::LineageGraph;
    use crate::node::ColumnId;

    fn graph() -> LineageGraph {
        let mut graph = LineageGraph::new();
        graph
            .merge_edges(&[LineageEdge::derived(
                ColumnId::new("orders", "amount"),
                ColumnId::new("daily_revenue", "total"),
            )])
            .unwrap();
        graph
    }

    #[test]
    fn test_blocks_on_downstream_dependency() {
        let outcome = check_column(&graph(), "orders", "amount").unwrap();
        assert_eq!(outcome.verdict, Verdict::Block);
        assert_eq!(outcome.exit_code(), 2);

        let lines = outcome.render();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("orders.amount"));
        assert!(lines[2].contains("daily_revenue"));
    }

    #[test]
    fn test_continues_when_safe() {
        let outcome = check_column(&graph(), "orders", "status").unwrap();
        assert_eq!(outcome.verdict, Verdict::Continue);
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(outcome.render().len(), 1);
    }
}
