use tabled::{settings::Style, Table, Tabled};

use crate::edge::EdgeKind;
use crate::graph::GraphStats;
use crate::ingest::MetricsSnapshot;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: impl ToString) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

/// Node counts and one row per edge kind
pub fn graph_stats_table(stats: &GraphStats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Tables", stats.tables);
    builder.add_row("Columns", stats.columns);
    for kind in EdgeKind::all() {
        builder.add_row(kind.as_str(), stats.edges_of(*kind));
    }
    builder.add_row("Total edges", stats.total_edges());
    builder.build()
}

pub fn metrics_table(metrics: &MetricsSnapshot) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Submitted", metrics.submitted);
    builder.add_row("Processed", metrics.processed);
    builder.add_row("Failed", metrics.failed);
    builder.add_row("Pending", metrics.pending());
    builder.build()
}
