//! Node identity - stable keys for tables and columns
//!
//! Format:
//! - `table:<name>`
//! - `column:<table>#<column>`
//!
//! Inside a column key, `\` and `#` in either part are escaped with a
//! backslash, so the separating `#` is always the only bare one.
//!
//! Examples:
//! - `table:orders`
//! - `column:warehouse.orders#amount`
//! - `column:t#CONCAT(o.a, '\#')`

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const TABLE_PREFIX: &str = "table:";
const COLUMN_PREFIX: &str = "column:";

/// Composite identity of a column: the owning table plus the column name.
///
/// Two columns with the same name in different tables are different nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnId {
    pub table: String,
    pub column: String,
}

impl ColumnId {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Dotted display name, e.g. `orders.amount`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// A node in the lineage graph.
///
/// The key string serves as the primary key for nodes and edge endpoints in storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Table(String),
    Column(ColumnId),
}

impl NodeId {
    pub fn table(name: impl Into<String>) -> Self {
        NodeId::Table(name.into())
    }

    pub fn column(table: impl Into<String>, column: impl Into<String>) -> Self {
        NodeId::Column(ColumnId::new(table, column))
    }

    /// Node label as stored and rendered (`Table` / `Column`)
    pub fn label(&self) -> &'static str {
        match self {
            NodeId::Table(_) => "Table",
            NodeId::Column(_) => "Column",
        }
    }

    /// Human-readable name: the table name, or `table.column`
    pub fn display_name(&self) -> String {
        match self {
            NodeId::Table(name) => name.clone(),
            NodeId::Column(col) => col.qualified_name(),
        }
    }

    /// Name of the table this node is, or belongs to
    pub fn table_name(&self) -> &str {
        match self {
            NodeId::Table(name) => name,
            NodeId::Column(col) => &col.table,
        }
    }

    pub fn as_column(&self) -> Option<&ColumnId> {
        match self {
            NodeId::Column(col) => Some(col),
            NodeId::Table(_) => None,
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, NodeId::Table(_))
    }

    /// Parse a key string into a NodeId
    pub fn parse(key: &str) -> Result<Self> {
        if let Some(name) = key.strip_prefix(TABLE_PREFIX) {
            if name.is_empty() {
                return Err(Error::InvalidNode("table key must carry a name".to_string()));
            }
            return Ok(NodeId::Table(name.to_string()));
        }

        let rest = key
            .strip_prefix(COLUMN_PREFIX)
            .ok_or_else(|| Error::InvalidNode(format!("unknown node key: {}", key)))?;

        let (table, column) = split_column_key(rest)
            .ok_or_else(|| Error::InvalidNode(format!("malformed column key: {}", key)))?;

        if table.is_empty() || column.is_empty() {
            return Err(Error::InvalidNode(format!("incomplete column key: {}", key)));
        }

        Ok(NodeId::column(table, column))
    }

    /// Convert to key string
    pub fn to_key_string(&self) -> String {
        match self {
            NodeId::Table(name) => format!("{}{}", TABLE_PREFIX, name),
            NodeId::Column(col) => format!(
                "{}{}#{}",
                COLUMN_PREFIX,
                escape_part(&col.table),
                escape_part(&col.column)
            ),
        }
    }
}

fn escape_part(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for c in part.chars() {
        if c == '\\' || c == '#' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Split `<table>#<column>` on the single unescaped `#`, unescaping both parts
fn split_column_key(rest: &str) -> Option<(String, String)> {
    let mut table = String::new();
    let mut column = String::new();
    let mut in_column = false;
    let mut chars = rest.chars();

    while let Some(c) = chars.next() {
        let part = if in_column { &mut column } else { &mut table };
        match c {
            '\\' => match chars.next()? {
                escaped @ ('\\' | '#') => part.push(escaped),
                _ => return None,
            },
            '#' if in_column => return None,
            '#' => in_column = true,
            _ => part.push(c),
        }
    }

    in_column.then_some((table, column))
}

impl From<ColumnId> for NodeId {
    fn from(col: ColumnId) -> Self {
        NodeId::Column(col)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_key_string())
    }
}

impl FromStr for NodeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for NodeId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_key_string())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NodeId::parse(&s).map_err(serde::de::Error::custom)
    }
}
