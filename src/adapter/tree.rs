//! Statement tree - the lineage-oriented view of one parsed SQL statement
//!
//! Adapters lower their parser's AST into this shape. The extractor only
//! ever sees a `StatementTree`, so fixtures can be built by hand in tests.

use serde::{Deserialize, Serialize};

/// One table reference as it appears in the statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    /// Table name, possibly schema-qualified (`db.orders`)
    pub name: String,
    /// Alias introduced in FROM / JOIN, if any
    pub alias: Option<String>,
    /// The alias was written as a quoted identifier
    #[serde(default)]
    pub alias_quoted: bool,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            alias_quoted: false,
        }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
            alias_quoted: false,
        }
    }
}

/// Subquery in FROM / JOIN with the alias it is referenced by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedTable {
    pub alias: String,
    #[serde(default)]
    pub alias_quoted: bool,
    pub tree: StatementTree,
}

impl DerivedTable {
    pub fn new(alias: impl Into<String>, tree: StatementTree) -> Self {
        Self {
            alias: alias.into(),
            alias_quoted: false,
            tree,
        }
    }

    /// Projection producing the named output column
    pub fn output_column(&self, name: &str) -> Option<&Projection> {
        let projections = self.tree.projections.as_deref()?;
        projections
            .iter()
            .find(|p| p.output_name() == name)
            .or_else(|| {
                projections
                    .iter()
                    .find(|p| p.output_name().eq_ignore_ascii_case(name))
            })
    }
}

/// Expression subtree of a projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExprNode {
    /// Column reference, with the qualifier as written (`a` in `a.price`)
    Column {
        qualifier: Option<String>,
        #[serde(default)]
        qualifier_quoted: bool,
        name: String,
    },
    Literal(String),
    /// Operator, function call or any other node with sub-expressions
    Composite {
        label: String,
        children: Vec<ExprNode>,
    },
}

impl ExprNode {
    pub fn column(qualifier: Option<&str>, name: impl Into<String>) -> Self {
        ExprNode::Column {
            qualifier: qualifier.map(str::to_string),
            qualifier_quoted: false,
            name: name.into(),
        }
    }

    pub fn qualified(qualifier: &str, name: impl Into<String>) -> Self {
        Self::column(Some(qualifier), name)
    }

    pub fn composite(label: impl Into<String>, children: Vec<ExprNode>) -> Self {
        ExprNode::Composite {
            label: label.into(),
            children,
        }
    }

    /// Direct sub-expressions
    pub fn children(&self) -> &[ExprNode] {
        match self {
            ExprNode::Composite { children, .. } => children,
            _ => &[],
        }
    }
}

/// One SELECT output expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    pub alias: Option<String>,
    /// Name the parser infers when there is no alias
    pub inferred_name: String,
    pub expr: ExprNode,
}

impl Projection {
    /// Output column name: the alias if present, else the inferred name
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.inferred_name)
    }
}

/// Lineage-oriented statement tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementTree {
    /// Table references in order of appearance (the INSERT target comes first)
    pub tables: Vec<TableRef>,
    /// SELECT clause projections; `None` when the statement has no SELECT
    pub projections: Option<Vec<Projection>>,
    /// Aliased subqueries of the outermost FROM / JOIN clauses
    #[serde(default)]
    pub derived: Vec<DerivedTable>,
}

/// Unquoted identifiers compare case-insensitively; a quoted one matches exactly
fn ident_eq(written: &str, written_quoted: bool, declared: &str, declared_quoted: bool) -> bool {
    if written_quoted || declared_quoted {
        written == declared
    } else {
        written.eq_ignore_ascii_case(declared)
    }
}

impl StatementTree {
    /// First table reference in the statement
    pub fn first_table(&self) -> Option<&TableRef> {
        self.tables.first()
    }

    /// Resolve a column qualifier to a table name: aliases first, then
    /// un-aliased table names, then the qualifier itself.
    pub fn resolve_qualifier(&self, qualifier: &str, quoted: bool) -> String {
        let by_alias = self.tables.iter().find(|t| {
            t.alias
                .as_deref()
                .is_some_and(|alias| ident_eq(qualifier, quoted, alias, t.alias_quoted))
        });
        let by_name = || {
            self.tables
                .iter()
                .find(|t| t.alias.is_none() && ident_eq(qualifier, quoted, &t.name, false))
        };

        by_alias
            .or_else(by_name)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| qualifier.to_string())
    }

    /// Subquery a qualifier refers to, if any
    pub fn derived_table(&self, qualifier: &str, quoted: bool) -> Option<&DerivedTable> {
        self.derived
            .iter()
            .find(|d| ident_eq(qualifier, quoted, &d.alias, d.alias_quoted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_name_prefers_alias() {
        let projection = Projection {
            alias: Some("revenue".into()),
            inferred_name: "a.price * b.qty".into(),
            expr: ExprNode::Literal("1".into()),
        };
        assert_eq!(projection.output_name(), "revenue");
    }

    #[test]
    fn test_resolve_qualifier() {
        let tree = StatementTree {
            tables: vec![
                TableRef::new("total_sales"),
                TableRef::aliased("orders", "a"),
                TableRef::new("prices"),
            ],
            ..Default::default()
        };
        assert_eq!(tree.resolve_qualifier("a", false), "orders");
        assert_eq!(tree.resolve_qualifier("prices", false), "prices");
        assert_eq!(tree.resolve_qualifier("unknown", false), "unknown");
    }

    #[test]
    fn test_unquoted_qualifier_ignores_case() {
        let tree = StatementTree {
            tables: vec![TableRef::new("t"), TableRef::aliased("orders", "o"), TableRef::new("fx")],
            ..Default::default()
        };
        assert_eq!(tree.resolve_qualifier("O", false), "orders");
        assert_eq!(tree.resolve_qualifier("FX", false), "fx");
        // A quoted qualifier must match exactly
        assert_eq!(tree.resolve_qualifier("O", true), "O");
        assert_eq!(tree.resolve_qualifier("o", true), "orders");
    }

    #[test]
    fn test_quoted_alias_matches_exactly() {
        let mut alias = TableRef::aliased("orders", "Ord");
        alias.alias_quoted = true;
        let tree = StatementTree {
            tables: vec![TableRef::new("t"), alias],
            ..Default::default()
        };
        assert_eq!(tree.resolve_qualifier("Ord", false), "orders");
        assert_eq!(tree.resolve_qualifier("ord", false), "ord");
    }

    #[test]
    fn test_derived_table_lookup() {
        let inner = StatementTree {
            tables: vec![TableRef::aliased("orders", "o")],
            projections: Some(vec![Projection {
                alias: Some("x".into()),
                inferred_name: "amount".into(),
                expr: ExprNode::qualified("o", "amount"),
            }]),
            ..Default::default()
        };
        let tree = StatementTree {
            tables: vec![TableRef::new("t"), TableRef::aliased("orders", "o")],
            projections: None,
            derived: vec![DerivedTable::new("s", inner)],
        };

        let derived = tree.derived_table("S", false).unwrap();
        assert_eq!(derived.output_column("X").unwrap().inferred_name, "amount");
        assert!(derived.output_column("y").is_none());
        assert!(tree.derived_table("o", false).is_none());
    }
}
