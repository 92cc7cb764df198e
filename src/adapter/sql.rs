//! sqlparser-backed adapter
//!
//! Lowers a `sqlparser` AST into a `StatementTree`. Table references are
//! collected with the AST visitor so that every relation in the statement
//! is seen, in source order. Aliased subqueries in FROM / JOIN are lowered
//! into nested trees so their output columns can be traced back.

use std::ops::ControlFlow;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlparser::ast::{
    self, Expr, ObjectName, Query, Select, SelectItem, SetExpr, TableFactor, Visit, Visitor,
};
use sqlparser::dialect::{
    AnsiDialect, Dialect, GenericDialect, HiveDialect, MySqlDialect, PostgreSqlDialect,
};
use sqlparser::parser::Parser;

use super::framework::SqlAdapter;
use super::tree::{DerivedTable, ExprNode, Projection, StatementTree, TableRef};
use crate::{Error, Result};

/// Default upper bound on statement text, in bytes
pub const DEFAULT_MAX_STATEMENT_BYTES: usize = 1024 * 1024;

/// SQL dialects the adapter can parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    Generic,
    Hive,
    Mysql,
    Postgres,
    Ansi,
}

impl SqlDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlDialect::Generic => "generic",
            SqlDialect::Hive => "hive",
            SqlDialect::Mysql => "mysql",
            SqlDialect::Postgres => "postgres",
            SqlDialect::Ansi => "ansi",
        }
    }

    fn build(&self) -> Box<dyn Dialect> {
        match self {
            SqlDialect::Generic => Box::new(GenericDialect {}),
            SqlDialect::Hive => Box::new(HiveDialect {}),
            SqlDialect::Mysql => Box::new(MySqlDialect {}),
            SqlDialect::Postgres => Box::new(PostgreSqlDialect {}),
            SqlDialect::Ansi => Box::new(AnsiDialect {}),
        }
    }
}

impl FromStr for SqlDialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "generic" => Ok(SqlDialect::Generic),
            // Spark SQL is Hive-compatible for the INSERT ... SELECT shape
            "hive" | "spark" => Ok(SqlDialect::Hive),
            "mysql" => Ok(SqlDialect::Mysql),
            "postgres" | "postgresql" => Ok(SqlDialect::Postgres),
            "ansi" => Ok(SqlDialect::Ansi),
            _ => Err(Error::Parse(format!("Unknown SQL dialect: {}", s))),
        }
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Adapter over the `sqlparser` crate
#[derive(Debug, Clone)]
pub struct SqlParserAdapter {
    dialect: SqlDialect,
    max_statement_bytes: usize,
}

impl Default for SqlParserAdapter {
    fn default() -> Self {
        Self::new(SqlDialect::Generic)
    }
}

impl SqlParserAdapter {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            max_statement_bytes: DEFAULT_MAX_STATEMENT_BYTES,
        }
    }

    pub fn with_max_statement_bytes(mut self, max: usize) -> Self {
        self.max_statement_bytes = max;
        self
    }
}

impl SqlAdapter for SqlParserAdapter {
    fn dialect_name(&self) -> &str {
        self.dialect.as_str()
    }

    fn parse(&self, sql: &str) -> Result<StatementTree> {
        if sql.len() > self.max_statement_bytes {
            return Err(Error::Parse(format!(
                "statement is {} bytes, limit is {}",
                sql.len(),
                self.max_statement_bytes
            )));
        }

        let dialect = self.dialect.build();
        let mut statements =
            Parser::parse_sql(dialect.as_ref(), sql).map_err(|e| Error::Parse(e.to_string()))?;

        if statements.len() != 1 {
            return Err(Error::Parse(format!(
                "expected exactly one statement, found {}",
                statements.len()
            )));
        }
        let statement = statements.remove(0);

        let mut collector = TreeCollector::default();
        let _ = statement.visit(&mut collector);
        Ok(collector.into_tree())
    }
}

/// Walks the AST once, recording table references and the first query's projections
#[derive(Default)]
struct TreeCollector {
    tables: Vec<TableRef>,
    projections: Option<Vec<Projection>>,
    derived: Vec<DerivedTable>,
    seen_query: bool,
    /// Name of a table factor just recorded with its alias; its relation
    /// visit follows immediately and must not be recorded twice.
    pending_factor: Option<ObjectName>,
    /// Number of derived table factors currently being walked
    derived_depth: usize,
}

impl TreeCollector {
    fn into_tree(self) -> StatementTree {
        StatementTree {
            tables: self.tables,
            projections: self.projections,
            derived: self.derived,
        }
    }
}

fn lower_subquery(query: &Query) -> StatementTree {
    let mut collector = TreeCollector::default();
    let _ = query.visit(&mut collector);
    collector.into_tree()
}

impl Visitor for TreeCollector {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if !self.seen_query {
            self.seen_query = true;
            self.projections = first_select(query.body.as_ref()).map(lower_projections);
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_table_factor(&mut self, table_factor: &TableFactor) -> ControlFlow<Self::Break> {
        match table_factor {
            TableFactor::Table { name, alias, .. } => {
                self.tables.push(TableRef {
                    name: object_name(name),
                    alias: alias.as_ref().map(|a| a.name.value.clone()),
                    alias_quoted: alias.as_ref().is_some_and(|a| a.name.quote_style.is_some()),
                });
                self.pending_factor = Some(name.clone());
            }
            TableFactor::Derived { subquery, alias, .. } => {
                // Nested subqueries are reachable through their parent's tree
                if self.derived_depth == 0 {
                    if let Some(alias) = alias {
                        self.derived.push(DerivedTable {
                            alias: alias.name.value.clone(),
                            alias_quoted: alias.name.quote_style.is_some(),
                            tree: lower_subquery(subquery),
                        });
                    }
                }
                self.derived_depth += 1;
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn post_visit_table_factor(&mut self, table_factor: &TableFactor) -> ControlFlow<Self::Break> {
        if matches!(table_factor, TableFactor::Derived { .. }) {
            self.derived_depth = self.derived_depth.saturating_sub(1);
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        if self.pending_factor.as_ref() == Some(relation) {
            self.pending_factor = None;
        } else {
            self.tables.push(TableRef::new(object_name(relation)));
        }
        ControlFlow::Continue(())
    }
}

fn first_select(body: &SetExpr) -> Option<&Select> {
    match body {
        SetExpr::Select(select) => Some(select),
        SetExpr::Query(query) => first_select(query.body.as_ref()),
        SetExpr::SetOperation { left, .. } => first_select(left),
        _ => None,
    }
}

fn lower_projections(select: &Select) -> Vec<Projection> {
    select
        .projection
        .iter()
        .filter_map(|item| match item {
            SelectItem::UnnamedExpr(expr) => Some(Projection {
                alias: None,
                inferred_name: infer_name(expr),
                expr: lower_expr(expr),
            }),
            SelectItem::ExprWithAlias { expr, alias } => Some(Projection {
                alias: Some(alias.value.clone()),
                inferred_name: infer_name(expr),
                expr: lower_expr(expr),
            }),
            // Wildcards need a schema to expand
            _ => None,
        })
        .collect()
}

fn infer_name(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(ident) => ident.value.clone(),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(|ident| ident.value.clone())
            .unwrap_or_default(),
        other => other.to_string(),
    }
}

fn lower_expr(expr: &Expr) -> ExprNode {
    match expr {
        Expr::Identifier(ident) => ExprNode::column(None, ident.value.clone()),
        Expr::CompoundIdentifier(parts) => match parts.split_last() {
            Some((column, qualifier)) if !qualifier.is_empty() => ExprNode::Column {
                qualifier_quoted: qualifier.iter().any(|ident| ident.quote_style.is_some()),
                qualifier: Some(
                    qualifier
                        .iter()
                        .map(|ident| ident.value.as_str())
                        .collect::<Vec<_>>()
                        .join("."),
                ),
                name: column.value.clone(),
            },
            Some((column, _)) => ExprNode::column(None, column.value.clone()),
            None => ExprNode::Literal(String::new()),
        },
        Expr::Value(value) => ExprNode::Literal(value.to_string()),
        Expr::Nested(inner) => lower_expr(inner),
        Expr::BinaryOp { left, op, right } => {
            ExprNode::composite(op.to_string(), vec![lower_expr(left), lower_expr(right)])
        }
        Expr::UnaryOp { op, expr } => ExprNode::composite(op.to_string(), vec![lower_expr(expr)]),
        Expr::Cast { expr, .. } => ExprNode::composite("CAST", vec![lower_expr(expr)]),
        other => {
            // Functions, CASE, subqueries...: keep every column reference below as a child
            let mut children = Vec::new();
            let _ = ast::visit_expressions(other, |e| {
                if matches!(e, Expr::Identifier(_) | Expr::CompoundIdentifier(_)) {
                    children.push(lower_expr(e));
                }
                ControlFlow::<()>::Continue(())
            });
            ExprNode::composite(other.to_string(), children)
        }
    }
}

fn object_name(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|ident| ident.value.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> StatementTree {
        SqlParserAdapter::default().parse(sql).unwrap()
    }

    #[test]
    fn test_insert_select_tables_in_order() {
        let tree = parse(
            "INSERT INTO total_sales SELECT a.price * b.qty AS revenue FROM orders a JOIN prices b",
        );
        assert_eq!(
            tree.tables,
            vec![
                TableRef::new("total_sales"),
                TableRef::aliased("orders", "a"),
                TableRef::aliased("prices", "b"),
            ]
        );
    }

    #[test]
    fn test_projection_alias_and_expression() {
        let tree = parse(
            "INSERT INTO total_sales SELECT a.price * b.qty AS revenue FROM orders a JOIN prices b",
        );
        let projections = tree.projections.unwrap();
        assert_eq!(projections.len(), 1);
        assert_eq!(projections[0].output_name(), "revenue");
        assert_eq!(
            projections[0].expr.children(),
            &[ExprNode::qualified("a", "price"), ExprNode::qualified("b", "qty")]
        );
    }

    #[test]
    fn test_inferred_name_without_alias() {
        let tree = parse("INSERT INTO t SELECT o.amount, status FROM orders o");
        let projections = tree.projections.unwrap();
        assert_eq!(projections[0].output_name(), "amount");
        assert_eq!(projections[1].expr, ExprNode::column(None, "status"));
    }

    #[test]
    fn test_function_arguments_are_kept() {
        let tree = parse("INSERT INTO t SELECT SUM(o.amount) AS total FROM orders o");
        let projections = tree.projections.unwrap();
        assert_eq!(projections[0].expr.children(), &[ExprNode::qualified("o", "amount")]);
    }

    #[test]
    fn test_quoted_identifiers_are_marked() {
        let tree = parse(r#"INSERT INTO t SELECT "O".amount AS total FROM orders "O""#);
        assert!(tree.tables[1].alias_quoted);
        assert_eq!(
            tree.projections.unwrap()[0].expr,
            ExprNode::Column {
                qualifier: Some("O".into()),
                qualifier_quoted: true,
                name: "amount".into(),
            }
        );
    }

    #[test]
    fn test_derived_table_is_lowered() {
        let tree = parse(
            "INSERT INTO t SELECT s.x AS y FROM (SELECT o.amount AS x FROM orders o) s",
        );
        assert_eq!(
            tree.tables,
            vec![TableRef::new("t"), TableRef::aliased("orders", "o")]
        );
        assert_eq!(tree.derived.len(), 1);

        let derived = &tree.derived[0];
        assert_eq!(derived.alias, "s");
        assert_eq!(derived.tree.tables, vec![TableRef::aliased("orders", "o")]);
        assert_eq!(
            derived.output_column("x").unwrap().expr,
            ExprNode::qualified("o", "amount")
        );
    }

    #[test]
    fn test_nested_derived_tables_stay_nested() {
        let tree = parse(
            "INSERT INTO t SELECT s.x FROM (SELECT i.v AS x FROM (SELECT o.a AS v FROM orders o) i) s",
        );
        assert_eq!(tree.derived.len(), 1);
        assert_eq!(tree.derived[0].tree.derived.len(), 1);
        assert_eq!(tree.derived[0].tree.derived[0].alias, "i");
    }

    #[test]
    fn test_ddl_has_no_projections() {
        let tree = parse("CREATE TABLE t (id INT)");
        assert!(tree.projections.is_none());
    }

    #[test]
    fn test_values_has_no_projections() {
        let tree = parse("INSERT INTO t VALUES (1, 2)");
        assert!(tree.projections.is_none());
        assert_eq!(tree.tables, vec![TableRef::new("t")]);
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let err = SqlParserAdapter::default().parse("this is not sql").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_multiple_statements_rejected() {
        let err = SqlParserAdapter::default()
            .parse("SELECT 1; SELECT 2")
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_oversized_statement_rejected() {
        let adapter = SqlParserAdapter::default().with_max_statement_bytes(10);
        let err = adapter.parse("INSERT INTO t SELECT a.x FROM a").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_dialect_names() {
        assert_eq!("spark".parse::<SqlDialect>().unwrap(), SqlDialect::Hive);
        assert_eq!("PostgreSQL".parse::<SqlDialect>().unwrap(), SqlDialect::Postgres);
        assert!("cobol".parse::<SqlDialect>().is_err());
    }
}
