//! Core adapter framework
//!
//! Defines the trait every SQL parsing backend implements.

use std::sync::Arc;

use super::sql::{SqlDialect, SqlParserAdapter};
use super::tree::StatementTree;
use crate::Result;

/// Trait for SQL adapters
///
/// An adapter is responsible for:
/// 1. Parsing exactly one statement of its dialect
/// 2. Listing the statement's table references, with aliases, in source order
/// 3. Lowering the SELECT projections into expression trees
///
/// Unparseable text must fail with `Error::Parse`. A statement without a
/// SELECT clause is not an adapter error: it yields `projections: None`.
pub trait SqlAdapter: Send + Sync {
    /// Get the dialect name (for display)
    fn dialect_name(&self) -> &str;

    /// Parse one statement into a statement tree
    fn parse(&self, sql: &str) -> Result<StatementTree>;
}

/// Create the default sqlparser-backed adapter
pub fn default_adapter(dialect: SqlDialect, max_statement_bytes: usize) -> Arc<dyn SqlAdapter> {
    Arc::new(SqlParserAdapter::new(dialect).with_max_statement_bytes(max_statement_bytes))
}
