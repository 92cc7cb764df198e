//! SQL Adapter Framework
//!
//! Each adapter lowers its parser's AST into a `StatementTree`: table
//! references with aliases plus projection expression trees. The extractor
//! never sees parser-specific types.

pub mod framework;
pub mod sql;
pub mod tree;

pub use framework::{SqlAdapter, default_adapter};
pub use sql::{SqlDialect, SqlParserAdapter, DEFAULT_MAX_STATEMENT_BYTES};
pub use tree::{DerivedTable, ExprNode, Projection, StatementTree, TableRef};
