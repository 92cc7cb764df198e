//! Database schema definitions

/// SQL to create the nodes table
///
/// `key` is the node key string (`table:<name>` / `column:<table>#<column>`).
/// Nodes are read back from `table_name` / `column_name`, never from the key;
/// `column_name` is NULL for tables.
pub const CREATE_NODES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS nodes (
    key TEXT PRIMARY KEY,
    label TEXT NOT NULL,
    table_name TEXT NOT NULL,
    column_name TEXT
)
"#;

/// SQL to create the edges table
/// One row per (kind, from, to): merges never create parallel duplicates
pub const CREATE_EDGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    from_key TEXT NOT NULL,
    to_key TEXT NOT NULL,
    from_table TEXT NOT NULL,
    from_column TEXT,
    to_table TEXT NOT NULL,
    to_column TEXT,
    UNIQUE(kind, from_key, to_key)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_nodes_label ON nodes(label)",
    "CREATE INDEX IF NOT EXISTS idx_nodes_parts ON nodes(table_name, column_name)",
    "CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_key)",
    "CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_key)",
    "CREATE INDEX IF NOT EXISTS idx_edges_kind ON edges(kind)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_NODES_TABLE, CREATE_EDGES_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
