//! Batch input files
//!
//! `.jsonl` / `.ndjson`: one `{"sql_text": "..."}` object per line.
//! Anything else: one statement per line, `--` lines are comments.

use std::path::Path;

use tracing::debug;

use super::BatchItem;
use crate::Result;

/// Read batch items from a local file
pub fn read_batch_file(path: &Path) -> Result<Vec<BatchItem>> {
    let contents = std::fs::read_to_string(path)?;
    let items = if is_json_lines(path) {
        parse_json_lines(&contents)?
    } else {
        parse_plain_lines(&contents)
    };
    debug!(path = %path.display(), items = items.len(), "read batch file");
    Ok(items)
}

fn is_json_lines(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("jsonl") | Some("ndjson")
    )
}

pub fn parse_json_lines(contents: &str) -> Result<Vec<BatchItem>> {
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| Ok(serde_json::from_str::<BatchItem>(line)?))
        .collect()
}

pub fn parse_plain_lines(contents: &str) -> Vec<BatchItem> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("--"))
        .map(BatchItem::new)
        .collect()
}
