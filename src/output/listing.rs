//! Operator-facing listing of in-progress sources
//!
//! Formats the progress table for `--list` and the resume menu, and parses
//! the operator's menu choice.

use crate::state::{ProgressRecord, SourceId};
use crate::ChainError;

/// Formats in-progress sources as a numbered list, starting at 1
///
/// # Example output
///
/// ```text
/// 1. https://example.com/book/1 (Output: novels)
///    id: 3f2a9c01b7de  saved: 12  next: https://example.com/book/13
/// ```
pub fn format_source_listing(entries: &[(SourceId, ProgressRecord)]) -> String {
    let mut out = String::new();

    for (i, (id, record)) in entries.iter().enumerate() {
        let output = record
            .output_location
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!(
            "{}. {} (Output: {})\n",
            i + 1,
            entry_label(record),
            output
        ));
        out.push_str(&format!(
            "   id: {}  saved: {}  next: {}",
            id.short(),
            record.visited.len(),
            record.cursor.as_deref().unwrap_or("(complete)")
        ));
        if let Some(updated) = record.updated_at {
            out.push_str(&format!("  updated: {}", updated.format("%Y-%m-%d %H:%M UTC")));
        }
        out.push('\n');
    }

    out
}

fn entry_label(record: &ProgressRecord) -> &str {
    if record.entry_url.is_empty() {
        "(unknown entry)"
    } else {
        &record.entry_url
    }
}

/// Parses a 1-based menu choice into an index into a listing of `count`
///
/// # Returns
///
/// * `Ok(usize)` - Zero-based index of the chosen entry
/// * `Err(ChainError::OperatorInput)` - Not a number, or out of range
pub fn parse_selection(input: &str, count: usize) -> Result<usize, ChainError> {
    let input = input.trim();
    let choice: usize = input.parse().map_err(|_| {
        ChainError::OperatorInput(format!("'{}' is not a download number", input))
    })?;

    if choice == 0 || choice > count {
        return Err(ChainError::OperatorInput(format!(
            "choose a number between 1 and {}, got {}",
            count, choice
        )));
    }

    Ok(choice - 1)
}
