use regex::{Regex, RegexBuilder};

use crate::model::revision::{TaskRevision, TaskTable};

/// Columns offered to users as search targets
pub const SEARCH_COLUMNS: [&str; 4] = ["task_name", "task_po", "task_des", "task_status"];

/// Case-insensitive substring search over one column.
///
/// Returns the matching rows in input order. An empty table, a blank term or a
/// column missing from the header all give an empty result with the same
/// header. Empty cells never match.
pub fn search(table: &TaskTable, term: &str, column: &str) -> TaskTable {
    if table.is_empty() || term.trim().is_empty() || !table.has_column(column) {
        return table.empty_like();
    }

    let Some(re) = literal_matcher(term) else {
        return table.empty_like();
    };

    let rows: Vec<TaskRevision> = table
        .rows
        .iter()
        .filter(|row| row.get(column).is_some_and(|value| re.is_match(value)))
        .cloned()
        .collect();

    tracing::debug!(column, matches = rows.len(), "search");
    table.with_rows(rows)
}

/// A regex matching `term` literally, ignoring case.
fn literal_matcher(term: &str) -> Option<Regex> {
    RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Keep rows assigned to one of `assignees`. An empty list keeps everything.
pub fn filter_by_assignees(table: &TaskTable, assignees: &[String]) -> TaskTable {
    if assignees.is_empty() {
        return table.clone();
    }
    let rows = table
        .rows
        .iter()
        .filter(|row| {
            row.task_po
                .as_deref()
                .is_some_and(|po| assignees.iter().any(|a| a == po))
        })
        .cloned()
        .collect();
    table.with_rows(rows)
}

/// Distinct non-empty assignees, in first-seen order.
pub fn distinct_assignees(table: &TaskTable) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for po in table.rows.iter().filter_map(|row| row.task_po.as_deref()) {
        if !seen.iter().any(|s| s == po) {
            seen.push(po.to_string());
        }
    }
    seen
}
