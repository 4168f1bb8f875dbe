use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::model::revision::TaskTable;
use crate::util::time::{format_add_time, format_deadline, parse_add_time, parse_deadline};

/// `add_time` spellings written by older versions of the sheet
const LEGACY_ADD_TIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%d/%m/%Y %H:%M", "%Y-%m-%dT%H:%M:%S"];

/// `task_deadline` spellings written by older versions of the sheet
const LEGACY_DEADLINE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y %H:%M:%S"];

/// What a migration pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub add_time_converted: usize,
    pub deadline_converted: usize,
    /// Non-empty cells matching no known format, as `(row index, column, value)`
    pub unrecognized: Vec<(usize, String, String)>,
}

impl MigrationReport {
    pub fn changed(&self) -> usize {
        self.add_time_converted + self.deadline_converted
    }
}

/// Rewrite legacy timestamps and deadlines into the canonical formats.
/// Canonical cells and empty cells are left alone.
pub fn migrate_formats(table: &TaskTable) -> (TaskTable, MigrationReport) {
    let mut report = MigrationReport::default();
    let mut rows = table.rows.clone();

    for (idx, row) in rows.iter_mut().enumerate() {
        if let Some(raw) = row.add_time.clone()
            && parse_add_time(&raw).is_none()
        {
            match legacy_add_time(&raw) {
                Some(dt) => {
                    row.add_time = Some(format_add_time(dt));
                    report.add_time_converted += 1;
                }
                None => report.unrecognized.push((idx, "add_time".into(), raw)),
            }
        }

        if let Some(raw) = row.task_deadline.clone()
            && parse_deadline(&raw).is_none()
        {
            match legacy_deadline(&raw) {
                Some(d) => {
                    row.task_deadline = Some(format_deadline(d));
                    report.deadline_converted += 1;
                }
                None => report.unrecognized.push((idx, "task_deadline".into(), raw)),
            }
        }
    }

    tracing::info!(
        add_time = report.add_time_converted,
        deadline = report.deadline_converted,
        unrecognized = report.unrecognized.len(),
        "format migration"
    );
    (table.with_rows(rows), report)
}

fn legacy_add_time(s: &str) -> Option<NaiveDateTime> {
    LEGACY_ADD_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
}

fn legacy_deadline(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    LEGACY_DEADLINE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(s, fmt)
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(s, fmt).ok().map(|dt| dt.date()))
    })
}
