use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::model::revision::{TaskRevision, TaskTable};
use crate::model::status::is_active;
use crate::util::time::parse_deadline;

/// An active task with a parsed deadline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatedTask {
    pub revision: TaskRevision,
    pub deadline: NaiveDate,
}

/// Active tasks whose deadline is today or later, by proximity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeadlineBuckets {
    /// deadline == today
    pub due_today: Vec<DatedTask>,
    /// today+1 ..= today+2
    pub due_soon: Vec<DatedTask>,
    /// today+3 and beyond
    pub due_later: Vec<DatedTask>,
}

impl DeadlineBuckets {
    pub fn is_empty(&self) -> bool {
        self.due_today.is_empty() && self.due_soon.is_empty() && self.due_later.is_empty()
    }

    pub fn len(&self) -> usize {
        self.due_today.len() + self.due_soon.len() + self.due_later.len()
    }
}

/// Partition active tasks with upcoming deadlines into today / soon / later.
///
/// Closed tasks, missing or malformed deadlines and deadlines before `today`
/// are left out. Each bucket is sorted by deadline; equal deadlines keep
/// input order.
pub fn classify_deadlines(table: &TaskTable, today: NaiveDate) -> DeadlineBuckets {
    let mut buckets = DeadlineBuckets::default();
    let soon_end = today + Days::new(2);

    for task in dated_active(table) {
        if task.deadline < today {
            continue;
        }
        if task.deadline == today {
            buckets.due_today.push(task);
        } else if task.deadline <= soon_end {
            buckets.due_soon.push(task);
        } else {
            buckets.due_later.push(task);
        }
    }

    for bucket in [
        &mut buckets.due_today,
        &mut buckets.due_soon,
        &mut buckets.due_later,
    ] {
        bucket.sort_by_key(|t| t.deadline);
    }

    tracing::debug!(
        today = buckets.due_today.len(),
        soon = buckets.due_soon.len(),
        later = buckets.due_later.len(),
        "deadlines classified"
    );
    buckets
}

/// Active rows whose deadline parses, in input order.
pub(crate) fn dated_active(table: &TaskTable) -> Vec<DatedTask> {
    let mut skipped = 0usize;
    let tasks: Vec<DatedTask> = table
        .rows
        .iter()
        .filter(|row| is_active(row.task_status.as_deref()))
        .filter_map(|row| {
            let deadline = row.task_deadline.as_deref().and_then(parse_deadline);
            if deadline.is_none() {
                skipped += 1;
            }
            Some(DatedTask {
                revision: row.clone(),
                deadline: deadline?,
            })
        })
        .collect();
    if skipped > 0 {
        tracing::trace!(skipped, "active rows without a usable deadline");
    }
    tasks
}
