use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::revision::{TaskRevision, TaskTable};
use crate::ops::deadline::dated_active;

/// An active task past its deadline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverdueTask {
    pub revision: TaskRevision,
    pub deadline: NaiveDate,
    /// Whole days between the deadline and today, always >= 1
    pub days_overdue: i64,
}

/// Active tasks whose deadline is strictly before `today`, most overdue
/// first (deadline ascending). Equal deadlines keep input order.
pub fn classify_overdue(table: &TaskTable, today: NaiveDate) -> Vec<OverdueTask> {
    let mut overdue: Vec<OverdueTask> = dated_active(table)
        .into_iter()
        .filter(|t| t.deadline < today)
        .map(|t| OverdueTask {
            days_overdue: (today - t.deadline).num_days(),
            revision: t.revision,
            deadline: t.deadline,
        })
        .collect();
    sort_overdue(&mut overdue, OverdueOrder::ByDeadline);
    tracing::debug!(count = overdue.len(), "overdue classified");
    overdue
}

/// How a held overdue result is ordered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverdueOrder {
    /// Deadline ascending, as classified
    #[default]
    ByDeadline,
    /// Fewest days overdue first
    LeastOverdue,
    /// Most days overdue first
    MostOverdue,
}

fn sort_overdue(tasks: &mut [OverdueTask], order: OverdueOrder) {
    match order {
        OverdueOrder::ByDeadline => tasks.sort_by_key(|t| t.deadline),
        OverdueOrder::LeastOverdue => tasks.sort_by_key(|t| t.days_overdue),
        OverdueOrder::MostOverdue => tasks.sort_by_key(|t| std::cmp::Reverse(t.days_overdue)),
    }
}

/// Holds one overdue classification and lets the caller reorder it.
///
/// `reclassify` is the only operation that looks at task data; `resort`
/// only permutes the rows already held.
#[derive(Debug, Clone, Default)]
pub struct OverdueView {
    tasks: Vec<OverdueTask>,
    order: OverdueOrder,
    classified_for: Option<NaiveDate>,
}

impl OverdueView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `table` and replace the held result. Order resets to by-deadline.
    pub fn reclassify(&mut self, table: &TaskTable, today: NaiveDate) -> &[OverdueTask] {
        self.tasks = classify_overdue(table, today);
        self.order = OverdueOrder::ByDeadline;
        self.classified_for = Some(today);
        &self.tasks
    }

    /// Reorder the held result.
    pub fn resort(&mut self, order: OverdueOrder) -> &[OverdueTask] {
        sort_overdue(&mut self.tasks, order);
        self.order = order;
        &self.tasks
    }

    pub fn tasks(&self) -> &[OverdueTask] {
        &self.tasks
    }

    pub fn order(&self) -> OverdueOrder {
        self.order
    }

    /// The "today" of the last classification, `None` before the first one.
    pub fn classified_for(&self) -> Option<NaiveDate> {
        self.classified_for
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
