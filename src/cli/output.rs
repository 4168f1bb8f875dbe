use serde::Serialize;

use crate::model::revision::{TaskRevision, external_task_id};
use crate::model::status::TaskStatus;
use crate::ops::deadline::{DatedTask, DeadlineBuckets};
use crate::ops::migrate::MigrationReport;
use crate::ops::overdue::{OverdueOrder, OverdueTask};
use crate::util::unicode::fit_to_width;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    pub name: Option<String>,
    pub add_time: Option<String>,
    pub task_id: Option<String>,
    /// Status key (`new`, `in-progress`, ...) when recognised
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// Status cell as stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Serialize)]
pub struct DeadlineJson {
    pub today: String,
    pub due_today: Vec<TaskJson>,
    pub due_soon: Vec<TaskJson>,
    pub due_later: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct OverdueJson {
    pub today: String,
    pub order: OverdueOrder,
    pub tasks: Vec<OverdueTaskJson>,
}

#[derive(Serialize)]
pub struct OverdueTaskJson {
    pub days_overdue: i64,
    #[serde(flatten)]
    pub task: TaskJson,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn task_to_json(rev: &TaskRevision) -> TaskJson {
    TaskJson {
        name: rev.task_name.clone(),
        add_time: rev.add_time.clone(),
        task_id: rev.task_id.clone(),
        status: rev.task_status.as_deref().and_then(TaskStatus::parse),
        status_label: rev.task_status.clone(),
        assignee: rev.task_po.clone(),
        reporter: rev.task_report_to.clone(),
        deadline: rev.task_deadline.clone(),
        description: rev.task_des.clone(),
        link: rev.task_link.clone(),
        external_id: rev
            .task_link
            .as_deref()
            .and_then(external_task_id)
            .map(str::to_string),
        comment: rev.task_comment.clone(),
    }
}

pub fn deadline_to_json(buckets: &DeadlineBuckets, today: &str) -> DeadlineJson {
    let convert = |tasks: &[DatedTask]| -> Vec<TaskJson> {
        tasks.iter().map(|t| task_to_json(&t.revision)).collect()
    };
    DeadlineJson {
        today: today.to_string(),
        due_today: convert(&buckets.due_today),
        due_soon: convert(&buckets.due_soon),
        due_later: convert(&buckets.due_later),
    }
}

pub fn overdue_to_json(tasks: &[OverdueTask], order: OverdueOrder, today: &str) -> OverdueJson {
    OverdueJson {
        today: today.to_string(),
        order,
        tasks: tasks
            .iter()
            .map(|t| OverdueTaskJson {
                days_overdue: t.days_overdue,
                task: task_to_json(&t.revision),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

const NAME_WIDTH: usize = 28;
const STATUS_WIDTH: usize = 12;
const PO_WIDTH: usize = 12;

/// English display label for a status; unrecognised cells show as stored.
pub fn display_status(raw: Option<&str>) -> String {
    match raw.map(|s| (s, TaskStatus::parse(s))) {
        Some((_, Some(status))) => status_label(status).to_string(),
        Some((s, None)) => s.to_string(),
        None => "-".to_string(),
    }
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::New => "New",
        TaskStatus::InProgress => "In progress",
        TaskStatus::Completed => "Done",
        TaskStatus::Paused => "Paused",
        TaskStatus::Cancelled => "Cancelled",
    }
}

/// One-line summary: name, status, assignee, deadline
pub fn format_task_line(rev: &TaskRevision) -> String {
    let due = rev
        .task_deadline
        .as_deref()
        .map(|d| format!("  due {d}"))
        .unwrap_or_default();
    format!(
        "{} {} {}{}",
        fit_to_width(rev.name().unwrap_or("-"), NAME_WIDTH),
        fit_to_width(&display_status(rev.task_status.as_deref()), STATUS_WIDTH),
        fit_to_width(rev.task_po.as_deref().unwrap_or("-"), PO_WIDTH),
        due
    )
    .trim_end()
    .to_string()
}

pub fn format_overdue_line(task: &OverdueTask) -> String {
    let days = if task.days_overdue == 1 {
        "1 day late".to_string()
    } else {
        format!("{} days late", task.days_overdue)
    };
    format!("{:>13}  {}", days, format_task_line(&task.revision))
}

/// Every field of one revision, one per line
pub fn format_task_detail(rev: &TaskRevision) -> Vec<String> {
    let mut lines = vec![format!(
        "{}  ({})",
        rev.name().unwrap_or("-"),
        rev.add_time.as_deref().unwrap_or("no timestamp")
    )];
    let mut push = |label: &str, value: Option<&str>| {
        if let Some(v) = value {
            lines.push(format!("  {label}: {v}"));
        }
    };
    push("id", rev.task_id.as_deref());
    push("status", Some(display_status(rev.task_status.as_deref())).as_deref());
    push("po", rev.task_po.as_deref());
    push("reporter", rev.task_report_to.as_deref());
    push("deadline", rev.task_deadline.as_deref());
    push("link", rev.task_link.as_deref());
    push("description", rev.task_des.as_deref());
    push("comment", rev.task_comment.as_deref());
    lines
}

/// Section header with a count, e.g. `== Due today (2) ==`
pub fn format_section(title: &str, count: usize) -> String {
    format!("== {title} ({count}) ==")
}

pub fn format_migration(report: &MigrationReport, dry_run: bool) -> Vec<String> {
    let verb = if dry_run { "would convert" } else { "converted" };
    let mut lines = vec![
        format!("{verb} {} add_time value(s)", report.add_time_converted),
        format!("{verb} {} deadline value(s)", report.deadline_converted),
    ];
    for (idx, column, value) in &report.unrecognized {
        lines.push(format!("  row {}: unrecognized {column} '{value}'", idx + 2));
    }
    lines
}
