use indexmap::IndexMap;

use crate::model::revision::{Field, TaskRevision};
use crate::model::status::TaskStatus;
use crate::util::time::{Clock, generate_task_id, now_stamp, parse_deadline};

/// Field name → value, in the order the caller supplied them
pub type FieldMap = IndexMap<String, String>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RevisionError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("invalid deadline '{0}': expected dd/mm/yyyy")]
    InvalidDeadline(String),
    #[error("unknown status '{0}'")]
    UnknownStatus(String),
}

/// Input for a brand-new task
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub name: String,
    pub assignee: String,
    pub description: Option<String>,
    pub deadline: Option<String>,
    pub link: Option<String>,
}

/// Changes to apply on top of a task's current revision
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub rename: Option<String>,
    pub assignee: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub comment: Option<String>,
}

/// Build the row for a new task. The status starts as new and the reporter is
/// the user creating it.
pub fn new_task_record(
    task: &NewTask,
    reporter: &str,
    clock: &dyn Clock,
) -> Result<FieldMap, RevisionError> {
    let name = required(&task.name, Field::TaskName)?;
    let assignee = required(&task.assignee, Field::TaskPo)?;

    let mut record = FieldMap::new();
    put(&mut record, Field::TaskName, name);
    put(&mut record, Field::AddTime, &now_stamp(clock));
    put(&mut record, Field::TaskId, &generate_task_id(clock));
    put(&mut record, Field::TaskDes, task.description.as_deref().unwrap_or(""));
    put(&mut record, Field::TaskReportTo, reporter);
    put(&mut record, Field::TaskPo, assignee);
    put(&mut record, Field::TaskStatus, TaskStatus::New.sheet_label());

    if let Some(deadline) = task.deadline.as_deref().filter(|d| !d.trim().is_empty()) {
        if parse_deadline(deadline).is_none() {
            return Err(RevisionError::InvalidDeadline(deadline.to_string()));
        }
        put(&mut record, Field::TaskDeadline, deadline.trim());
    }
    if let Some(link) = task.link.as_deref().filter(|l| !l.trim().is_empty()) {
        put(&mut record, Field::TaskLink, link.trim());
    }
    Ok(record)
}

/// Build the row that supersedes `current`.
///
/// Deadline, link and reporter carry over unchanged; every other field takes
/// the edit when given, otherwise the current value. The new row gets its own
/// `add_time` and `task_id`.
pub fn edit_task_record(
    current: &TaskRevision,
    edit: &TaskEdit,
    clock: &dyn Clock,
) -> Result<FieldMap, RevisionError> {
    let name = match edit.rename.as_deref() {
        Some(n) => required(n, Field::TaskName)?,
        None => current
            .name()
            .ok_or(RevisionError::MissingField(Field::TaskName.name()))?,
    };

    let pick = |given: &Option<String>, field: Field| -> String {
        given
            .clone()
            .or_else(|| current.field(field).map(str::to_string))
            .unwrap_or_default()
    };
    let status = edit
        .status
        .map(|s| s.sheet_label().to_string())
        .or_else(|| current.task_status.clone())
        .unwrap_or_default();

    let mut record = FieldMap::new();
    put(&mut record, Field::TaskName, name);
    put(&mut record, Field::AddTime, &now_stamp(clock));
    put(&mut record, Field::TaskDeadline, current.task_deadline.as_deref().unwrap_or(""));
    put(&mut record, Field::TaskLink, current.task_link.as_deref().unwrap_or(""));
    put(&mut record, Field::TaskId, &generate_task_id(clock));
    put(&mut record, Field::TaskDes, &pick(&edit.description, Field::TaskDes));
    put(&mut record, Field::TaskReportTo, current.task_report_to.as_deref().unwrap_or(""));
    put(&mut record, Field::TaskPo, &pick(&edit.assignee, Field::TaskPo));
    put(&mut record, Field::TaskStatus, &status);
    put(&mut record, Field::TaskComment, &pick(&edit.comment, Field::TaskComment));
    Ok(record)
}

/// Parse a status given by a user, as a sheet literal or an English key.
pub fn parse_status_arg(s: &str) -> Result<TaskStatus, RevisionError> {
    TaskStatus::parse(s).ok_or_else(|| RevisionError::UnknownStatus(s.to_string()))
}

fn required(value: &str, field: Field) -> Result<&str, RevisionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(RevisionError::MissingField(field.name()))
    } else {
        Ok(trimmed)
    }
}

fn put(record: &mut FieldMap, field: Field, value: &str) {
    record.insert(field.name().to_string(), value.to_string());
}
