use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A column of the task sheet schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    TaskName,
    AddTime,
    TaskId,
    TaskDes,
    TaskReportTo,
    TaskPo,
    TaskStatus,
    TaskDeadline,
    TaskLink,
    TaskComment,
}

impl Field {
    /// Every schema field, in the default sheet column order
    pub const ALL: [Field; 10] = [
        Field::TaskName,
        Field::AddTime,
        Field::TaskDeadline,
        Field::TaskLink,
        Field::TaskId,
        Field::TaskDes,
        Field::TaskReportTo,
        Field::TaskPo,
        Field::TaskStatus,
        Field::TaskComment,
    ];

    /// Fields forward-filled from earlier revisions of the same task
    pub const BACKFILLED: [Field; 5] = [
        Field::TaskDeadline,
        Field::TaskLink,
        Field::TaskDes,
        Field::TaskReportTo,
        Field::TaskPo,
    ];

    /// Column name as it appears in the sheet header
    pub fn name(self) -> &'static str {
        match self {
            Field::TaskName => "task_name",
            Field::AddTime => "add_time",
            Field::TaskId => "task_id",
            Field::TaskDes => "task_des",
            Field::TaskReportTo => "task_report_to",
            Field::TaskPo => "task_po",
            Field::TaskStatus => "task_status",
            Field::TaskDeadline => "task_deadline",
            Field::TaskLink => "task_link",
            Field::TaskComment => "task_comment",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }
}

/// One row of the append-only revision log.
///
/// Empty sheet cells are stored as `None`. Columns the schema does not know
/// about are kept in `extra` so a row can be written back without loss.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRevision {
    pub task_name: Option<String>,
    pub add_time: Option<String>,
    pub task_id: Option<String>,
    pub task_des: Option<String>,
    pub task_report_to: Option<String>,
    pub task_po: Option<String>,
    pub task_status: Option<String>,
    pub task_deadline: Option<String>,
    pub task_link: Option<String>,
    pub task_comment: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extra: IndexMap<String, String>,
}

impl TaskRevision {
    /// Build a revision from `(column, value)` pairs, as read from a sheet.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut rev = TaskRevision::default();
        for (column, value) in pairs {
            rev.set(column, value);
        }
        rev
    }

    pub fn field(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set_field(&mut self, field: Field, value: Option<String>) {
        *self.slot_mut(field) = value.and_then(non_empty);
    }

    /// Look up a column by header name, schema or extra.
    pub fn get(&self, column: &str) -> Option<&str> {
        match Field::from_name(column) {
            Some(field) => self.field(field),
            None => self.extra.get(column).map(|s| s.as_str()),
        }
    }

    /// Set a column by header name. Blank values clear the cell.
    pub fn set(&mut self, column: &str, value: &str) {
        match Field::from_name(column) {
            Some(field) => self.set_field(field, Some(value.to_string())),
            None => {
                if value.trim().is_empty() {
                    self.extra.shift_remove(column);
                } else {
                    self.extra.insert(column.to_string(), value.to_string());
                }
            }
        }
    }

    /// True when no cell carries a value.
    pub fn is_blank(&self) -> bool {
        Field::ALL.iter().all(|f| self.field(*f).is_none()) && self.extra.is_empty()
    }

    /// Cell values in `headers` order, unknown/missing columns as empty strings.
    pub fn to_record(&self, headers: &[String]) -> Vec<String> {
        headers
            .iter()
            .map(|h| self.get(h).unwrap_or("").to_string())
            .collect()
    }

    /// The task name, if present and non-blank
    pub fn name(&self) -> Option<&str> {
        self.task_name.as_deref().filter(|s| !s.trim().is_empty())
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::TaskName => &self.task_name,
            Field::AddTime => &self.add_time,
            Field::TaskId => &self.task_id,
            Field::TaskDes => &self.task_des,
            Field::TaskReportTo => &self.task_report_to,
            Field::TaskPo => &self.task_po,
            Field::TaskStatus => &self.task_status,
            Field::TaskDeadline => &self.task_deadline,
            Field::TaskLink => &self.task_link,
            Field::TaskComment => &self.task_comment,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::TaskName => &mut self.task_name,
            Field::AddTime => &mut self.add_time,
            Field::TaskId => &mut self.task_id,
            Field::TaskDes => &mut self.task_des,
            Field::TaskReportTo => &mut self.task_report_to,
            Field::TaskPo => &mut self.task_po,
            Field::TaskStatus => &mut self.task_status,
            Field::TaskDeadline => &mut self.task_deadline,
            Field::TaskLink => &mut self.task_link,
            Field::TaskComment => &mut self.task_comment,
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

/// A snapshot of the revision log: the sheet header plus its rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTable {
    pub headers: Vec<String>,
    pub rows: Vec<TaskRevision>,
}

impl TaskTable {
    pub fn new(headers: Vec<String>, rows: Vec<TaskRevision>) -> Self {
        TaskTable { headers, rows }
    }

    /// A table with the full schema as its header
    pub fn with_schema(rows: Vec<TaskRevision>) -> Self {
        TaskTable {
            headers: default_headers(),
            rows,
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    /// Same header, zero rows
    pub fn empty_like(&self) -> Self {
        TaskTable {
            headers: self.headers.clone(),
            rows: Vec::new(),
        }
    }

    /// Same header, the given rows
    pub fn with_rows(&self, rows: Vec<TaskRevision>) -> Self {
        TaskTable {
            headers: self.headers.clone(),
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Header names of the full schema, in default column order
pub fn default_headers() -> Vec<String> {
    Field::ALL.iter().map(|f| f.name().to_string()).collect()
}

/// The external work-item identifier encoded in a task link: the last path
/// segment before any query string or fragment.
pub fn external_task_id(link: &str) -> Option<&str> {
    let link = link.trim();
    let end = link.find(['?', '#']).unwrap_or(link.len());
    link[..end]
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.ends_with(':'))
}
