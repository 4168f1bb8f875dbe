use serde::{Deserialize, Serialize};

/// Lifecycle status of a task revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    New,
    InProgress,
    Completed,
    Paused,
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::New,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Paused,
        TaskStatus::Cancelled,
    ];

    /// Parse a status cell. Accepts the literals written to the sheet and the
    /// English keys used on the command line.
    pub fn parse(s: &str) -> Option<TaskStatus> {
        let s = s.trim();
        match s {
            "Mới tạo" => return Some(TaskStatus::New),
            "Đang làm" => return Some(TaskStatus::InProgress),
            "Hoàn thành" | "Đã hoàn thành" => return Some(TaskStatus::Completed),
            "Tạm dừng" => return Some(TaskStatus::Paused),
            "Đã hủy" => return Some(TaskStatus::Cancelled),
            _ => {}
        }
        match s.to_lowercase().as_str() {
            "new" => Some(TaskStatus::New),
            "in-progress" | "active" => Some(TaskStatus::InProgress),
            "done" | "completed" => Some(TaskStatus::Completed),
            "paused" => Some(TaskStatus::Paused),
            "cancelled" | "canceled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    /// The literal persisted in the sheet
    pub fn sheet_label(self) -> &'static str {
        match self {
            TaskStatus::New => "Mới tạo",
            TaskStatus::InProgress => "Đang làm",
            TaskStatus::Completed => "Hoàn thành",
            TaskStatus::Paused => "Tạm dừng",
            TaskStatus::Cancelled => "Đã hủy",
        }
    }

    /// The command-line key
    pub fn key(self) -> &'static str {
        match self {
            TaskStatus::New => "new",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "done",
            TaskStatus::Paused => "paused",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled tasks take no further part in deadline triage.
    pub fn is_closed(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

/// Whether a raw status cell describes an active task.
/// Missing or unrecognised statuses count as active.
pub fn is_active(status: Option<&str>) -> bool {
    !status
        .and_then(TaskStatus::parse)
        .is_some_and(TaskStatus::is_closed)
}
