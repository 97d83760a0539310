use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type TaskId = i64;
pub type CategoryId = i64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        f.write_str(label)
    }
}

/// When a reminder fires: at a manually chosen time, in the morning of the due
/// day, or at the backend's default offset before the deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReminderType {
    Manual,
    Morning,
    #[default]
    Default,
}

// Task struct
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub reminder_enabled: bool,
    #[serde(default)]
    pub reminder_type: ReminderType,
    #[serde(default)]
    pub reminder_time: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub user_id: String,
}

// Category struct
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub user_id: String,
}

/// Body of `POST /api/tasks`.
#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub priority: Priority,
    pub completed: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub category_id: Option<CategoryId>,
    pub reminder_enabled: bool,
    pub reminder_type: ReminderType,
    pub reminder_time: Option<String>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        NewTask {
            title: title.into(),
            description: None,
            priority: Priority::Medium,
            completed: false,
            due_date: None,
            category_id: None,
            reminder_enabled: false,
            reminder_type: ReminderType::Default,
            reminder_time: None,
        }
    }
}

/// Body of `PATCH /api/tasks/:id`. Absent fields are left untouched.
#[derive(Clone, Serialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        TaskPatch {
            completed: Some(completed),
            ..Default::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        TaskPatch {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn due_date(due_date: DateTime<Utc>) -> Self {
        TaskPatch {
            due_date: Some(due_date),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_deserializes_from_camel_case() {
        let json = r#"{
            "id": 7,
            "title": "Laundry",
            "priority": "high",
            "completed": false,
            "dueDate": "2026-10-20T23:59:59Z",
            "categoryId": null,
            "reminderEnabled": true,
            "reminderType": "morning",
            "createdAt": "2026-10-01T08:00:00Z",
            "updatedAt": "2026-10-01T08:00:00Z",
            "userId": "u-1"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, 7);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.reminder_type, ReminderType::Morning);
        assert!(task.reminder_enabled);
        assert!(task.due_date.is_some());
        assert_eq!(task.description, None);
    }

    #[test]
    fn test_patch_skips_absent_fields() {
        let patch = TaskPatch::completed(true);
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, serde_json::json!({ "completed": true }));
    }
}
