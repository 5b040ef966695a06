use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse_priority(s: &str) -> Option<Priority> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// Repeat cadence for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Never,
}

impl Repeat {
    pub fn as_str(self) -> &'static str {
        match self {
            Repeat::None => "none",
            Repeat::Daily => "daily",
            Repeat::Weekly => "weekly",
            Repeat::Monthly => "monthly",
            Repeat::Never => "never",
        }
    }

    pub fn parse_repeat(s: &str) -> Option<Repeat> {
        match s {
            "none" => Some(Repeat::None),
            "daily" => Some(Repeat::Daily),
            "weekly" => Some(Repeat::Weekly),
            "monthly" => Some(Repeat::Monthly),
            "never" => Some(Repeat::Never),
            _ => None,
        }
    }
}

/// A checklist item owned by a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl Step {
    pub fn new(id: String, title: String) -> Self {
        Step {
            id,
            title,
            completed: false,
        }
    }
}

/// A to-do item with its scheduling metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<DateTime<Utc>>,
    #[serde(default)]
    pub repeat: Repeat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Ordered, duplicates allowed
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_outdoor: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

impl Task {
    /// Build a task from a draft. The id and creation time come from the caller.
    pub fn from_draft(draft: TaskDraft, id: String, created_at: DateTime<Utc>) -> Self {
        Task {
            id,
            title: draft.title,
            completed: false,
            priority: draft.priority,
            created_at,
            due_date: draft.due_date,
            reminder: draft.reminder,
            repeat: draft.repeat,
            notes: draft.notes,
            tags: draft.tags,
            steps: draft.steps,
            is_outdoor: draft.is_outdoor,
            assigned_to: draft.assigned_to,
        }
    }

    pub fn is_outdoor(&self) -> bool {
        self.is_outdoor.unwrap_or(false)
    }

    pub fn find_step_mut(&mut self, step_id: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == step_id)
    }

    /// (completed, total) step counts
    pub fn step_progress(&self) -> (usize, usize) {
        let done = self.steps.iter().filter(|s| s.completed).count();
        (done, self.steps.len())
    }
}

/// Caller-supplied fields for a new task.
///
/// Anything the store owns (`id`, `created_at`, `completed`) is absent here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub reminder: Option<DateTime<Utc>>,
    pub repeat: Repeat,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub steps: Vec<Step>,
    pub is_outdoor: Option<bool>,
    pub assigned_to: Option<String>,
}

impl TaskDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        TaskDraft {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Partial update merged into an existing task. `None` leaves a field alone;
/// the doubly-optional fields use `Some(None)` to clear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub reminder: Option<Option<DateTime<Utc>>>,
    pub repeat: Option<Repeat>,
    pub notes: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub steps: Option<Vec<Step>>,
    pub is_outdoor: Option<Option<bool>>,
    pub assigned_to: Option<Option<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    /// Merge into `task`. Returns true if any field changed.
    pub fn apply(self, task: &mut Task) -> bool {
        let before = task.clone();
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(reminder) = self.reminder {
            task.reminder = reminder;
        }
        if let Some(repeat) = self.repeat {
            task.repeat = repeat;
        }
        if let Some(notes) = self.notes {
            task.notes = notes;
        }
        if let Some(tags) = self.tags {
            task.tags = tags;
        }
        if let Some(steps) = self.steps {
            task.steps = steps;
        }
        if let Some(is_outdoor) = self.is_outdoor {
            task.is_outdoor = is_outdoor;
        }
        if let Some(assigned_to) = self.assigned_to {
            task.assigned_to = assigned_to;
        }
        *task != before
    }
}
