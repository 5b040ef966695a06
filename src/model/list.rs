use serde::{Deserialize, Serialize};

/// A named grouping of tasks. Holds task ids only; an id may outlive its task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub tasks: Vec<String>,
}

impl TaskList {
    pub fn new(id: String, title: String) -> Self {
        TaskList {
            id,
            title,
            tasks: Vec::new(),
        }
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.tasks.iter().any(|t| t == task_id)
    }

    /// Case-insensitive title comparison used for duplicate detection
    pub fn title_matches(&self, title: &str) -> bool {
        self.title.to_lowercase() == title.to_lowercase()
    }
}

/// Partial update for a list. The id is never changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPatch {
    pub title: Option<String>,
    pub tasks: Option<Vec<String>>,
}

impl ListPatch {
    pub fn apply(self, list: &mut TaskList) -> bool {
        let before = list.clone();
        if let Some(title) = self.title {
            list.title = title;
        }
        if let Some(tasks) = self.tasks {
            list.tasks = tasks;
        }
        *list != before
    }
}
