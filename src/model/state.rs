use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::list::TaskList;
use crate::model::task::Task;

/// Named filter over the task collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    All,
    Today,
    Important,
    Assigned,
    Planned,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::All,
        Tab::Today,
        Tab::Important,
        Tab::Assigned,
        Tab::Planned,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Tab::All => "all",
            Tab::Today => "today",
            Tab::Important => "important",
            Tab::Assigned => "assigned",
            Tab::Planned => "planned",
        }
    }

    pub fn parse_tab(s: &str) -> Option<Tab> {
        Tab::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    List,
    Grid,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::List => "list",
            ViewMode::Grid => "grid",
        }
    }

    pub fn toggled(self) -> ViewMode {
        match self {
            ViewMode::List => ViewMode::Grid,
            ViewMode::Grid => ViewMode::List,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Persisted UI preferences (written under the `ui` key)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiPrefs {
    #[serde(default)]
    pub selected_task: Option<String>,
    #[serde(default)]
    pub active_tab: Tab,
    #[serde(default)]
    pub view: ViewMode,
    #[serde(default)]
    pub theme: Theme,
}

/// Everything the store holds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    /// Keyed by task id, insertion order preserved
    pub tasks: IndexMap<String, Task>,
    pub lists: Vec<TaskList>,
    pub selected_task: Option<String>,
    pub active_tab: Tab,
    pub view: ViewMode,
    pub theme: Theme,
}

impl AppState {
    /// Assemble state from persisted collections. Later duplicates of an id are dropped.
    pub fn from_parts(tasks: Vec<Task>, lists: Vec<TaskList>, ui: UiPrefs) -> Self {
        let mut map = IndexMap::with_capacity(tasks.len());
        for task in tasks {
            if map.contains_key(&task.id) {
                tracing::warn!(task_id = %task.id, "dropping duplicate task id on load");
                continue;
            }
            map.insert(task.id.clone(), task);
        }
        AppState {
            tasks: map,
            lists,
            selected_task: ui.selected_task,
            active_tab: ui.active_tab,
            view: ui.view,
            theme: ui.theme,
        }
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    pub fn list(&self, id: &str) -> Option<&TaskList> {
        self.lists.iter().find(|l| l.id == id)
    }

    pub fn list_mut(&mut self, id: &str) -> Option<&mut TaskList> {
        self.lists.iter_mut().find(|l| l.id == id)
    }

    /// The selected task, or `None` if nothing is selected or the id dangles
    pub fn selected(&self) -> Option<&Task> {
        self.selected_task.as_deref().and_then(|id| self.task(id))
    }

    /// Tasks in insertion order
    pub fn task_vec(&self) -> Vec<&Task> {
        self.tasks.values().collect()
    }

    pub fn ui_prefs(&self) -> UiPrefs {
        UiPrefs {
            selected_task: self.selected_task.clone(),
            active_tab: self.active_tab,
            view: self.view,
            theme: self.theme,
        }
    }
}
