//! The state owner: applies transitions and writes changed collections through
//! to storage.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::io::storage::{self, Storage, StorageError};
use crate::model::auth::User;
use crate::model::config::StoreConfig;
use crate::model::list::{ListPatch, TaskList};
use crate::model::state::{AppState, Tab, UiPrefs};
use crate::model::task::{Priority, Repeat, Step, Task, TaskDraft, TaskPatch};
use crate::ops::list_ops::{self, ReconcileReport};
use crate::ops::{Outcome, Target, ValidationError, repeat, task_ops};

pub const TASKS_KEY: &str = "tasks";
pub const LISTS_KEY: &str = "lists";
pub const UI_KEY: &str = "ui";
pub const SESSION_KEY: &str = "session";

/// Error type for store dispatch
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(Target),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A state transition request
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddTask(TaskDraft),
    ToggleTask(String),
    UpdateTask { id: String, patch: TaskPatch },
    DeleteTask(String),
    SelectTask(Option<String>),
    SetActiveTab(Tab),
    ToggleView,
    ToggleTheme,
    AddTaskStep { task_id: String, step: Step },
    ToggleTaskStep { task_id: String, step_id: String },
    SetTaskDueDate { id: String, due_date: Option<NaiveDate> },
    SetTaskReminder { id: String, reminder: Option<DateTime<Utc>> },
    SetTaskRepeat { id: String, repeat: Repeat },
    UpdateTaskNotes { id: String, notes: Option<String> },
    UpdateTaskTags { id: String, tags: Vec<String> },
    UpdateTaskPriority { id: String, priority: Priority },
    AddTaskTag { id: String, tag: String },
    RemoveTaskTag { id: String, tag: String },
    ToggleImportant(String),
    CreateRepeatedTask(String),
    AddList(TaskList),
    /// Validated creation: trims, rejects empty and duplicate titles
    CreateList(String),
    /// Validated retitle: trims, rejects empty titles and other lists' titles
    RenameList { id: String, title: String },
    UpdateList { id: String, patch: ListPatch },
    DeleteList(String),
    AddTaskToList { list_id: String, task_id: String },
    RemoveTaskFromList { list_id: String, task_id: String },
    PurgeTaskReferences(String),
}

/// Which persisted collections an action can change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Touched {
    tasks: bool,
    lists: bool,
    ui: bool,
}

impl Action {
    fn touched(&self, options: &StoreConfig) -> Touched {
        use Action::*;
        match self {
            DeleteTask(_) => Touched {
                tasks: true,
                lists: options.purge_lists_on_delete,
                ui: true,
            },
            SelectTask(_) | SetActiveTab(_) | ToggleView | ToggleTheme => Touched {
                ui: true,
                ..Default::default()
            },
            AddList(_)
            | CreateList(_)
            | RenameList { .. }
            | UpdateList { .. }
            | DeleteList(_)
            | AddTaskToList { .. }
            | RemoveTaskFromList { .. }
            | PurgeTaskReferences(_) => Touched {
                lists: true,
                ..Default::default()
            },
            _ => Touched {
                tasks: true,
                ..Default::default()
            },
        }
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Owns the application state and its storage backend
pub struct Store {
    state: AppState,
    storage: Box<dyn Storage>,
    options: StoreConfig,
    last_persist_error: Option<StorageError>,
}

impl Store {
    /// Load tasks, lists and UI preferences from `storage`. Missing or corrupt
    /// data starts empty.
    pub fn open(storage: Box<dyn Storage>, options: StoreConfig) -> Self {
        let tasks: Vec<Task> = storage::load_or_default(storage.as_ref(), TASKS_KEY, Vec::new());
        let lists: Vec<TaskList> =
            storage::load_or_default(storage.as_ref(), LISTS_KEY, Vec::new());
        let ui: UiPrefs = storage::load_or_default(storage.as_ref(), UI_KEY, UiPrefs::default());
        tracing::debug!(tasks = tasks.len(), lists = lists.len(), "store opened");
        Store {
            state: AppState::from_parts(tasks, lists, ui),
            storage,
            options,
            last_persist_error: None,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The most recent write failure, if any. In-memory state stays
    /// authoritative when a write fails.
    pub fn persist_error(&self) -> Option<&StorageError> {
        self.last_persist_error.as_ref()
    }

    /// Apply `action`, then write through every collection it changed.
    ///
    /// Missing targets come back as `Ok(Outcome::NotFound)` unless the store
    /// is strict, in which case they are `Err(StoreError::NotFound)`.
    pub fn dispatch(&mut self, action: Action) -> Result<Outcome, StoreError> {
        let touched = action.touched(&self.options);
        let outcome = self.reduce(action)?;

        if outcome.is_changed() {
            self.persist(touched);
        }

        if let Outcome::NotFound(target) = &outcome {
            if self.options.strict {
                return Err(StoreError::NotFound(target.clone()));
            }
            tracing::debug!(%target, "transition target not found");
        }
        Ok(outcome)
    }

    fn reduce(&mut self, action: Action) -> Result<Outcome, ValidationError> {
        let state = &mut self.state;
        let outcome = match action {
            Action::AddTask(draft) => task_ops::add_task(state, draft, new_id(), Utc::now()),
            Action::ToggleTask(id) => task_ops::toggle_task(state, &id),
            Action::UpdateTask { id, patch } => task_ops::update_task(state, &id, patch),
            Action::DeleteTask(id) => {
                let outcome = task_ops::delete_task(state, &id);
                if outcome.is_changed() && self.options.purge_lists_on_delete {
                    let _ = list_ops::purge_task_references(state, &id);
                }
                outcome
            }
            Action::SelectTask(id) => task_ops::select_task(state, id),
            Action::SetActiveTab(tab) => task_ops::set_active_tab(state, tab),
            Action::ToggleView => task_ops::toggle_view(state),
            Action::ToggleTheme => task_ops::toggle_theme(state),
            Action::AddTaskStep { task_id, step } => task_ops::add_task_step(state, &task_id, step),
            Action::ToggleTaskStep { task_id, step_id } => {
                task_ops::toggle_task_step(state, &task_id, &step_id)
            }
            Action::SetTaskDueDate { id, due_date } => {
                task_ops::set_task_due_date(state, &id, due_date)
            }
            Action::SetTaskReminder { id, reminder } => {
                task_ops::set_task_reminder(state, &id, reminder)
            }
            Action::SetTaskRepeat { id, repeat } => task_ops::set_task_repeat(state, &id, repeat),
            Action::UpdateTaskNotes { id, notes } => task_ops::update_task_notes(state, &id, notes),
            Action::UpdateTaskTags { id, tags } => task_ops::update_task_tags(state, &id, tags),
            Action::UpdateTaskPriority { id, priority } => {
                task_ops::update_task_priority(state, &id, priority)
            }
            Action::AddTaskTag { id, tag } => task_ops::add_task_tag(state, &id, tag),
            Action::RemoveTaskTag { id, tag } => task_ops::remove_task_tag(state, &id, &tag),
            Action::ToggleImportant(id) => task_ops::toggle_important(state, &id),
            Action::CreateRepeatedTask(id) => {
                repeat::create_repeated_task(state, &id, Utc::now(), &mut new_id)
            }
            Action::AddList(list) => list_ops::add_list(state, list),
            Action::CreateList(title) => list_ops::create_list(state, &title, new_id())?,
            Action::RenameList { id, title } => list_ops::rename_list(state, &id, &title)?,
            Action::UpdateList { id, patch } => list_ops::update_list(state, &id, patch),
            Action::DeleteList(id) => list_ops::delete_list(state, &id),
            Action::AddTaskToList { list_id, task_id } => {
                list_ops::add_task_to_list(state, &list_id, &task_id)
            }
            Action::RemoveTaskFromList { list_id, task_id } => {
                list_ops::remove_task_from_list(state, &list_id, &task_id)
            }
            Action::PurgeTaskReferences(id) => list_ops::purge_task_references(state, &id),
        };
        Ok(outcome)
    }

    /// Clear a dangling selection and drop list references to missing tasks
    pub fn reconcile(&mut self) -> ReconcileReport {
        let report = list_ops::reconcile(&mut self.state);
        self.persist(Touched {
            tasks: false,
            lists: !report.dropped_references.is_empty(),
            ui: report.selection_cleared,
        });
        report
    }

    fn persist(&mut self, touched: Touched) {
        if touched.tasks {
            let tasks = self.state.task_vec();
            let result = storage::save(self.storage.as_mut(), TASKS_KEY, &tasks);
            self.record(TASKS_KEY, result);
        }
        if touched.lists {
            let result = storage::save(self.storage.as_mut(), LISTS_KEY, &self.state.lists);
            self.record(LISTS_KEY, result);
        }
        if touched.ui {
            let result = storage::save(self.storage.as_mut(), UI_KEY, &self.state.ui_prefs());
            self.record(UI_KEY, result);
        }
    }

    fn record(&mut self, key: &str, result: Result<(), StorageError>) {
        if let Err(e) = result {
            tracing::error!(key, error = %e, "could not persist changes; keeping in-memory state");
            self.last_persist_error = Some(e);
        }
    }

    // -----------------------------------------------------------------------
    // Convenience wrappers
    // -----------------------------------------------------------------------

    /// Add a task and return its new id
    pub fn add_task(&mut self, draft: TaskDraft) -> Result<String, StoreError> {
        let outcome = self.dispatch(Action::AddTask(draft))?;
        Ok(outcome.created_id().map(str::to_string).unwrap_or_default())
    }

    /// Add a step with a fresh id to a task. Returns the outcome and the step id.
    pub fn add_step(&mut self, task_id: &str, title: String) -> Result<(Outcome, String), StoreError> {
        let step = Step::new(new_id(), title);
        let step_id = step.id.clone();
        let outcome = self.dispatch(Action::AddTaskStep {
            task_id: task_id.to_string(),
            step,
        })?;
        Ok((outcome, step_id))
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    pub fn session(&self) -> Option<User> {
        storage::load_or_default(self.storage.as_ref(), SESSION_KEY, None)
    }

    pub fn save_session(&mut self, user: &User) -> Result<(), StorageError> {
        storage::save(self.storage.as_mut(), SESSION_KEY, &Some(user))
    }

    pub fn clear_session(&mut self) -> Result<(), StorageError> {
        storage::save(self.storage.as_mut(), SESSION_KEY, &None::<User>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::storage::MemoryStorage;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    /// Storage whose contents stay visible to the test after the store takes ownership
    #[derive(Clone, Default)]
    struct SharedStorage {
        entries: Rc<RefCell<HashMap<String, String>>>,
        fail_writes: bool,
        writes: Rc<RefCell<Vec<String>>>,
    }

    impl SharedStorage {
        fn raw(&self, key: &str) -> Option<String> {
            self.entries.borrow().get(key).cloned()
        }

        fn writes(&self) -> Vec<String> {
            self.writes.borrow().clone()
        }
    }

    impl Storage for SharedStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            Ok(self.entries.borrow().get(key).cloned())
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            self.writes.borrow_mut().push(key.to_string());
            if self.fail_writes {
                return Err(StorageError::WriteError {
                    path: key.into(),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.entries
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    fn open(shared: &SharedStorage) -> Store {
        Store::open(Box::new(shared.clone()), StoreConfig::default())
    }

    fn stored_tasks(shared: &SharedStorage) -> Vec<Task> {
        serde_json::from_str(&shared.raw(TASKS_KEY).unwrap()).unwrap()
    }

    #[test]
    fn test_add_task_writes_through() {
        let shared = SharedStorage::default();
        let mut store = open(&shared);
        let id = store.add_task(TaskDraft::titled("Laundry")).unwrap();
        let stored = stored_tasks(&shared);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, id);
        assert_eq!(stored[0].title, "Laundry");
        assert_eq!(shared.writes(), vec![TASKS_KEY.to_string()]);
    }

    #[test]
    fn test_store_survives_reopen() {
        let shared = SharedStorage::default();
        let mut store = open(&shared);
        let a = store.add_task(TaskDraft::titled("A")).unwrap();
        let b = store.add_task(TaskDraft::titled("B")).unwrap();
        let _ = store.dispatch(Action::ToggleTask(b.clone())).unwrap();
        let _ = store.dispatch(Action::CreateList("Home".into())).unwrap();
        let _ = store.dispatch(Action::ToggleTheme).unwrap();
        let _ = store.dispatch(Action::SelectTask(Some(a.clone()))).unwrap();

        let reopened = open(&shared);
        assert_eq!(reopened.state(), store.state());
        let ids: Vec<&String> = reopened.state().tasks.keys().collect();
        assert_eq!(ids, vec![&a, &b]);
    }

    #[test]
    fn test_not_found_is_silent_by_default() {
        let shared = SharedStorage::default();
        let mut store = open(&shared);
        let outcome = store.dispatch(Action::ToggleTask("ghost".into())).unwrap();
        assert_eq!(outcome, Outcome::NotFound(Target::Task("ghost".into())));
        assert!(shared.writes().is_empty());
    }

    #[test]
    fn test_strict_mode_reports_not_found() {
        let options = StoreConfig {
            strict: true,
            ..Default::default()
        };
        let mut store = Store::open(Box::new(MemoryStorage::new()), options);
        let err = store.dispatch(Action::DeleteList("ghost".into())).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(Target::List(id)) if id == "ghost"));
    }

    #[test]
    fn test_unchanged_does_not_write() {
        let shared = SharedStorage::default();
        let mut store = open(&shared);
        let id = store.add_task(TaskDraft::titled("A")).unwrap();
        let outcome = store
            .dispatch(Action::UpdateTaskPriority {
                id,
                priority: Priority::Medium,
            })
            .unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
        assert_eq!(shared.writes().len(), 1);
    }

    #[test]
    fn test_duplicate_list_is_validation_error() {
        let shared = SharedStorage::default();
        let mut store = open(&shared);
        let _ = store.dispatch(Action::CreateList("Groceries".into())).unwrap();
        let err = store
            .dispatch(Action::CreateList("groceries".into()))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::DuplicateList(_))
        ));
        assert_eq!(store.state().lists.len(), 1);
    }

    #[test]
    fn test_rename_to_taken_title_is_validation_error() {
        let shared = SharedStorage::default();
        let mut store = open(&shared);
        let _ = store.dispatch(Action::CreateList("Groceries".into())).unwrap();
        let work = store
            .dispatch(Action::CreateList("Work".into()))
            .unwrap()
            .created_id()
            .unwrap()
            .to_string();
        let writes = shared.writes().len();

        let err = store
            .dispatch(Action::RenameList {
                id: work.clone(),
                title: "groceries".into(),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::DuplicateList(_))
        ));
        assert_eq!(store.state().list(&work).unwrap().title, "Work");
        assert_eq!(shared.writes().len(), writes);
    }

    #[test]
    fn test_delete_purges_lists_when_configured() {
        let options = StoreConfig {
            purge_lists_on_delete: true,
            ..Default::default()
        };
        let shared = SharedStorage::default();
        let mut store = Store::open(Box::new(shared.clone()), options);
        let id = store.add_task(TaskDraft::titled("A")).unwrap();
        let list_id = store
            .dispatch(Action::CreateList("L".into()))
            .unwrap()
            .created_id()
            .unwrap()
            .to_string();
        let _ = store
            .dispatch(Action::AddTaskToList {
                list_id: list_id.clone(),
                task_id: id.clone(),
            })
            .unwrap();
        let _ = store.dispatch(Action::DeleteTask(id)).unwrap();

        assert!(store.state().list(&list_id).unwrap().tasks.is_empty());
        let lists: Vec<TaskList> = serde_json::from_str(&shared.raw(LISTS_KEY).unwrap()).unwrap();
        assert!(lists[0].tasks.is_empty());
    }

    #[test]
    fn test_delete_keeps_list_references_by_default() {
        let mut store = Store::open(Box::new(MemoryStorage::new()), StoreConfig::default());
        let id = store.add_task(TaskDraft::titled("A")).unwrap();
        let list_id = store
            .dispatch(Action::CreateList("L".into()))
            .unwrap()
            .created_id()
            .unwrap()
            .to_string();
        let _ = store
            .dispatch(Action::AddTaskToList {
                list_id: list_id.clone(),
                task_id: id.clone(),
            })
            .unwrap();
        let _ = store.dispatch(Action::DeleteTask(id.clone())).unwrap();
        assert!(store.state().list(&list_id).unwrap().contains(&id));

        let report = store.reconcile();
        assert_eq!(report.dropped_references, vec![(list_id.clone(), id)]);
        assert!(store.state().list(&list_id).unwrap().tasks.is_empty());
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let shared = SharedStorage {
            fail_writes: true,
            ..Default::default()
        };
        let mut store = open(&shared);
        let id = store.add_task(TaskDraft::titled("A")).unwrap();
        assert!(store.state().task(&id).is_some());
        assert!(store.persist_error().is_some());
        assert!(shared.raw(TASKS_KEY).is_none());
    }

    #[test]
    fn test_corrupt_tasks_blob_opens_empty() {
        let storage = MemoryStorage::new()
            .with_entry(TASKS_KEY, "{oops")
            .with_entry(LISTS_KEY, r#"[{"id":"l1","title":"Work","tasks":["t9"]}]"#);
        let store = Store::open(Box::new(storage), StoreConfig::default());
        assert!(store.state().tasks.is_empty());
        assert_eq!(store.state().lists.len(), 1);
    }

    #[test]
    fn test_repeat_through_store() {
        let mut store = Store::open(Box::new(MemoryStorage::new()), StoreConfig::default());
        let mut draft = TaskDraft::titled("Gym");
        draft.repeat = Repeat::Weekly;
        draft.due_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        let id = store.add_task(draft).unwrap();
        let (_, step_id) = store.add_step(&id, "Warm up".into()).unwrap();

        let outcome = store.dispatch(Action::CreateRepeatedTask(id.clone())).unwrap();
        let new_id = outcome.created_id().unwrap();
        let copy = store.state().task(new_id).unwrap();
        assert_ne!(new_id, id);
        assert_eq!(copy.due_date, NaiveDate::from_ymd_opt(2024, 1, 8));
        assert_ne!(copy.steps[0].id, step_id);
    }

    #[test]
    fn test_session_round_trip() {
        let shared = SharedStorage::default();
        let mut store = open(&shared);
        assert!(store.session().is_none());
        let user = User {
            id: "1".into(),
            name: "Demo User".into(),
            email: "demo@example.com".into(),
            avatar: String::new(),
        };
        store.save_session(&user).unwrap();
        assert_eq!(open(&shared).session(), Some(user));
        store.clear_session().unwrap();
        assert!(store.session().is_none());
    }
}
