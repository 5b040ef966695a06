use crate::model::list::{ListPatch, TaskList};
use crate::model::state::AppState;
use crate::ops::{Outcome, Target, ValidationError};

fn with_list(state: &mut AppState, id: &str, f: impl FnOnce(&mut TaskList) -> bool) -> Outcome {
    match state.list_mut(id) {
        Some(list) => Outcome::from_change(f(list)),
        None => Outcome::NotFound(Target::List(id.to_string())),
    }
}

// ---------------------------------------------------------------------------
// List CRUD
// ---------------------------------------------------------------------------

/// Append a list as given. Title uniqueness is checked by [`create_list`], not here.
pub fn add_list(state: &mut AppState, list: TaskList) -> Outcome {
    let id = list.id.clone();
    state.lists.push(list);
    Outcome::Created(id)
}

/// Validate a new list title and append an empty list under `id`.
///
/// The title is trimmed; empty titles and titles matching an existing list
/// case-insensitively are rejected with state unchanged.
pub fn create_list(state: &mut AppState, title: &str, id: String) -> Result<Outcome, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyListTitle);
    }
    if state.lists.iter().any(|l| l.title_matches(title)) {
        return Err(ValidationError::DuplicateList(title.to_string()));
    }
    Ok(add_list(state, TaskList::new(id, title.to_string())))
}

/// Retitle a list. The title is trimmed; empty titles and titles matching
/// another list case-insensitively are rejected with state unchanged.
pub fn rename_list(state: &mut AppState, id: &str, title: &str) -> Result<Outcome, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyListTitle);
    }
    if state.lists.iter().any(|l| l.id != id && l.title_matches(title)) {
        return Err(ValidationError::DuplicateList(title.to_string()));
    }
    Ok(with_list(state, id, |list| {
        if list.title == title {
            false
        } else {
            list.title = title.to_string();
            true
        }
    }))
}

/// Merge a patch as given. Title uniqueness is checked by [`rename_list`], not here.
pub fn update_list(state: &mut AppState, id: &str, patch: ListPatch) -> Outcome {
    with_list(state, id, |list| patch.apply(list))
}

/// Remove a list. Tasks are untouched.
pub fn delete_list(state: &mut AppState, id: &str) -> Outcome {
    let before = state.lists.len();
    state.lists.retain(|l| l.id != id);
    if state.lists.len() == before {
        Outcome::NotFound(Target::List(id.to_string()))
    } else {
        Outcome::Applied
    }
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// Append `task_id` to the list unless already present. The task need not exist.
pub fn add_task_to_list(state: &mut AppState, list_id: &str, task_id: &str) -> Outcome {
    with_list(state, list_id, |list| {
        if list.contains(task_id) {
            false
        } else {
            list.tasks.push(task_id.to_string());
            true
        }
    })
}

pub fn remove_task_from_list(state: &mut AppState, list_id: &str, task_id: &str) -> Outcome {
    with_list(state, list_id, |list| {
        let before = list.tasks.len();
        list.tasks.retain(|t| t != task_id);
        list.tasks.len() != before
    })
}

// ---------------------------------------------------------------------------
// Reference cleanup
// ---------------------------------------------------------------------------

/// Drop `task_id` from every list that references it
pub fn purge_task_references(state: &mut AppState, task_id: &str) -> Outcome {
    let mut changed = false;
    for list in &mut state.lists {
        let before = list.tasks.len();
        list.tasks.retain(|t| t != task_id);
        changed |= list.tasks.len() != before;
    }
    Outcome::from_change(changed)
}

/// What a [`reconcile`] pass cleaned up
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub selection_cleared: bool,
    /// (list id, dangling task id) pairs that were removed
    pub dropped_references: Vec<(String, String)>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        !self.selection_cleared && self.dropped_references.is_empty()
    }
}

/// Clear a dangling selection and remove list references to missing tasks
pub fn reconcile(state: &mut AppState) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    if let Some(id) = &state.selected_task {
        if !state.tasks.contains_key(id) {
            state.selected_task = None;
            report.selection_cleared = true;
        }
    }

    let tasks = &state.tasks;
    for list in &mut state.lists {
        list.tasks.retain(|task_id| {
            let keep = tasks.contains_key(task_id);
            if !keep {
                report
                    .dropped_references
                    .push((list.id.clone(), task_id.clone()));
            }
            keep
        });
    }
    report
}
