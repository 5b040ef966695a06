use chrono::{DateTime, NaiveDate, Utc};

use crate::model::state::{AppState, Tab};
use crate::model::task::{Priority, Repeat, Step, Task, TaskDraft, TaskPatch};
use crate::ops::{Outcome, Target};

/// Run `f` against the task with `id`. `f` reports whether it changed anything.
fn with_task(state: &mut AppState, id: &str, f: impl FnOnce(&mut Task) -> bool) -> Outcome {
    match state.task_mut(id) {
        Some(task) => Outcome::from_change(f(task)),
        None => Outcome::NotFound(Target::Task(id.to_string())),
    }
}

/// Assign `value` to `slot` if it differs
fn set_field<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

// ---------------------------------------------------------------------------
// Task CRUD
// ---------------------------------------------------------------------------

/// Append a new task built from `draft`. The caller supplies a fresh id and the
/// creation time; `completed` is always false. Titles are not validated here.
pub fn add_task(state: &mut AppState, draft: TaskDraft, id: String, now: DateTime<Utc>) -> Outcome {
    let task = Task::from_draft(draft, id.clone(), now);
    state.tasks.insert(id.clone(), task);
    Outcome::Created(id)
}

pub fn toggle_task(state: &mut AppState, id: &str) -> Outcome {
    with_task(state, id, |task| {
        task.completed = !task.completed;
        true
    })
}

/// Merge `patch` into the task. The id is not part of a patch and cannot change.
pub fn update_task(state: &mut AppState, id: &str, patch: TaskPatch) -> Outcome {
    with_task(state, id, |task| patch.apply(task))
}

/// Remove a task. Clears the selection if it pointed here. Lists keep their
/// reference; see [`crate::ops::list_ops::purge_task_references`].
pub fn delete_task(state: &mut AppState, id: &str) -> Outcome {
    if state.tasks.shift_remove(id).is_none() {
        return Outcome::NotFound(Target::Task(id.to_string()));
    }
    if state.selected_task.as_deref() == Some(id) {
        state.selected_task = None;
    }
    Outcome::Applied
}

// ---------------------------------------------------------------------------
// Selection and preferences
// ---------------------------------------------------------------------------

/// Point the selection at `id` (or clear it). No existence check.
pub fn select_task(state: &mut AppState, id: Option<String>) -> Outcome {
    Outcome::from_change(set_field(&mut state.selected_task, id))
}

pub fn set_active_tab(state: &mut AppState, tab: Tab) -> Outcome {
    Outcome::from_change(set_field(&mut state.active_tab, tab))
}

pub fn toggle_view(state: &mut AppState) -> Outcome {
    state.view = state.view.toggled();
    Outcome::Applied
}

pub fn toggle_theme(state: &mut AppState) -> Outcome {
    state.theme = state.theme.toggled();
    Outcome::Applied
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

pub fn add_task_step(state: &mut AppState, task_id: &str, step: Step) -> Outcome {
    with_task(state, task_id, |task| {
        task.steps.push(step);
        true
    })
}

pub fn toggle_task_step(state: &mut AppState, task_id: &str, step_id: &str) -> Outcome {
    let Some(task) = state.task_mut(task_id) else {
        return Outcome::NotFound(Target::Task(task_id.to_string()));
    };
    match task.find_step_mut(step_id) {
        Some(step) => {
            step.completed = !step.completed;
            Outcome::Applied
        }
        None => Outcome::NotFound(Target::Step {
            task_id: task_id.to_string(),
            step_id: step_id.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Single-field setters
// ---------------------------------------------------------------------------

pub fn set_task_due_date(state: &mut AppState, id: &str, due_date: Option<NaiveDate>) -> Outcome {
    with_task(state, id, |task| set_field(&mut task.due_date, due_date))
}

pub fn set_task_reminder(
    state: &mut AppState,
    id: &str,
    reminder: Option<DateTime<Utc>>,
) -> Outcome {
    with_task(state, id, |task| set_field(&mut task.reminder, reminder))
}

pub fn set_task_repeat(state: &mut AppState, id: &str, repeat: Repeat) -> Outcome {
    with_task(state, id, |task| set_field(&mut task.repeat, repeat))
}

pub fn update_task_notes(state: &mut AppState, id: &str, notes: Option<String>) -> Outcome {
    with_task(state, id, |task| set_field(&mut task.notes, notes))
}

/// Replace the tag sequence wholesale
pub fn update_task_tags(state: &mut AppState, id: &str, tags: Vec<String>) -> Outcome {
    with_task(state, id, |task| set_field(&mut task.tags, tags))
}

pub fn update_task_priority(state: &mut AppState, id: &str, priority: Priority) -> Outcome {
    with_task(state, id, |task| set_field(&mut task.priority, priority))
}

/// Append a tag. Duplicates are allowed.
pub fn add_task_tag(state: &mut AppState, id: &str, tag: String) -> Outcome {
    with_task(state, id, |task| {
        task.tags.push(tag);
        true
    })
}

/// Remove every occurrence of `tag`
pub fn remove_task_tag(state: &mut AppState, id: &str, tag: &str) -> Outcome {
    with_task(state, id, |task| {
        let before = task.tags.len();
        task.tags.retain(|t| t != tag);
        task.tags.len() != before
    })
}

/// Star toggle: high ↔ medium (low becomes high)
pub fn toggle_important(state: &mut AppState, id: &str) -> Outcome {
    with_task(state, id, |task| {
        task.priority = if task.priority == Priority::High {
            Priority::Medium
        } else {
            Priority::High
        };
        true
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::state::{Theme, ViewMode};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn sample_state() -> AppState {
        let mut state = AppState::default();
        let _ = add_task(&mut state, TaskDraft::titled("Buy milk"), "T-1".into(), now());
        let _ = add_task(&mut state, TaskDraft::titled("Call mom"), "T-2".into(), now());
        let mut draft = TaskDraft::titled("Plan trip");
        draft.steps = vec![
            Step::new("S-1".into(), "Pick dates".into()),
            Step::new("S-2".into(), "Book hotel".into()),
        ];
        let _ = add_task(&mut state, draft, "T-3".into(), now());
        state
    }

    // --- CRUD ---

    #[test]
    fn test_add_task_forces_incomplete_and_appends() {
        let mut state = sample_state();
        let outcome = add_task(&mut state, TaskDraft::titled("New"), "T-9".into(), now());
        assert_eq!(outcome, Outcome::Created("T-9".into()));
        let last = state.tasks.values().last().unwrap();
        assert_eq!(last.id, "T-9");
        assert!(!last.completed);
        assert_eq!(last.created_at, now());
    }

    #[test]
    fn test_add_task_accepts_empty_title() {
        let mut state = AppState::default();
        let _ = add_task(&mut state, TaskDraft::default(), "T-1".into(), now());
        assert_eq!(state.task("T-1").unwrap().title, "");
    }

    #[test]
    fn test_add_then_delete_restores_size() {
        let mut state = sample_state();
        let before = state.tasks.len();
        let _ = add_task(&mut state, TaskDraft::titled("Temp"), "T-tmp".into(), now());
        assert_eq!(delete_task(&mut state, "T-tmp"), Outcome::Applied);
        assert_eq!(state.tasks.len(), before);
        assert!(state.task("T-tmp").is_none());
    }

    #[test]
    fn test_toggle_twice_restores_completion() {
        let mut state = sample_state();
        assert_eq!(toggle_task(&mut state, "T-1"), Outcome::Applied);
        assert!(state.task("T-1").unwrap().completed);
        let _ = toggle_task(&mut state, "T-1");
        assert!(!state.task("T-1").unwrap().completed);
    }

    #[test]
    fn test_toggle_missing_is_not_found() {
        let mut state = sample_state();
        let before = state.clone();
        assert_eq!(
            toggle_task(&mut state, "nope"),
            Outcome::NotFound(Target::Task("nope".into()))
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_update_task_merges_fields() {
        let mut state = sample_state();
        let patch = TaskPatch {
            title: Some("Buy oat milk".into()),
            priority: Some(Priority::High),
            ..Default::default()
        };
        assert_eq!(update_task(&mut state, "T-1", patch), Outcome::Applied);
        let task = state.task("T-1").unwrap();
        assert_eq!(task.id, "T-1");
        assert_eq!(task.title, "Buy oat milk");
        assert_eq!(task.priority, Priority::High);
    }

    #[test]
    fn test_update_task_missing() {
        let mut state = sample_state();
        assert!(update_task(&mut state, "nope", TaskPatch::default()).is_not_found());
    }

    #[test]
    fn test_delete_selected_clears_selection() {
        let mut state = sample_state();
        let _ = select_task(&mut state, Some("T-2".into()));
        let _ = delete_task(&mut state, "T-2");
        assert!(state.selected_task.is_none());
    }

    #[test]
    fn test_delete_other_keeps_selection() {
        let mut state = sample_state();
        let _ = select_task(&mut state, Some("T-2".into()));
        let _ = delete_task(&mut state, "T-1");
        assert_eq!(state.selected_task.as_deref(), Some("T-2"));
    }

    #[test]
    fn test_delete_preserves_order_of_remaining() {
        let mut state = sample_state();
        let _ = delete_task(&mut state, "T-1");
        let ids: Vec<&str> = state.tasks.keys().map(|k| k.as_str()).collect();
        assert_eq!(ids, vec!["T-2", "T-3"]);
    }

    // --- Selection and preferences ---

    #[test]
    fn test_select_task_does_not_check_existence() {
        let mut state = sample_state();
        assert_eq!(select_task(&mut state, Some("ghost".into())), Outcome::Applied);
        assert_eq!(state.selected_task.as_deref(), Some("ghost"));
        assert!(state.selected().is_none());
        assert_eq!(select_task(&mut state, Some("ghost".into())), Outcome::Unchanged);
    }

    #[test]
    fn test_preference_toggles() {
        let mut state = AppState::default();
        let _ = toggle_view(&mut state);
        assert_eq!(state.view, ViewMode::Grid);
        let _ = toggle_view(&mut state);
        assert_eq!(state.view, ViewMode::List);
        let _ = toggle_theme(&mut state);
        assert_eq!(state.theme, Theme::Dark);
        assert_eq!(set_active_tab(&mut state, Tab::Planned), Outcome::Applied);
        assert_eq!(state.active_tab, Tab::Planned);
    }

    // --- Steps ---

    #[test]
    fn test_add_and_toggle_step() {
        let mut state = sample_state();
        let step = Step::new("S-9".into(), "Pay".into());
        assert_eq!(add_task_step(&mut state, "T-1", step), Outcome::Applied);
        assert_eq!(toggle_task_step(&mut state, "T-1", "S-9"), Outcome::Applied);
        assert!(state.task("T-1").unwrap().steps[0].completed);
    }

    #[test]
    fn test_toggle_step_missing_step_or_task() {
        let mut state = sample_state();
        assert_eq!(
            toggle_task_step(&mut state, "T-3", "S-404"),
            Outcome::NotFound(Target::Step {
                task_id: "T-3".into(),
                step_id: "S-404".into()
            })
        );
        assert_eq!(
            toggle_task_step(&mut state, "T-404", "S-1"),
            Outcome::NotFound(Target::Task("T-404".into()))
        );
    }

    // --- Setters ---

    #[test]
    fn test_single_field_setters() {
        let mut state = sample_state();
        let due = NaiveDate::from_ymd_opt(2024, 2, 14);
        assert_eq!(set_task_due_date(&mut state, "T-1", due), Outcome::Applied);
        assert_eq!(set_task_due_date(&mut state, "T-1", due), Outcome::Unchanged);
        let _ = set_task_reminder(&mut state, "T-1", Some(now()));
        let _ = set_task_repeat(&mut state, "T-1", Repeat::Weekly);
        let _ = update_task_notes(&mut state, "T-1", Some("2%".into()));
        let _ = update_task_tags(&mut state, "T-1", vec!["shop".into()]);
        let _ = update_task_priority(&mut state, "T-1", Priority::Low);

        let task = state.task("T-1").unwrap();
        assert_eq!(task.due_date, due);
        assert_eq!(task.reminder, Some(now()));
        assert_eq!(task.repeat, Repeat::Weekly);
        assert_eq!(task.notes.as_deref(), Some("2%"));
        assert_eq!(task.tags, vec!["shop".to_string()]);
        assert_eq!(task.priority, Priority::Low);
    }

    #[test]
    fn test_setters_on_missing_task() {
        let mut state = sample_state();
        let before = state.clone();
        assert!(set_task_repeat(&mut state, "x", Repeat::Daily).is_not_found());
        assert!(update_task_notes(&mut state, "x", None).is_not_found());
        assert!(update_task_priority(&mut state, "x", Priority::High).is_not_found());
        assert_eq!(state, before);
    }

    #[test]
    fn test_tags_allow_duplicates_and_remove_all() {
        let mut state = sample_state();
        let _ = add_task_tag(&mut state, "T-2", "family".into());
        let _ = add_task_tag(&mut state, "T-2", "family".into());
        assert_eq!(state.task("T-2").unwrap().tags.len(), 2);
        assert_eq!(remove_task_tag(&mut state, "T-2", "family"), Outcome::Applied);
        assert!(state.task("T-2").unwrap().tags.is_empty());
        assert_eq!(remove_task_tag(&mut state, "T-2", "family"), Outcome::Unchanged);
    }

    #[test]
    fn test_toggle_important() {
        let mut state = sample_state();
        let _ = toggle_important(&mut state, "T-1");
        assert_eq!(state.task("T-1").unwrap().priority, Priority::High);
        let _ = toggle_important(&mut state, "T-1");
        assert_eq!(state.task("T-1").unwrap().priority, Priority::Medium);
    }
}
