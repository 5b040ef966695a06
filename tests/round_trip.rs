//! Store state survives a close/reopen through file storage.

use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use doit::io::storage::{FileStorage, Storage};
use doit::model::config::StoreConfig;
use doit::model::state::{Tab, Theme};
use doit::model::task::{Priority, Repeat, TaskDraft};
use doit::ops::Outcome;
use doit::store::{Action, Store};

fn open(dir: &std::path::Path) -> Store {
    Store::open(Box::new(FileStorage::new(dir)), StoreConfig::default())
}

#[test]
fn test_reopen_restores_everything() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut store = open(tmp.path());

    let mut draft = TaskDraft::titled("Pay rent");
    draft.priority = Priority::High;
    draft.due_date = NaiveDate::from_ymd_opt(2030, 1, 31);
    draft.repeat = Repeat::Monthly;
    draft.tags = vec!["home".into(), "home".into()];
    let rent = store.add_task(draft).unwrap();
    let other = store.add_task(TaskDraft::titled("Read")).unwrap();
    let (_, step) = store.add_step(&rent, "Transfer".into()).unwrap();

    let list = store
        .dispatch(Action::CreateList("Bills".into()))
        .unwrap()
        .created_id()
        .unwrap()
        .to_string();
    let _ = store
        .dispatch(Action::AddTaskToList {
            list_id: list.clone(),
            task_id: rent.clone(),
        })
        .unwrap();
    let _ = store
        .dispatch(Action::ToggleTaskStep {
            task_id: rent.clone(),
            step_id: step,
        })
        .unwrap();
    let _ = store.dispatch(Action::SelectTask(Some(other.clone()))).unwrap();
    let _ = store.dispatch(Action::SetActiveTab(Tab::Planned)).unwrap();
    let _ = store.dispatch(Action::ToggleTheme).unwrap();
    assert!(store.persist_error().is_none());

    let reopened = open(tmp.path());
    assert_eq!(reopened.state(), store.state());
    let order: Vec<&str> = reopened.state().tasks.keys().map(String::as_str).collect();
    assert_eq!(order, vec![rent.as_str(), other.as_str()]);
    assert_eq!(reopened.state().theme, Theme::Dark);
    assert_eq!(reopened.state().lists[0].tasks, vec![rent]);
}

#[test]
fn test_next_occurrence_persists() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut store = open(tmp.path());

    let mut draft = TaskDraft::titled("Pay rent");
    draft.due_date = NaiveDate::from_ymd_opt(2030, 1, 31);
    draft.repeat = Repeat::Monthly;
    let rent = store.add_task(draft).unwrap();

    let Outcome::Created(next) = store.dispatch(Action::CreateRepeatedTask(rent)).unwrap() else {
        panic!("expected a new task");
    };
    let reopened = open(tmp.path());
    assert_eq!(
        reopened.state().task(&next).unwrap().due_date,
        NaiveDate::from_ymd_opt(2030, 2, 28)
    );
}

#[test]
fn test_files_are_plain_json_arrays() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut store = open(tmp.path());
    store.add_task(TaskDraft::titled("One")).unwrap();

    let storage = FileStorage::new(tmp.path());
    let raw = storage.get("tasks").unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 1);
    assert_eq!(value[0]["title"], "One");
    assert_eq!(value[0]["repeat"], "none");
    assert!(value[0].get("dueDate").is_none());
}
