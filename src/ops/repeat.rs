use chrono::{DateTime, Days, Months, NaiveDate, Utc};

use crate::model::state::AppState;
use crate::model::task::{Repeat, Step};
use crate::ops::{Outcome, Target};

/// The due date one repeat interval after `date`.
///
/// Monthly repeats clamp to the last day of a shorter month
/// (Jan 31 → Feb 29 in a leap year). `None` and `Never` keep the date.
pub fn next_due_date(date: NaiveDate, repeat: Repeat) -> NaiveDate {
    let next = match repeat {
        Repeat::Daily => date.checked_add_days(Days::new(1)),
        Repeat::Weekly => date.checked_add_days(Days::new(7)),
        Repeat::Monthly => date.checked_add_months(Months::new(1)),
        Repeat::None | Repeat::Never => Some(date),
    };
    next.unwrap_or(date)
}

/// Append the next occurrence of a repeating task.
///
/// Does nothing when the source repeats `never`. The copy gets a fresh id from
/// `next_id`, as does every step; it starts incomplete with all steps
/// incomplete, and its due date (if any) moves forward one interval.
/// Called on demand; nothing schedules this.
pub fn create_repeated_task(
    state: &mut AppState,
    task_id: &str,
    now: DateTime<Utc>,
    next_id: &mut impl FnMut() -> String,
) -> Outcome {
    let Some(source) = state.task(task_id) else {
        return Outcome::NotFound(Target::Task(task_id.to_string()));
    };
    if source.repeat == Repeat::Never {
        return Outcome::Unchanged;
    }

    let mut copy = source.clone();
    copy.id = next_id();
    copy.created_at = now;
    copy.completed = false;
    copy.steps = source
        .steps
        .iter()
        .map(|step| Step {
            id: next_id(),
            title: step.title.clone(),
            completed: false,
        })
        .collect();
    copy.due_date = source.due_date.map(|d| next_due_date(d, source.repeat));

    let id = copy.id.clone();
    state.tasks.insert(id.clone(), copy);
    Outcome::Created(id)
}
