use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::model::state::Tab;
use crate::model::task::{Priority, Task};

/// Local calendar date a task was created on
fn created_on(task: &Task) -> NaiveDate {
    task.created_at.with_timezone(&Local).date_naive()
}

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

/// Whether `task` shows under `tab` on `today`
pub fn matches_tab(task: &Task, tab: Tab, today: NaiveDate) -> bool {
    match tab {
        Tab::All => true,
        Tab::Today => created_on(task) == today,
        Tab::Important => task.priority == Priority::High,
        Tab::Assigned => task.assigned_to.is_some(),
        Tab::Planned => task.due_date.is_some(),
    }
}

/// Tasks visible under `tab`, in insertion order
pub fn filter_by_tab<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    tab: Tab,
    today: NaiveDate,
) -> Vec<&'a Task> {
    tasks
        .into_iter()
        .filter(|t| matches_tab(t, tab, today))
        .collect()
}

// ---------------------------------------------------------------------------
// Status groups
// ---------------------------------------------------------------------------

/// Tasks grouped for display. A task created today with a due date shows in
/// both `today` and `upcoming`.
#[derive(Debug, Default)]
pub struct TaskGroups<'a> {
    /// Created today, not completed
    pub today: Vec<&'a Task>,
    /// Has a due date, not completed
    pub upcoming: Vec<&'a Task>,
    pub completed: Vec<&'a Task>,
}

impl<'a> TaskGroups<'a> {
    pub fn is_empty(&self) -> bool {
        self.today.is_empty() && self.upcoming.is_empty() && self.completed.is_empty()
    }

    /// Non-empty groups with their headings, in display order
    pub fn sections(&self) -> Vec<(&'static str, &[&'a Task])> {
        [
            ("Today", self.today.as_slice()),
            ("Upcoming", self.upcoming.as_slice()),
            ("Completed", self.completed.as_slice()),
        ]
        .into_iter()
        .filter(|(_, tasks)| !tasks.is_empty())
        .collect()
    }
}

pub fn group_by_status<'a>(tasks: &[&'a Task], today: NaiveDate) -> TaskGroups<'a> {
    let mut groups = TaskGroups::default();
    for &task in tasks {
        if task.completed {
            groups.completed.push(task);
            continue;
        }
        if created_on(task) == today {
            groups.today.push(task);
        }
        if task.due_date.is_some() {
            groups.upcoming.push(task);
        }
    }
    groups
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Sidebar counts
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub today: usize,
    pub today_pending: usize,
    pub important: usize,
    pub planned: usize,
    pub assigned: usize,
    pub completed: usize,
    /// Share of today's tasks that are done, 0–100
    pub today_progress: f64,
}

pub fn summary<'a>(tasks: impl IntoIterator<Item = &'a Task>, today: NaiveDate) -> Summary {
    let mut s = Summary::default();
    let mut today_done = 0;
    for task in tasks {
        s.total += 1;
        if created_on(task) == today {
            s.today += 1;
            if task.completed {
                today_done += 1;
            } else {
                s.today_pending += 1;
            }
        }
        if task.priority == Priority::High {
            s.important += 1;
        }
        if task.due_date.is_some() {
            s.planned += 1;
        }
        if task.assigned_to.is_some() {
            s.assigned += 1;
        }
        if task.completed {
            s.completed += 1;
        }
    }
    if s.today > 0 {
        s.today_progress = today_done as f64 * 100.0 / s.today as f64;
    }
    s
}

// ---------------------------------------------------------------------------
// Reminders
// ---------------------------------------------------------------------------

/// Incomplete tasks whose reminder time has arrived, earliest first
pub fn due_reminders<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    now: DateTime<Utc>,
) -> Vec<&'a Task> {
    let mut due: Vec<&Task> = tasks
        .into_iter()
        .filter(|t| !t.completed && t.reminder.is_some_and(|r| r <= now))
        .collect();
    due.sort_by_key(|t| t.reminder);
    due
}

/// Error for a malformed `HH:MM` reminder time
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time of day: {0} (expected HH:MM)")]
pub struct InvalidTime(pub String);

/// Next occurrence of the wall-clock time `hh_mm` in `now`'s timezone.
/// A time already past today rolls to tomorrow.
pub fn reminder_at<Tz: TimeZone>(now: &DateTime<Tz>, hh_mm: &str) -> Result<DateTime<Utc>, InvalidTime> {
    let time = NaiveTime::parse_from_str(hh_mm, "%H:%M").map_err(|_| InvalidTime(hh_mm.to_string()))?;
    let tz = now.timezone();
    let mut date = now.date_naive();
    for _ in 0..2 {
        if let Some(candidate) = tz.from_local_datetime(&date.and_time(time)).earliest() {
            if candidate >= *now {
                return Ok(candidate.with_timezone(&Utc));
            }
        }
        date = date.succ_opt().ok_or_else(|| InvalidTime(hh_mm.to_string()))?;
    }
    Err(InvalidTime(hh_mm.to_string()))
}
