use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::model::list::TaskList;
use crate::model::state::{AppState, Tab};
use crate::model::task::{Priority, Repeat, Task};
use crate::ops::view::{Summary, TaskGroups};
use crate::weather::WeatherReport;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct CreatedJson<'a> {
    pub id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<&'a WeatherReport>,
}

#[derive(Serialize)]
pub struct GroupedJson<'a> {
    pub today: &'a [&'a Task],
    pub upcoming: &'a [&'a Task],
    pub completed: &'a [&'a Task],
}

impl<'a> GroupedJson<'a> {
    pub fn from_groups(groups: &'a TaskGroups<'a>) -> Self {
        GroupedJson {
            today: &groups.today,
            upcoming: &groups.upcoming,
            completed: &groups.completed,
        }
    }
}

#[derive(Serialize)]
pub struct ListInfoJson<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub tasks: &'a [String],
    /// References to tasks that no longer exist
    pub missing: usize,
}

pub fn list_to_json<'a>(list: &'a TaskList, state: &AppState) -> ListInfoJson<'a> {
    ListInfoJson {
        id: &list.id,
        title: &list.title,
        tasks: &list.tasks,
        missing: missing_count(list, state),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// First eight characters of an id, enough to pass back on the command line
pub fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(i, _)| &id[..i])
}

fn missing_count(list: &TaskList, state: &AppState) -> usize {
    list.tasks.iter().filter(|id| state.task(id).is_none()).count()
}

fn format_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| format!("#{}", t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format a single task as a one-line summary
pub fn format_task_line(task: &Task) -> String {
    let check = if task.completed { 'x' } else { ' ' };
    let mut line = format!("[{}] {} {}", check, short_id(&task.id), task.title);
    if task.priority == Priority::High {
        line.push_str(" !");
    }
    if let Some(due) = task.due_date {
        line.push_str(&format!(" (due {})", due));
    }
    if task.is_outdoor() {
        line.push_str(" [outdoor]");
    }
    let (done, total) = task.step_progress();
    if total > 0 {
        line.push_str(&format!(" {}/{}", done, total));
    }
    if !task.tags.is_empty() {
        line.push(' ');
        line.push_str(&format_tags(&task.tags));
    }
    line
}

/// Format detailed task view
pub fn format_task_detail(task: &Task, lists: &[&TaskList]) -> Vec<String> {
    let mut lines = Vec::new();
    let check = if task.completed { 'x' } else { ' ' };
    lines.push(format!("[{}] {}", check, task.title));
    lines.push(format!("id: {}", task.id));
    lines.push(format!("priority: {}", task.priority.as_str()));
    lines.push(format!(
        "created: {}",
        task.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    ));
    if let Some(due) = task.due_date {
        lines.push(format!("due: {}", due));
    }
    if let Some(reminder) = task.reminder {
        lines.push(format!(
            "reminder: {}",
            reminder.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ));
    }
    if task.repeat != Repeat::None {
        lines.push(format!("repeat: {}", task.repeat.as_str()));
    }
    if let Some(assignee) = &task.assigned_to {
        lines.push(format!("assigned: {}", assignee));
    }
    if task.is_outdoor() {
        lines.push("outdoor: yes".to_string());
    }
    if !task.tags.is_empty() {
        lines.push(format!("tags: {}", format_tags(&task.tags)));
    }
    if !lists.is_empty() {
        let titles: Vec<&str> = lists.iter().map(|l| l.title.as_str()).collect();
        lines.push(format!("lists: {}", titles.join(", ")));
    }
    if let Some(notes) = &task.notes {
        lines.push("notes:".to_string());
        for line in notes.lines() {
            lines.push(format!("  {}", line));
        }
    }
    if !task.steps.is_empty() {
        let (done, total) = task.step_progress();
        lines.push(String::new());
        lines.push(format!("steps ({}/{}):", done, total));
        for step in &task.steps {
            let check = if step.completed { 'x' } else { ' ' };
            lines.push(format!("  [{}] {} {}", check, short_id(&step.id), step.title));
        }
    }
    lines
}

/// Format grouped tasks with a heading per non-empty group
pub fn format_groups(groups: &TaskGroups<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    for (heading, tasks) in groups.sections() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!("== {} ==", heading));
        lines.extend(tasks.iter().map(|t| format_task_line(t)));
    }
    lines
}

/// Format a list for the lists listing
pub fn format_list_line(list: &TaskList, state: &AppState) -> String {
    let missing = missing_count(list, state);
    let present = list.tasks.len() - missing;
    let mut line = format!("{} {} ({})", short_id(&list.id), list.title, present);
    if missing > 0 {
        line.push_str(&format!(" [{} missing]", missing));
    }
    line
}

pub fn format_summary(summary: &Summary) -> Vec<String> {
    vec![
        format!(
            "today:     {} ({} pending, {:.0}% done)",
            summary.today, summary.today_pending, summary.today_progress
        ),
        format!("important: {}", summary.important),
        format!("planned:   {}", summary.planned),
        format!("assigned:  {}", summary.assigned),
        format!("completed: {}", summary.completed),
        format!("total:     {}", summary.total),
    ]
}

pub fn format_weather(report: &WeatherReport) -> String {
    let verdict = if report.is_good_time {
        "good time to be outside"
    } else {
        "not ideal for outdoor tasks"
    };
    format!(
        "weather: {:.1}°C, {} ({})",
        report.temperature, report.condition, verdict
    )
}

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

pub fn parse_priority_arg(s: &str) -> Result<Priority, String> {
    Priority::parse_priority(s)
        .ok_or_else(|| format!("unknown priority '{}' (expected: low, medium, high)", s))
}

pub fn parse_repeat_arg(s: &str) -> Result<Repeat, String> {
    Repeat::parse_repeat(s).ok_or_else(|| {
        format!(
            "unknown repeat '{}' (expected: none, daily, weekly, monthly, never)",
            s
        )
    })
}

pub fn parse_tab_arg(s: &str) -> Result<Tab, String> {
    Tab::parse_tab(s).ok_or_else(|| {
        format!(
            "unknown tab '{}' (expected: all, today, important, assigned, planned)",
            s
        )
    })
}

pub fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD)", s))
}
