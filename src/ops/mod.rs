pub mod auth_ops;
pub mod create;
pub mod list_ops;
pub mod repeat;
pub mod task_ops;
pub mod view;

use std::fmt;

/// What a transition operated on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Task(String),
    Step { task_id: String, step_id: String },
    List(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Task(id) => write!(f, "task {}", id),
            Target::Step { task_id, step_id } => write!(f, "step {} of task {}", step_id, task_id),
            Target::List(id) => write!(f, "list {}", id),
        }
    }
}

/// Result of a state transition.
///
/// `Unchanged` means the target exists and already matched;
/// `NotFound` means there was nothing to operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Outcome {
    Applied,
    /// A new task or list was appended with this id
    Created(String),
    Unchanged,
    NotFound(Target),
}

impl Outcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, Outcome::Applied | Outcome::Created(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Outcome::NotFound(_))
    }

    pub fn created_id(&self) -> Option<&str> {
        match self {
            Outcome::Created(id) => Some(id),
            _ => None,
        }
    }

    pub(crate) fn from_change(changed: bool) -> Outcome {
        if changed {
            Outcome::Applied
        } else {
            Outcome::Unchanged
        }
    }
}

/// Input rejected before any state change
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("task title cannot be empty")]
    EmptyTitle,
    #[error("list name cannot be empty")]
    EmptyListTitle,
    #[error("a list named \"{0}\" already exists")]
    DuplicateList(String),
}
