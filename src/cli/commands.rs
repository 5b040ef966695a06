use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "doit", about = concat!("doit v", env!("CARGO_PKG_VERSION"), " - tasks, lists and a weather check for outdoor chores"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory holding the task data (overrides config and DOIT_DATA_DIR)
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<String>,

    /// Config file to use instead of $XDG_CONFIG_HOME/doit/config.toml
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in
    Login(LoginArgs),
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Add a task
    Add(AddArgs),
    /// List tasks under a tab, or grouped by status
    Ls(LsArgs),
    /// Show task details
    Show(TaskIdArg),
    /// Toggle a task between done and not done
    Done(TaskIdArg),
    /// Change task fields
    Edit(EditArgs),
    /// Delete a task
    Rm(TaskIdArg),
    /// Select a task (no ID clears the selection)
    Select(SelectArgs),
    /// Switch the active tab
    Tab(TabArgs),
    /// Toggle between list and grid view
    View,
    /// Toggle between light and dark theme
    Theme,
    /// Add or complete steps
    Step(StepCmd),
    /// Set or clear a due date
    Due(DueArgs),
    /// Set or clear a reminder
    Remind(RemindArgs),
    /// Set the repeat cadence
    Repeat(RepeatArgs),
    /// Set or clear notes
    Note(NoteArgs),
    /// Add, remove or replace tags
    Tag(TagCmd),
    /// Set priority
    Priority(PriorityArgs),
    /// Toggle the important star
    Star(TaskIdArg),
    /// Create the next occurrence of a repeating task
    Again(TaskIdArg),
    /// List management
    List(ListCmd),
    /// Show tasks whose reminder has come due
    Reminders,
    /// Show sidebar counts
    Summary,
    /// Clear dangling selection and list references
    Reconcile,
}

// ---------------------------------------------------------------------------
// Session args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct LoginArgs {
    /// Email address
    pub email: String,
    /// Password
    #[arg(long, env = "DOIT_PASSWORD", hide_env_values = true)]
    pub password: String,
}

// ---------------------------------------------------------------------------
// Task args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TaskIdArg {
    /// Task ID (a unique prefix is enough)
    pub id: String,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    pub title: String,
    /// Priority (low, medium, high)
    #[arg(long)]
    pub priority: Option<String>,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,
    /// Reminder time today or tomorrow (HH:MM)
    #[arg(long)]
    pub remind: Option<String>,
    /// Repeat cadence (none, daily, weekly, monthly, never)
    #[arg(long)]
    pub repeat: Option<String>,
    /// Notes
    #[arg(long)]
    pub note: Option<String>,
    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Assignee
    #[arg(long)]
    pub assign: Option<String>,
    /// Mark as an outdoor task (checks the weather first)
    #[arg(long)]
    pub outdoor: bool,
    /// Where to check the weather (default from config)
    #[arg(long)]
    pub location: Option<String>,
    /// Create the outdoor task even if the weather is bad or unknown
    #[arg(long)]
    pub anyway: bool,
    /// Also add the task to this list (ID or title)
    #[arg(long)]
    pub list: Option<String>,
}

#[derive(Args)]
pub struct LsArgs {
    /// Tab to list (all, today, important, assigned, planned; default: active tab)
    #[arg(long)]
    pub tab: Option<String>,
    /// Group by status (today, upcoming, completed)
    #[arg(long)]
    pub grouped: bool,
    /// Only tasks in this list (ID or title)
    #[arg(long)]
    pub list: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID
    pub id: String,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// Assignee
    #[arg(long, conflicts_with = "unassign")]
    pub assign: Option<String>,
    /// Clear the assignee
    #[arg(long)]
    pub unassign: bool,
    /// Mark as outdoor or indoor (true/false)
    #[arg(long)]
    pub outdoor: Option<bool>,
}

#[derive(Args)]
pub struct SelectArgs {
    /// Task ID
    pub id: Option<String>,
}

#[derive(Args)]
pub struct TabArgs {
    /// Tab name (all, today, important, assigned, planned)
    pub tab: String,
}

#[derive(Args)]
pub struct DueArgs {
    /// Task ID
    pub id: String,
    /// Due date (YYYY-MM-DD)
    #[arg(required_unless_present = "clear")]
    pub date: Option<String>,
    /// Clear the due date
    #[arg(long, conflicts_with = "date")]
    pub clear: bool,
}

#[derive(Args)]
pub struct RemindArgs {
    /// Task ID
    pub id: String,
    /// Time of day (HH:MM); rolls to tomorrow if already past
    #[arg(required_unless_present = "clear")]
    pub time: Option<String>,
    /// Clear the reminder
    #[arg(long, conflicts_with = "time")]
    pub clear: bool,
}

#[derive(Args)]
pub struct RepeatArgs {
    /// Task ID
    pub id: String,
    /// Cadence (none, daily, weekly, monthly, never)
    pub cadence: String,
}

#[derive(Args)]
pub struct NoteArgs {
    /// Task ID
    pub id: String,
    /// Note text
    #[arg(required_unless_present = "clear")]
    pub text: Option<String>,
    /// Clear the notes
    #[arg(long, conflicts_with = "text")]
    pub clear: bool,
}

#[derive(Args)]
pub struct PriorityArgs {
    /// Task ID
    pub id: String,
    /// Priority (low, medium, high)
    pub level: String,
}

// ---------------------------------------------------------------------------
// Steps and tags
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct StepCmd {
    #[command(subcommand)]
    pub action: StepAction,
}

#[derive(Subcommand)]
pub enum StepAction {
    /// Append a step to a task
    Add(StepAddArgs),
    /// Toggle a step's completion
    Done(StepDoneArgs),
}

#[derive(Args)]
pub struct StepAddArgs {
    /// Task ID
    pub id: String,
    /// Step title
    pub title: String,
}

#[derive(Args)]
pub struct StepDoneArgs {
    /// Task ID
    pub id: String,
    /// Step ID (a unique prefix is enough)
    pub step: String,
}

#[derive(Args)]
pub struct TagCmd {
    #[command(subcommand)]
    pub action: TagAction,
}

#[derive(Subcommand)]
pub enum TagAction {
    /// Append a tag
    Add(TagArgs),
    /// Remove every occurrence of a tag
    Rm(TagArgs),
    /// Replace all tags
    Set(TagSetArgs),
}

#[derive(Args)]
pub struct TagArgs {
    /// Task ID
    pub id: String,
    /// Tag
    pub tag: String,
}

#[derive(Args)]
pub struct TagSetArgs {
    /// Task ID
    pub id: String,
    /// Tags (none clears)
    pub tags: Vec<String>,
}

// ---------------------------------------------------------------------------
// List management
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListCmd {
    #[command(subcommand)]
    pub action: ListAction,
}

#[derive(Subcommand)]
pub enum ListAction {
    /// Create a list
    New(ListNewArgs),
    /// Rename a list
    Rename(ListRenameArgs),
    /// Delete a list (its tasks are kept)
    Rm(ListRefArg),
    /// Put a task in a list
    Add(ListTaskArgs),
    /// Take a task out of a list
    Drop(ListTaskArgs),
    /// Show the tasks in a list
    Show(ListRefArg),
    /// Show all lists
    Ls,
}

#[derive(Args)]
pub struct ListNewArgs {
    /// List title
    pub title: String,
}

#[derive(Args)]
pub struct ListRenameArgs {
    /// List ID or title
    pub list: String,
    /// New title
    pub title: String,
}

#[derive(Args)]
pub struct ListRefArg {
    /// List ID or title
    pub list: String,
}

#[derive(Args)]
pub struct ListTaskArgs {
    /// List ID or title
    pub list: String,
    /// Task ID
    pub id: String,
}
