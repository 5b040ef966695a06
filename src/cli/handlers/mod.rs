use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, Utc};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::storage::FileStorage;
use crate::model::auth::{AuthPhase, AuthState, User};
use crate::model::config::Config;
use crate::model::list::TaskList;
use crate::model::task::{Task, TaskDraft, TaskPatch};
use crate::ops::auth_ops::{self, StaticCredentials};
use crate::ops::create::{self, CreateError, CreationFlow, NewTask};
use crate::ops::{Outcome, view};
use crate::store::{Action, Store};
use crate::weather::{OpenWeatherClient, UnavailableGate};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Everything a command needs: resolved config, the opened store, output mode
struct Session {
    config: Config,
    store: Store,
    /// Restored from the persisted session when there is one
    auth: AuthState,
    json: bool,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let config = config_io::load_config(cli.config.as_deref().map(Path::new))?;
    let data_dir = cli
        .data_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| config_io::data_dir(&config));
    tracing::debug!(data_dir = %data_dir.display(), "opening store");
    let store = Store::open(Box::new(FileStorage::new(data_dir)), config.store.clone());
    let auth = store
        .session()
        .map(AuthState::signed_in)
        .unwrap_or_default();
    let mut s = Session {
        config,
        store,
        auth,
        json: cli.json,
    };

    match cli.command {
        // Session commands work signed out
        Commands::Login(args) => return cmd_login(&mut s, args),
        Commands::Logout => return cmd_logout(&mut s),
        Commands::Whoami => return cmd_whoami(&s),
        _ => {}
    }

    require_session(&s.auth)?;

    match cli.command {
        Commands::Login(_) | Commands::Logout | Commands::Whoami => Ok(()),

        // Read commands
        Commands::Ls(args) => cmd_ls(&s, args),
        Commands::Show(args) => cmd_show(&s, args),
        Commands::Reminders => cmd_reminders(&s),
        Commands::Summary => cmd_summary(&s),

        // Task commands
        Commands::Add(args) => cmd_add(&mut s, args),
        Commands::Done(args) => cmd_done(&mut s, args),
        Commands::Edit(args) => cmd_edit(&mut s, args),
        Commands::Rm(args) => cmd_rm(&mut s, args),
        Commands::Step(args) => cmd_step(&mut s, args),
        Commands::Due(args) => cmd_due(&mut s, args),
        Commands::Remind(args) => cmd_remind(&mut s, args),
        Commands::Repeat(args) => cmd_repeat(&mut s, args),
        Commands::Note(args) => cmd_note(&mut s, args),
        Commands::Tag(args) => cmd_tag(&mut s, args),
        Commands::Priority(args) => cmd_priority(&mut s, args),
        Commands::Star(args) => cmd_star(&mut s, args),
        Commands::Again(args) => cmd_again(&mut s, args),

        // UI preferences
        Commands::Select(args) => cmd_select(&mut s, args),
        Commands::Tab(args) => cmd_tab(&mut s, args),
        Commands::View => cmd_view(&mut s),
        Commands::Theme => cmd_theme(&mut s),

        // Lists and maintenance
        Commands::List(args) => cmd_list(&mut s, args),
        Commands::Reconcile => cmd_reconcile(&mut s),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require_session(auth: &AuthState) -> Result<&User, Box<dyn std::error::Error>> {
    match (auth.phase(), &auth.user) {
        (AuthPhase::Authenticated, Some(user)) => Ok(user),
        _ => Err("not signed in (run `doit login <email>`)".into()),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Resolve a task ID or unique ID prefix. Unknown input is passed through so
/// the store can report it.
fn resolve_task(store: &Store, input: &str) -> Result<String, Box<dyn std::error::Error>> {
    let state = store.state();
    if state.task(input).is_some() {
        return Ok(input.to_string());
    }
    let matches: Vec<&String> = state.tasks.keys().filter(|id| id.starts_with(input)).collect();
    match matches.as_slice() {
        [id] => Ok((*id).clone()),
        [] => Ok(input.to_string()),
        _ => Err(format!("ambiguous task ID '{}' ({} matches)", input, matches.len()).into()),
    }
}

/// Resolve a list by exact ID, ID prefix, or case-insensitive title
fn resolve_list(store: &Store, input: &str) -> Result<String, Box<dyn std::error::Error>> {
    let lists = &store.state().lists;
    if let Some(list) = lists.iter().find(|l| l.id == input) {
        return Ok(list.id.clone());
    }
    let matches: Vec<&TaskList> = lists
        .iter()
        .filter(|l| l.title_matches(input) || l.id.starts_with(input))
        .collect();
    match matches.as_slice() {
        [list] => Ok(list.id.clone()),
        [] => Err(format!("list not found: {}", input).into()),
        _ => Err(format!("ambiguous list '{}' ({} matches)", input, matches.len()).into()),
    }
}

fn resolve_step(task: &Task, input: &str) -> Result<String, Box<dyn std::error::Error>> {
    if task.steps.iter().any(|s| s.id == input) {
        return Ok(input.to_string());
    }
    let matches: Vec<&str> = task
        .steps
        .iter()
        .filter(|s| s.id.starts_with(input))
        .map(|s| s.id.as_str())
        .collect();
    match matches.as_slice() {
        [id] => Ok(id.to_string()),
        [] => Ok(input.to_string()),
        _ => Err(format!("ambiguous step ID '{}' ({} matches)", input, matches.len()).into()),
    }
}

/// Dispatch and turn a missing target into a command error
fn apply(s: &mut Session, action: Action) -> Result<Outcome, Box<dyn std::error::Error>> {
    let outcome = s.store.dispatch(action)?;
    if let Outcome::NotFound(target) = &outcome {
        return Err(format!("{} not found", target).into());
    }
    Ok(outcome)
}

/// Print the task after a change, or note that nothing changed
fn report_task(s: &Session, id: &str, outcome: &Outcome) -> CmdResult {
    let Some(task) = s.store.state().task(id) else {
        return Ok(());
    };
    if s.json {
        println!("{}", serde_json::to_string_pretty(task)?);
    } else {
        println!("{}", format_task_line(task));
        if *outcome == Outcome::Unchanged {
            println!("(no change)");
        }
    }
    Ok(())
}

fn print_tasks(tasks: &[&Task], json: bool) -> CmdResult {
    if json {
        println!("{}", serde_json::to_string_pretty(tasks)?);
    } else {
        for task in tasks {
            println!("{}", format_task_line(task));
        }
    }
    Ok(())
}

fn print_user(user: &User, json: bool) -> CmdResult {
    if json {
        println!("{}", serde_json::to_string_pretty(user)?);
    } else {
        println!("{} <{}>", user.name, user.email);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Session commands
// ---------------------------------------------------------------------------

fn cmd_login(s: &mut Session, args: LoginArgs) -> CmdResult {
    let validator = StaticCredentials::from_config(&s.config.auth);
    let user = auth_ops::login(&mut s.auth, &validator, &args.email, &args.password)?;
    s.store.save_session(&user)?;
    print_user(&user, s.json)
}

fn cmd_logout(s: &mut Session) -> CmdResult {
    s.store.clear_session()?;
    auth_ops::logout(&mut s.auth);
    if !s.json {
        println!("signed out");
    }
    Ok(())
}

fn cmd_whoami(s: &Session) -> CmdResult {
    let user = require_session(&s.auth)?;
    print_user(user, s.json)
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_ls(s: &Session, args: LsArgs) -> CmdResult {
    let state = s.store.state();
    let tab = match args.tab.as_deref() {
        Some(name) => parse_tab_arg(name)?,
        None => state.active_tab,
    };

    let mut tasks = view::filter_by_tab(state.tasks.values(), tab, today());
    if let Some(list) = &args.list {
        let list_id = resolve_list(&s.store, list)?;
        if let Some(list) = state.list(&list_id) {
            tasks.retain(|t| list.contains(&t.id));
        }
    }

    if args.grouped {
        let groups = view::group_by_status(&tasks, today());
        if s.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&GroupedJson::from_groups(&groups))?
            );
        } else if groups.is_empty() {
            println!("no tasks");
        } else {
            for line in format_groups(&groups) {
                println!("{}", line);
            }
        }
        return Ok(());
    }
    print_tasks(&tasks, s.json)
}

fn cmd_show(s: &Session, args: TaskIdArg) -> CmdResult {
    let id = resolve_task(&s.store, &args.id)?;
    let state = s.store.state();
    let task = state
        .task(&id)
        .ok_or_else(|| format!("task not found: {}", args.id))?;

    if s.json {
        println!("{}", serde_json::to_string_pretty(task)?);
    } else {
        let lists: Vec<&TaskList> = state.lists.iter().filter(|l| l.contains(&id)).collect();
        for line in format_task_detail(task, &lists) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_reminders(s: &Session) -> CmdResult {
    let due = view::due_reminders(s.store.state().tasks.values(), Utc::now());
    print_tasks(&due, s.json)
}

fn cmd_summary(s: &Session) -> CmdResult {
    let summary = view::summary(s.store.state().tasks.values(), today());
    if s.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for line in format_summary(&summary) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Task commands
// ---------------------------------------------------------------------------

fn cmd_add(s: &mut Session, args: AddArgs) -> CmdResult {
    let list_id = args
        .list
        .as_deref()
        .map(|l| resolve_list(&s.store, l))
        .transpose()?;

    let mut draft = TaskDraft::titled(args.title);
    if let Some(p) = &args.priority {
        draft.priority = parse_priority_arg(p)?;
    }
    if let Some(d) = &args.due {
        draft.due_date = Some(parse_date_arg(d)?);
    }
    if let Some(t) = &args.remind {
        draft.reminder = Some(view::reminder_at(&Local::now(), t)?);
    }
    if let Some(r) = &args.repeat {
        draft.repeat = parse_repeat_arg(r)?;
    }
    draft.notes = args.note;
    draft.tags = args.tags;
    draft.assigned_to = args.assign;
    if args.outdoor {
        draft.is_outdoor = Some(true);
    }

    let request = NewTask {
        draft,
        location: args
            .location
            .unwrap_or_else(|| s.config.weather.location.clone()),
        create_anyway: args.anyway,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let mut flow = CreationFlow::new();
    let result = match OpenWeatherClient::from_config(&s.config.weather) {
        Ok(client) => runtime.block_on(create::submit(&mut s.store, &mut flow, &client, request)),
        Err(e) => runtime.block_on(create::submit(
            &mut s.store,
            &mut flow,
            &UnavailableGate(e),
            request,
        )),
    };
    let created = match result {
        Ok(created) => created,
        Err(e @ (CreateError::Unsuitable(_) | CreateError::Unconfirmed(_))) => {
            return Err(format!("{} (pass --anyway to create it regardless)", e).into());
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(list_id) = list_id {
        let _ = apply(
            s,
            Action::AddTaskToList {
                list_id,
                task_id: created.id.clone(),
            },
        )?;
    }

    if s.json {
        let out = CreatedJson {
            id: &created.id,
            weather: created.weather.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        if let Some(report) = &created.weather {
            println!("{}", format_weather(report));
        }
        println!("{}", created.id);
    }
    Ok(())
}

fn cmd_done(s: &mut Session, args: TaskIdArg) -> CmdResult {
    let id = resolve_task(&s.store, &args.id)?;
    let outcome = apply(s, Action::ToggleTask(id.clone()))?;
    report_task(s, &id, &outcome)
}

fn cmd_edit(s: &mut Session, args: EditArgs) -> CmdResult {
    let id = resolve_task(&s.store, &args.id)?;
    let mut patch = TaskPatch::default();
    if let Some(title) = args.title {
        patch.title = Some(create::validate_title(&title)?);
    }
    if let Some(assignee) = args.assign {
        patch.assigned_to = Some(Some(assignee));
    } else if args.unassign {
        patch.assigned_to = Some(None);
    }
    if let Some(outdoor) = args.outdoor {
        patch.is_outdoor = Some(Some(outdoor));
    }
    if patch.is_empty() {
        return Err("nothing to change (try --title, --assign, --unassign, --outdoor)".into());
    }
    let outcome = apply(s, Action::UpdateTask { id: id.clone(), patch })?;
    report_task(s, &id, &outcome)
}

fn cmd_rm(s: &mut Session, args: TaskIdArg) -> CmdResult {
    let id = resolve_task(&s.store, &args.id)?;
    let _ = apply(s, Action::DeleteTask(id.clone()))?;
    if !s.json {
        println!("deleted {}", short_id(&id));
    }
    Ok(())
}

fn cmd_step(s: &mut Session, args: StepCmd) -> CmdResult {
    match args.action {
        StepAction::Add(a) => {
            let id = resolve_task(&s.store, &a.id)?;
            let title = create::validate_title(&a.title)?;
            let (outcome, step_id) = s.store.add_step(&id, title)?;
            if let Outcome::NotFound(target) = outcome {
                return Err(format!("{} not found", target).into());
            }
            if s.json {
                println!("{}", serde_json::json!({ "id": step_id }));
            } else {
                println!("{}", step_id);
            }
            Ok(())
        }
        StepAction::Done(a) => {
            let id = resolve_task(&s.store, &a.id)?;
            let task = s
                .store
                .state()
                .task(&id)
                .ok_or_else(|| format!("task not found: {}", a.id))?;
            let step_id = resolve_step(task, &a.step)?;
            let outcome = apply(
                s,
                Action::ToggleTaskStep {
                    task_id: id.clone(),
                    step_id,
                },
            )?;
            report_task(s, &id, &outcome)
        }
    }
}

fn cmd_due(s: &mut Session, args: DueArgs) -> CmdResult {
    let id = resolve_task(&s.store, &args.id)?;
    let due_date = match args.date.as_deref() {
        Some(d) if !args.clear => Some(parse_date_arg(d)?),
        _ => None,
    };
    let outcome = apply(s, Action::SetTaskDueDate { id: id.clone(), due_date })?;
    report_task(s, &id, &outcome)
}

fn cmd_remind(s: &mut Session, args: RemindArgs) -> CmdResult {
    let id = resolve_task(&s.store, &args.id)?;
    let reminder = match args.time.as_deref() {
        Some(t) if !args.clear => Some(view::reminder_at(&Local::now(), t)?),
        _ => None,
    };
    let outcome = apply(s, Action::SetTaskReminder { id: id.clone(), reminder })?;
    if !s.json {
        if let Some(at) = reminder {
            println!("reminder at {}", at.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
        }
    }
    report_task(s, &id, &outcome)
}

fn cmd_repeat(s: &mut Session, args: RepeatArgs) -> CmdResult {
    let id = resolve_task(&s.store, &args.id)?;
    let repeat = parse_repeat_arg(&args.cadence)?;
    let outcome = apply(s, Action::SetTaskRepeat { id: id.clone(), repeat })?;
    report_task(s, &id, &outcome)
}

fn cmd_note(s: &mut Session, args: NoteArgs) -> CmdResult {
    let id = resolve_task(&s.store, &args.id)?;
    let notes = if args.clear { None } else { args.text };
    let outcome = apply(s, Action::UpdateTaskNotes { id: id.clone(), notes })?;
    report_task(s, &id, &outcome)
}

fn cmd_tag(s: &mut Session, args: TagCmd) -> CmdResult {
    let (id, action) = match args.action {
        TagAction::Add(a) => {
            let id = resolve_task(&s.store, &a.id)?;
            let action = Action::AddTaskTag { id: id.clone(), tag: a.tag };
            (id, action)
        }
        TagAction::Rm(a) => {
            let id = resolve_task(&s.store, &a.id)?;
            let action = Action::RemoveTaskTag { id: id.clone(), tag: a.tag };
            (id, action)
        }
        TagAction::Set(a) => {
            let id = resolve_task(&s.store, &a.id)?;
            let action = Action::UpdateTaskTags { id: id.clone(), tags: a.tags };
            (id, action)
        }
    };
    let outcome = apply(s, action)?;
    report_task(s, &id, &outcome)
}

fn cmd_priority(s: &mut Session, args: PriorityArgs) -> CmdResult {
    let id = resolve_task(&s.store, &args.id)?;
    let priority = parse_priority_arg(&args.level)?;
    let outcome = apply(s, Action::UpdateTaskPriority { id: id.clone(), priority })?;
    report_task(s, &id, &outcome)
}

fn cmd_star(s: &mut Session, args: TaskIdArg) -> CmdResult {
    let id = resolve_task(&s.store, &args.id)?;
    let outcome = apply(s, Action::ToggleImportant(id.clone()))?;
    report_task(s, &id, &outcome)
}

fn cmd_again(s: &mut Session, args: TaskIdArg) -> CmdResult {
    let id = resolve_task(&s.store, &args.id)?;
    match apply(s, Action::CreateRepeatedTask(id))? {
        Outcome::Created(new_id) => {
            let outcome = Outcome::Created(new_id.clone());
            report_task(s, &new_id, &outcome)
        }
        _ => Err("task does not repeat (repeat is 'never')".into()),
    }
}

// ---------------------------------------------------------------------------
// UI preferences
// ---------------------------------------------------------------------------

fn print_ui(s: &Session, label: &str, value: &str) -> CmdResult {
    if s.json {
        println!("{}", serde_json::to_string_pretty(&s.store.state().ui_prefs())?);
    } else {
        println!("{}: {}", label, value);
    }
    Ok(())
}

fn cmd_select(s: &mut Session, args: SelectArgs) -> CmdResult {
    let id = args
        .id
        .as_deref()
        .map(|id| resolve_task(&s.store, id))
        .transpose()?;
    let _ = s.store.dispatch(Action::SelectTask(id))?;
    let label = match s.store.state().selected() {
        Some(task) => format_task_line(task),
        None => "none".to_string(),
    };
    print_ui(s, "selected", &label)
}

fn cmd_tab(s: &mut Session, args: TabArgs) -> CmdResult {
    let tab = parse_tab_arg(&args.tab)?;
    let _ = s.store.dispatch(Action::SetActiveTab(tab))?;
    print_ui(s, "tab", tab.as_str())
}

fn cmd_view(s: &mut Session) -> CmdResult {
    let _ = s.store.dispatch(Action::ToggleView)?;
    let view = s.store.state().view.as_str();
    print_ui(s, "view", view)
}

fn cmd_theme(s: &mut Session) -> CmdResult {
    let _ = s.store.dispatch(Action::ToggleTheme)?;
    let theme = s.store.state().theme.as_str();
    print_ui(s, "theme", theme)
}

// ---------------------------------------------------------------------------
// Lists
// ---------------------------------------------------------------------------

fn cmd_list(s: &mut Session, args: ListCmd) -> CmdResult {
    match args.action {
        ListAction::New(a) => {
            let outcome = apply(s, Action::CreateList(a.title))?;
            let id = outcome.created_id().unwrap_or_default();
            if s.json {
                println!("{}", serde_json::json!({ "id": id }));
            } else {
                println!("{}", id);
            }
            Ok(())
        }
        ListAction::Rename(a) => {
            let id = resolve_list(&s.store, &a.list)?;
            let _ = apply(
                s,
                Action::RenameList {
                    id: id.clone(),
                    title: a.title,
                },
            )?;
            print_list(s, &id)
        }
        ListAction::Rm(a) => {
            let id = resolve_list(&s.store, &a.list)?;
            let _ = apply(s, Action::DeleteList(id.clone()))?;
            if !s.json {
                println!("deleted list {}", short_id(&id));
            }
            Ok(())
        }
        ListAction::Add(a) => {
            let list_id = resolve_list(&s.store, &a.list)?;
            let task_id = resolve_task(&s.store, &a.id)?;
            if s.store.state().task(&task_id).is_none() {
                return Err(format!("task not found: {}", a.id).into());
            }
            let _ = apply(s, Action::AddTaskToList { list_id: list_id.clone(), task_id })?;
            print_list(s, &list_id)
        }
        ListAction::Drop(a) => {
            let list_id = resolve_list(&s.store, &a.list)?;
            let task_id = resolve_task(&s.store, &a.id)?;
            let _ = apply(s, Action::RemoveTaskFromList { list_id: list_id.clone(), task_id })?;
            print_list(s, &list_id)
        }
        ListAction::Show(a) => {
            let id = resolve_list(&s.store, &a.list)?;
            let state = s.store.state();
            let Some(list) = state.list(&id) else {
                return Err(format!("list not found: {}", a.list).into());
            };
            let tasks: Vec<&Task> = list.tasks.iter().filter_map(|t| state.task(t)).collect();
            if !s.json {
                println!("== {} ==", list.title);
            }
            print_tasks(&tasks, s.json)
        }
        ListAction::Ls => {
            let state = s.store.state();
            if s.json {
                let lists: Vec<_> = state.lists.iter().map(|l| list_to_json(l, state)).collect();
                println!("{}", serde_json::to_string_pretty(&lists)?);
            } else {
                for list in &state.lists {
                    println!("{}", format_list_line(list, state));
                }
            }
            Ok(())
        }
    }
}

fn print_list(s: &Session, id: &str) -> CmdResult {
    let state = s.store.state();
    let Some(list) = state.list(id) else {
        return Ok(());
    };
    if s.json {
        println!("{}", serde_json::to_string_pretty(&list_to_json(list, state))?);
    } else {
        println!("{}", format_list_line(list, state));
    }
    Ok(())
}

fn cmd_reconcile(s: &mut Session) -> CmdResult {
    let report = s.store.reconcile();
    if s.json {
        let dropped: Vec<_> = report
            .dropped_references
            .iter()
            .map(|(list, task)| serde_json::json!({ "list": list, "task": task }))
            .collect();
        println!(
            "{}",
            serde_json::json!({
                "selectionCleared": report.selection_cleared,
                "droppedReferences": dropped,
            })
        );
    } else if report.is_clean() {
        println!("nothing to reconcile");
    } else {
        if report.selection_cleared {
            println!("cleared dangling selection");
        }
        for (list, task) in &report.dropped_references {
            println!("dropped {} from list {}", short_id(task), short_id(list));
        }
    }
    Ok(())
}
