mod init;
pub use init::cmd_init;

use std::path::PathBuf;
use std::sync::Mutex;

/// Global override for project directory (set by -C flag)
static PROJECT_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::logging::init_tracing;
use crate::io::project_io::{self, ProjectError};
use crate::io::session::{clear_session, read_session, write_session};
use crate::io::sheet_io::{CsvSheetStore, RowSink, RowSource};
use crate::model::project::Project;
use crate::model::revision::TaskTable;
use crate::ops::access::{self, Permissions, Session};
use crate::ops::deadline::classify_deadlines;
use crate::ops::migrate::migrate_formats;
use crate::ops::overdue::{OverdueOrder, OverdueView};
use crate::ops::reconcile::{backfill_missing_fields, reconcile_latest, task_history};
use crate::ops::revise::{self, NewTask, TaskEdit};
use crate::ops::search;
use crate::util::time::{SystemClock, format_deadline, today};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;

    // Store -C override for load_project_cwd()
    if let Some(ref dir) = cli.project_dir {
        let abs = std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?;
        PROJECT_DIR_OVERRIDE
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(abs);
    }

    match cli.command {
        Commands::Init(args) => cmd_init(args),

        // Session
        Commands::Login(args) => cmd_login(args, json),
        Commands::Logout => cmd_logout(),
        Commands::Whoami => cmd_whoami(json),

        // Read commands
        Commands::List => cmd_list(json),
        Commands::Search(args) => cmd_search(args, json),
        Commands::Deadline(args) => cmd_deadline(args, json),
        Commands::Overdue(args) => cmd_overdue(args, json),
        Commands::History(args) => cmd_history(args, json),

        // Write commands
        Commands::Add(args) => cmd_add(args),
        Commands::Edit(args) => cmd_edit(args),

        // Maintenance
        Commands::Migrate(args) => cmd_migrate(args),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_project_cwd() -> Result<Project, ProjectError> {
    let override_dir = PROJECT_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    let start = match override_dir {
        Some(dir) => dir,
        None => std::env::current_dir().map_err(ProjectError::IoError)?,
    };
    let root = project_io::discover_project(&start)?;
    let project = project_io::load_project(&root)?;
    init_tracing(&project.config.logging.level);
    Ok(project)
}

/// A loaded project with its sheet store.
struct TaskLog {
    project: Project,
    store: CsvSheetStore,
}

impl TaskLog {
    fn open() -> Result<Self, ProjectError> {
        let project = load_project_cwd()?;
        let store = CsvSheetStore::new(project.sheets_dir());
        Ok(TaskLog { project, store })
    }

    fn sheet(&self) -> &str {
        self.project.config.task_sheet()
    }

    /// Session of the logged-in user, if their role may use `feature`.
    fn require(&self, feature: &str) -> Result<Session, access::AuthError> {
        let session = read_session(&self.project.log_dir);
        Permissions::from_config(&self.project.config)
            .require(feature, session.as_ref())
            .cloned()
    }

    fn raw(&self) -> Result<TaskTable, Box<dyn std::error::Error>> {
        Ok(self.store.fetch(self.sheet())?)
    }

    /// Latest revision of every task, gaps filled from earlier revisions
    fn latest(&self) -> Result<TaskTable, Box<dyn std::error::Error>> {
        Ok(reconcile_latest(&backfill_missing_fields(&self.raw()?)))
    }

    fn clock(&self) -> SystemClock {
        SystemClock::with_offset_hours(self.project.config.time.utc_offset_hours)
    }

    fn append(&self, record: &revise::FieldMap) -> CmdResult {
        if self.store.append_record(self.sheet(), record) {
            Ok(())
        } else {
            Err(format!("could not write to sheet '{}'", self.sheet()).into())
        }
    }
}

/// Narrow to the requested assignees, warning about names nobody uses.
fn for_assignees(latest: &TaskTable, assignees: &[String]) -> TaskTable {
    let known = search::distinct_assignees(latest);
    for name in assignees.iter().filter(|a| !known.contains(a)) {
        eprintln!(
            "warning: no tasks assigned to '{}' (assignees: {})",
            name,
            known.join(", ")
        );
    }
    search::filter_by_assignees(latest, assignees)
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_table(table: &TaskTable, json: bool) -> CmdResult {
    if json {
        let tasks: Vec<TaskJson> = table.rows.iter().map(task_to_json).collect();
        return print_json(&tasks);
    }
    for row in &table.rows {
        println!("{}", format_task_line(row));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Session commands
// ---------------------------------------------------------------------------

fn cmd_login(args: LoginArgs, json: bool) -> CmdResult {
    let project = load_project_cwd()?;
    let session = access::authenticate(&project.config.users, &args.username, &args.password)?;
    write_session(&project.log_dir, &session)?;
    tracing::info!(user = %session.username, role = %session.role, "logged in");
    if json {
        return print_json(&session);
    }
    println!("logged in as {} ({})", session.username, session.role);
    Ok(())
}

fn cmd_logout() -> CmdResult {
    let project = load_project_cwd()?;
    if clear_session(&project.log_dir)? {
        println!("logged out");
    } else {
        println!("not logged in");
    }
    Ok(())
}

fn cmd_whoami(json: bool) -> CmdResult {
    let project = load_project_cwd()?;
    let session = read_session(&project.log_dir).ok_or(access::AuthError::NotLoggedIn)?;
    if json {
        return print_json(&session);
    }
    println!("{} ({})", session.username, session.role);
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(json: bool) -> CmdResult {
    let log = TaskLog::open()?;
    log.require(access::VIEW_ALL_TASKS)?;
    let latest = log.latest()?;
    if latest.is_empty() && !json {
        println!("no tasks");
        return Ok(());
    }
    print_table(&latest, json)
}

fn cmd_search(args: SearchArgs, json: bool) -> CmdResult {
    let log = TaskLog::open()?;
    log.require(access::SEARCH_TASK)?;
    if args.term.trim().is_empty() {
        eprintln!("warning: enter a search term");
        return if json { print_json(&Vec::<TaskJson>::new()) } else { Ok(()) };
    }
    let latest = log.latest()?;
    if !latest.is_empty() && !latest.has_column(&args.column) {
        eprintln!(
            "warning: no column '{}' (try one of: {})",
            args.column,
            search::SEARCH_COLUMNS.join(", ")
        );
    }
    let hits = search::search(&latest, &args.term, &args.column);
    print_table(&hits, json)
}

fn cmd_deadline(args: DeadlineArgs, json: bool) -> CmdResult {
    let log = TaskLog::open()?;
    log.require(access::PROCESS_DEADLINE_TASKS)?;
    let latest = for_assignees(&log.latest()?, &args.po);
    let today = today(&log.clock());
    let buckets = classify_deadlines(&latest, today);

    if json {
        return print_json(&deadline_to_json(&buckets, &format_deadline(today)));
    }
    let sections = [
        ("Due today", &buckets.due_today),
        ("Due in the next 2 days", &buckets.due_soon),
        ("Due later", &buckets.due_later),
    ];
    for (i, (title, tasks)) in sections.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", format_section(title, tasks.len()));
        for task in tasks.iter() {
            println!("{}", format_task_line(&task.revision));
        }
    }
    Ok(())
}

fn cmd_overdue(args: OverdueArgs, json: bool) -> CmdResult {
    let log = TaskLog::open()?;
    log.require(access::GET_OVERDUE_TASKS)?;
    let latest = for_assignees(&log.latest()?, &args.po);
    let today = today(&log.clock());

    let order = OverdueOrder::from(args.sort);
    let mut view = OverdueView::new();
    view.reclassify(&latest, today);
    view.resort(order);

    if json {
        return print_json(&overdue_to_json(view.tasks(), order, &format_deadline(today)));
    }
    if view.is_empty() {
        println!("no overdue tasks");
        return Ok(());
    }
    println!("{}", format_section("Overdue", view.tasks().len()));
    for task in view.tasks() {
        println!("{}", format_overdue_line(task));
    }
    Ok(())
}

fn cmd_history(args: HistoryArgs, json: bool) -> CmdResult {
    let log = TaskLog::open()?;
    log.require(access::VIEW_ALL_TASKS)?;
    let revisions = task_history(&log.raw()?, &args.name);
    if revisions.is_empty() {
        return Err(format!("task not found: {}", args.name).into());
    }
    if json {
        let out: Vec<TaskJson> = revisions.iter().map(task_to_json).collect();
        return print_json(&out);
    }
    for (i, rev) in revisions.iter().enumerate() {
        if i > 0 {
            println!();
        }
        for line in format_task_detail(rev) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(args: AddArgs) -> CmdResult {
    let log = TaskLog::open()?;
    let session = log.require(access::ADD_NEW_TASK)?;

    if let Some(existing) = log.latest()?.rows.iter().find(|r| r.name() == Some(args.name.trim())) {
        // the log keys tasks by name, so this becomes a revision of the old task
        tracing::warn!(task = ?existing.name(), "a task with this name already exists");
        eprintln!("warning: '{}' already exists; adding a new revision", args.name.trim());
    }

    let task = NewTask {
        name: args.name,
        assignee: args.po,
        description: args.des,
        deadline: args.deadline,
        link: args.link,
    };
    let record = revise::new_task_record(&task, &session.username, &log.clock())?;
    log.append(&record)?;

    let id = record.get("task_id").map(|s| s.as_str()).unwrap_or_default();
    println!("{}", id);
    Ok(())
}

fn cmd_edit(args: EditArgs) -> CmdResult {
    let log = TaskLog::open()?;
    log.require(access::EDIT_OWN_TASK)?;

    let latest = log.latest()?;
    let current = latest
        .rows
        .iter()
        .find(|r| r.name() == Some(args.name.trim()))
        .ok_or_else(|| format!("task not found: {}", args.name))?;

    let status = args
        .status
        .as_deref()
        .map(revise::parse_status_arg)
        .transpose()?;
    let edit = TaskEdit {
        rename: args.rename,
        assignee: args.po,
        description: args.des,
        status,
        comment: args.comment,
    };
    let record = revise::edit_task_record(current, &edit, &log.clock())?;
    log.append(&record)?;

    let name = record.get("task_name").map(|s| s.as_str()).unwrap_or_default();
    println!("updated {}", name);
    Ok(())
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

fn cmd_migrate(args: MigrateArgs) -> CmdResult {
    let log = TaskLog::open()?;
    log.require(access::ACCESS_ADMIN_DASHBOARD)?;

    let report = if args.dry_run {
        migrate_formats(&log.raw()?).1
    } else {
        log.store.rewrite(log.sheet(), migrate_formats)?
    };
    for line in format_migration(&report, args.dry_run) {
        println!("{}", line);
    }
    if !args.dry_run && report.changed() > 0 {
        tracing::info!(changed = report.changed(), "sheet migrated");
    }
    Ok(())
}
