use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::ops::overdue::OverdueOrder;

#[derive(Parser)]
#[command(name = "tl", about = concat!("tasklog v", env!("CARGO_PKG_VERSION"), " - the family task log"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different project directory
    #[arg(short = 'C', long = "project-dir", global = true)]
    pub project_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new task log in the current directory
    Init(InitArgs),
    /// Log in as a configured user
    Login(LoginArgs),
    /// Forget the logged-in user
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List the latest revision of every task
    List,
    /// Add a new task
    Add(AddArgs),
    /// Record a new revision of an existing task
    Edit(EditArgs),
    /// Search one column of the latest tasks
    Search(SearchArgs),
    /// Show tasks due today, soon, and later
    Deadline(DeadlineArgs),
    /// Show overdue tasks
    Overdue(OverdueArgs),
    /// Show every revision of one task, oldest first
    History(HistoryArgs),
    /// Rewrite legacy date formats in the task sheet
    Migrate(MigrateArgs),
}

// ---------------------------------------------------------------------------
// Args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Project name (default: inferred from directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// Reinitialize even if tasklog/ already exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct LoginArgs {
    /// Username
    pub username: String,
    /// Password (default: read from TASKLOG_PASSWORD)
    #[arg(long, env = "TASKLOG_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task name
    pub name: String,
    /// Assignee
    #[arg(long)]
    pub po: String,
    /// Description
    #[arg(long)]
    pub des: Option<String>,
    /// Deadline as dd/mm/yyyy
    #[arg(long)]
    pub deadline: Option<String>,
    /// Link to an external work item
    #[arg(long)]
    pub link: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Current task name
    pub name: String,
    /// New task name
    #[arg(long)]
    pub rename: Option<String>,
    /// New assignee
    #[arg(long)]
    pub po: Option<String>,
    /// New description
    #[arg(long)]
    pub des: Option<String>,
    /// New status (new, in-progress, done, paused, cancelled)
    #[arg(long)]
    pub status: Option<String>,
    /// Comment for this revision
    #[arg(long)]
    pub comment: Option<String>,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Text to look for (case-insensitive)
    pub term: String,
    /// Column to search
    #[arg(long, default_value = "task_name")]
    pub column: String,
}

#[derive(Args)]
pub struct DeadlineArgs {
    /// Only tasks assigned to these people (repeatable)
    #[arg(long)]
    pub po: Vec<String>,
}

#[derive(Args)]
pub struct OverdueArgs {
    /// Only tasks assigned to these people (repeatable)
    #[arg(long)]
    pub po: Vec<String>,
    /// Result order
    #[arg(long, value_enum, default_value_t = OverdueSort::Deadline)]
    pub sort: OverdueSort,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OverdueSort {
    /// Deadline ascending
    Deadline,
    /// Fewest days overdue first
    Least,
    /// Most days overdue first
    Most,
}

impl From<OverdueSort> for OverdueOrder {
    fn from(sort: OverdueSort) -> Self {
        match sort {
            OverdueSort::Deadline => OverdueOrder::ByDeadline,
            OverdueSort::Least => OverdueOrder::LeastOverdue,
            OverdueSort::Most => OverdueOrder::MostOverdue,
        }
    }
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Task name
    pub name: String,
}

#[derive(Args)]
pub struct MigrateArgs {
    /// Report what would change without writing
    #[arg(long)]
    pub dry_run: bool,
}
