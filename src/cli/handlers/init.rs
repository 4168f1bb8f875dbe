use std::fs;
use std::path::PathBuf;

use crate::cli::commands::InitArgs;
use crate::io::logging::init_tracing;
use crate::io::project_io::{self, CONFIG_FILE, LOG_DIR};
use crate::io::sheet_io::CsvSheetStore;
use crate::model::config::DEFAULT_TASK_SHEET;
use crate::model::revision::TaskTable;

use super::PROJECT_DIR_OVERRIDE;

const CONFIG_TEMPLATE: &str = r##"[project]
name = "{name}"

# Sheet holding the task revision log (tasklog/sheets/<id>.csv)
[sheets]
tasks = "{sheet}"

[time]
# Offset used for add_time stamps and for deciding what "today" is
utc_offset_hours = 7

[logging]
# tracing filter used when RUST_LOG is unset, e.g. "tasklog=debug"
level = "warn"

# --- Users ---
# password_sha256 is the hex SHA-256 of the password:
#   printf %s 'secret' | sha256sum
#
# [users.admin]
# role = "admin"
# password_sha256 = "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b"

# --- Permissions ---
# Feature key -> roles allowed to use it. Entries replace the built-in list
# for that feature.
#
# [permissions]
# view_all_tasks = ["admin", "manager"]
# add_new_task = ["admin"]
"##;

/// Infer a project name from a directory name: replace hyphens with spaces, title-case.
fn infer_name(dir_name: &str) -> String {
    dir_name
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    upper + chars.as_str()
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_config(name: &str) -> String {
    CONFIG_TEMPLATE
        .replace("{name}", &name.replace('"', "\\\""))
        .replace("{sheet}", DEFAULT_TASK_SHEET)
}

fn target_dir() -> std::io::Result<PathBuf> {
    let override_dir = PROJECT_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    match override_dir {
        Some(dir) => Ok(dir),
        None => std::env::current_dir(),
    }
}

pub fn cmd_init(args: InitArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("warn");
    let cwd = target_dir()?;
    let log_dir = cwd.join(LOG_DIR);

    if log_dir.join(CONFIG_FILE).is_file() && !args.force {
        return Err("task log already exists in ./tasklog/ (use --force to rewrite its config)".into());
    }

    // Check for parent project and warn
    if let Some(parent) = cwd.parent()
        && let Ok(parent_root) = project_io::discover_project(parent)
    {
        eprintln!(
            "Note: parent task log found at {}/",
            parent_root.join(LOG_DIR).display()
        );
        eprintln!("Creating new task log in ./tasklog/");
    }

    let name = args.name.unwrap_or_else(|| {
        cwd.file_name()
            .and_then(|n| n.to_str())
            .map(infer_name)
            .unwrap_or_else(|| "Untitled".to_string())
    });

    fs::create_dir_all(&log_dir)?;
    fs::write(log_dir.join(CONFIG_FILE), render_config(&name))?;

    // An existing sheet is kept as-is, even with --force
    let store = CsvSheetStore::new(log_dir.join("sheets"));
    if !store.exists(DEFAULT_TASK_SHEET) {
        store.write_table(DEFAULT_TASK_SHEET, &TaskTable::with_schema(Vec::new()))?;
    }
    tracing::info!(root = %cwd.display(), "task log initialized");

    println!("Initialized task log: {}", name);
    println!("  sheet: {}", store.sheet_path(DEFAULT_TASK_SHEET)?.display());
    Ok(())
}
