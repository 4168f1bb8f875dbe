//! Integration tests for the `tl` CLI.
//!
//! Each test creates a temp project directory, runs `tl` as a subprocess,
//! and verifies stdout and/or file contents.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{Days, FixedOffset, NaiveDate, Utc};
use tasklog::ops::access::hash_password;

/// Get the path to the built `tl` binary.
fn tl_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("tl");
    path
}

/// Today in the project's timezone (UTC+7)
fn today() -> NaiveDate {
    let offset = FixedOffset::east_opt(7 * 3600).unwrap();
    Utc::now().with_timezone(&offset).date_naive()
}

/// Deadline `days` from today, as dd/mm/yyyy
fn due(days: i64) -> String {
    let date = if days >= 0 {
        today() + Days::new(days as u64)
    } else {
        today() - Days::new(days.unsigned_abs())
    };
    date.format("%d/%m/%Y").to_string()
}

const HEADER: &str = "task_name,add_time,task_deadline,task_link,task_id,task_des,task_report_to,task_po,task_status,task_comment";

/// Create a test project with three users and a small revision log.
fn create_test_project(root: &Path) {
    let log_dir = root.join("tasklog");
    fs::create_dir_all(log_dir.join("sheets")).unwrap();

    fs::write(
        log_dir.join("tasklog.toml"),
        format!(
            r#"[project]
name = "test-family"

[users.admin]
role = "admin"
password_sha256 = "{admin}"

[users.lan]
role = "employee"
password_sha256 = "{lan}"

[users.minh]
role = "manager"
password_sha256 = "{minh}"
"#,
            admin = hash_password("secret"),
            lan = hash_password("pw-lan"),
            minh = hash_password("pw-minh"),
        ),
    )
    .unwrap();

    let rows = [
        format!("Mop floor,01/01/2024 10:00:00,{},https://tracker.example.com/browse/HOME-1,T1,Kitchen and HALL,admin,Lan,Mới tạo,", due(-3)),
        "Mop floor,02/01/2024 10:00:00,,,T2,,,,Đang làm,started".to_string(),
        format!("Pay bills,01/01/2024 09:00:00,{},,T3,Electricity,admin,Minh,Mới tạo,", due(0)),
        format!("Water plants,03/01/2024 08:00:00,{},,T4,Balcony,admin,Lan,Tạm dừng,", due(1)),
        format!("Fix roof,03/01/2024 08:00:00,{},,T5,Leak over garage,admin,Minh,Mới tạo,", due(10)),
        format!("Old chore,01/01/2024 08:00:00,{},,T6,,admin,Minh,Hoàn thành,", due(-1)),
        format!("Buy milk,04/01/2024 08:00:00,{},,T7,Two litres,admin,Minh,Mới tạo,", due(-1)),
        "Legacy row,2024-01-05 07:30:00,2024-02-01,,T8,,admin,Lan,Mới tạo,".to_string(),
    ];
    let mut sheet = String::from(HEADER);
    sheet.push('\n');
    for row in rows {
        sheet.push_str(&row);
        sheet.push('\n');
    }
    fs::write(log_dir.join("sheets/family-tasks.csv"), sheet).unwrap();
}

fn sheet_text(root: &Path) -> String {
    fs::read_to_string(root.join("tasklog/sheets/family-tasks.csv")).unwrap()
}

/// Run `tl` with the given args in the given directory, returning (stdout, stderr, success).
fn run_tl(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(tl_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("TASKLOG_PASSWORD")
        .output()
        .expect("failed to run tl");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `tl` expecting success, return stdout.
fn run_tl_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_tl(dir, args);
    if !success {
        panic!(
            "tl {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

fn run_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let mut full = args.to_vec();
    full.push("--json");
    let out = run_tl_ok(dir, &full);
    serde_json::from_str(&out).unwrap()
}

fn login(dir: &Path, user: &str, password: &str) {
    run_tl_ok(dir, &["login", user, "--password", password]);
}

fn names(tasks: &serde_json::Value) -> Vec<String> {
    tasks
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

#[test]
fn test_init_scaffolds_config_and_sheet() {
    let tmp = tempfile::TempDir::new().unwrap();

    let out = run_tl_ok(tmp.path(), &["init", "--name", "Home"]);
    assert!(out.contains("Initialized task log: Home"));

    let config = fs::read_to_string(tmp.path().join("tasklog/tasklog.toml")).unwrap();
    assert!(config.contains("name = \"Home\""));
    assert!(config.contains("tasks = \"family-tasks\""));
    assert_eq!(sheet_text(tmp.path()), format!("{}\n", HEADER));
}

#[test]
fn test_init_refuses_existing_without_force() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    let before = sheet_text(tmp.path());

    let (_stdout, stderr, success) = run_tl(tmp.path(), &["init"]);
    assert!(!success);
    assert!(stderr.contains("already exists"));

    run_tl_ok(tmp.path(), &["init", "--force"]);
    assert_eq!(sheet_text(tmp.path()), before);
}

#[test]
fn test_not_a_project() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_stdout, stderr, success) = run_tl(tmp.path(), &["list"]);
    assert!(!success);
    assert!(stderr.contains("not a tasklog project"));
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[test]
fn test_login_whoami_logout() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());

    let out = run_tl_ok(tmp.path(), &["login", "Lan", "--password", "pw-lan"]);
    assert!(out.contains("logged in as lan (employee)"));

    let who = run_json(tmp.path(), &["whoami"]);
    assert_eq!(who["username"], "lan");
    assert_eq!(who["role"], "employee");

    assert!(run_tl_ok(tmp.path(), &["logout"]).contains("logged out"));
    let (_stdout, stderr, success) = run_tl(tmp.path(), &["whoami"]);
    assert!(!success);
    assert!(stderr.contains("not logged in"));
}

#[test]
fn test_login_password_from_env() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());

    let output = Command::new(tl_bin())
        .args(["login", "minh"])
        .current_dir(tmp.path())
        .env("TASKLOG_PASSWORD", "pw-minh")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(tmp.path().join("tasklog/.session.json").is_file());
}

#[test]
fn test_login_rejects_bad_password() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());

    let (_stdout, stderr, success) = run_tl(tmp.path(), &["login", "admin", "--password", "nope"]);
    assert!(!success);
    assert!(stderr.contains("incorrect username or password"));
    assert!(!tmp.path().join("tasklog/.session.json").exists());
}

#[test]
fn test_commands_require_login() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());

    let cases: [&[&str]; 4] = [&["list"], &["deadline"], &["overdue"], &["search", "mop"]];
    for args in cases {
        let (_stdout, stderr, success) = run_tl(tmp.path(), args);
        assert!(!success, "{:?} should fail without a session", args);
        assert!(stderr.contains("not logged in"));
    }
}

#[test]
fn test_role_without_feature_is_denied() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    login(tmp.path(), "lan", "pw-lan");

    // view_all_tasks is admin-only by default
    let (_stdout, stderr, success) = run_tl(tmp.path(), &["list"]);
    assert!(!success);
    assert!(stderr.contains("access denied"));

    // but employees may triage deadlines
    run_tl_ok(tmp.path(), &["deadline"]);
}

#[test]
fn test_config_permissions_override_defaults() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    let config_path = tmp.path().join("tasklog/tasklog.toml");
    let mut config = fs::read_to_string(&config_path).unwrap();
    config.push_str("\n[permissions]\nview_all_tasks = [\"admin\", \"employee\"]\n");
    fs::write(&config_path, config).unwrap();

    login(tmp.path(), "lan", "pw-lan");
    run_tl_ok(tmp.path(), &["list"]);
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

#[test]
fn test_list_shows_latest_revision_per_task() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    login(tmp.path(), "admin", "secret");

    let tasks = run_json(tmp.path(), &["list"]);
    // ordered by name; the legacy row has no parseable add_time
    assert_eq!(
        names(&tasks),
        vec!["Buy milk", "Fix roof", "Mop floor", "Old chore", "Pay bills", "Water plants"]
    );

    let mop = &tasks[2];
    assert_eq!(mop["status"], "in-progress");
    assert_eq!(mop["task_id"], "T2");
    assert_eq!(mop["comment"], "started");
    // gaps in the newest revision are filled from the older one
    assert_eq!(mop["assignee"], "Lan");
    assert_eq!(mop["deadline"], due(-3));
    assert_eq!(mop["external_id"], "HOME-1");
}

#[test]
fn test_list_text() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    login(tmp.path(), "admin", "secret");

    let out = run_tl_ok(tmp.path(), &["list"]);
    let mop = out.lines().find(|l| l.starts_with("Mop floor")).unwrap();
    assert!(mop.contains("In progress"));
    assert!(mop.contains("Lan"));
    assert_eq!(out.lines().count(), 6);
}

#[test]
fn test_search_is_case_insensitive() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    login(tmp.path(), "lan", "pw-lan");

    let hits = run_json(tmp.path(), &["search", "MOP"]);
    assert_eq!(names(&hits), vec!["Mop floor"]);

    let hits = run_json(tmp.path(), &["search", "hall", "--column", "task_des"]);
    assert_eq!(names(&hits), vec!["Mop floor"]);

    let hits = run_json(tmp.path(), &["search", "minh", "--column", "task_po"]);
    assert_eq!(names(&hits), vec!["Buy milk", "Fix roof", "Old chore", "Pay bills"]);
}

#[test]
fn test_search_treats_term_literally() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    login(tmp.path(), "lan", "pw-lan");

    let hits = run_json(tmp.path(), &["search", ".*"]);
    assert!(hits.as_array().unwrap().is_empty());
}

#[test]
fn test_search_empty_term_warns() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    login(tmp.path(), "lan", "pw-lan");

    let (stdout, stderr, success) = run_tl(tmp.path(), &["search", "  "]);
    assert!(success);
    assert!(stdout.is_empty());
    assert!(stderr.contains("enter a search term"));
}

#[test]
fn test_deadline_buckets() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    login(tmp.path(), "lan", "pw-lan");

    let out = run_json(tmp.path(), &["deadline"]);
    assert_eq!(out["today"], due(0));
    assert_eq!(names(&out["due_today"]), vec!["Pay bills"]);
    // paused tasks are still active
    assert_eq!(names(&out["due_soon"]), vec!["Water plants"]);
    assert_eq!(names(&out["due_later"]), vec!["Fix roof"]);
}

#[test]
fn test_deadline_filtered_by_assignee() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    login(tmp.path(), "lan", "pw-lan");

    let out = run_json(tmp.path(), &["deadline", "--po", "Lan"]);
    assert!(out["due_today"].as_array().unwrap().is_empty());
    assert_eq!(names(&out["due_soon"]), vec!["Water plants"]);
    assert!(out["due_later"].as_array().unwrap().is_empty());

    let text = run_tl_ok(tmp.path(), &["deadline"]);
    assert!(text.contains("== Due today (1) =="));
    assert!(text.contains("== Due later (1) =="));
}

#[test]
fn test_overdue_sorted_and_counted() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    login(tmp.path(), "minh", "pw-minh");

    let out = run_json(tmp.path(), &["overdue"]);
    assert_eq!(out["order"], "by-deadline");
    let tasks = out["tasks"].as_array().unwrap();
    // the completed chore is not overdue
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["name"], "Mop floor");
    assert_eq!(tasks[0]["days_overdue"], 3);
    assert_eq!(tasks[1]["name"], "Buy milk");
    assert_eq!(tasks[1]["days_overdue"], 1);

    let least = run_json(tmp.path(), &["overdue", "--sort", "least"]);
    assert_eq!(least["order"], "least-overdue");
    assert_eq!(least["tasks"][0]["name"], "Buy milk");

    let text = run_tl_ok(tmp.path(), &["overdue", "--sort", "most"]);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "== Overdue (2) ==");
    assert!(lines[1].contains("3 days late"));
    assert!(lines[2].contains("1 day late"));
}

#[test]
fn test_overdue_none() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    login(tmp.path(), "minh", "pw-minh");

    let out = run_tl_ok(tmp.path(), &["overdue", "--po", "Nobody"]);
    assert_eq!(out.trim(), "no overdue tasks");
}

#[test]
fn test_history_oldest_first() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    login(tmp.path(), "admin", "secret");

    let revs = run_json(tmp.path(), &["history", "Mop floor"]);
    let revs = revs.as_array().unwrap();
    assert_eq!(revs.len(), 2);
    assert_eq!(revs[0]["task_id"], "T1");
    assert_eq!(revs[1]["task_id"], "T2");
    assert_eq!(revs[1]["assignee"], "Lan");

    let (_stdout, stderr, success) = run_tl(tmp.path(), &["history", "Nope"]);
    assert!(!success);
    assert!(stderr.contains("task not found"));
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

#[test]
fn test_add_appends_revision() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    login(tmp.path(), "admin", "secret");
    let before = sheet_text(tmp.path());

    let out = run_tl_ok(
        tmp.path(),
        &["add", "Walk dog", "--po", "Lan", "--des", "Evening, park", "--deadline", &due(2)],
    );
    assert!(out.trim().starts_with("TASK-"));

    let after = sheet_text(tmp.path());
    assert!(after.starts_with(&before));
    assert_eq!(after.lines().count(), before.lines().count() + 1);

    let tasks = run_json(tmp.path(), &["list"]);
    let walk = tasks
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "Walk dog")
        .unwrap();
    assert_eq!(walk["status"], "new");
    assert_eq!(walk["status_label"], "Mới tạo");
    assert_eq!(walk["reporter"], "admin");
    assert_eq!(walk["description"], "Evening, park");
}

#[test]
fn test_add_rejects_bad_deadline() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    login(tmp.path(), "admin", "secret");
    let before = sheet_text(tmp.path());

    let (_stdout, stderr, success) =
        run_tl(tmp.path(), &["add", "Walk dog", "--po", "Lan", "--deadline", "tomorrow"]);
    assert!(!success);
    assert!(stderr.contains("invalid deadline"));
    assert_eq!(sheet_text(tmp.path()), before);
}

#[test]
fn test_add_requires_admin_by_default() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    login(tmp.path(), "minh", "pw-minh");

    let (_stdout, stderr, success) = run_tl(tmp.path(), &["add", "Walk dog", "--po", "Lan"]);
    assert!(!success);
    assert!(stderr.contains("access denied"));
}

#[test]
fn test_edit_status_closes_overdue_task() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    login(tmp.path(), "lan", "pw-lan");

    let out = run_tl_ok(
        tmp.path(),
        &["edit", "Mop floor", "--status", "done", "--comment", "finished"],
    );
    assert!(out.contains("updated Mop floor"));

    let overdue = run_json(tmp.path(), &["overdue"]);
    assert_eq!(names(&overdue["tasks"]), vec!["Buy milk"]);

    login(tmp.path(), "admin", "secret");
    let revs = run_json(tmp.path(), &["history", "Mop floor"]);
    let last = &revs.as_array().unwrap()[2];
    assert_eq!(last["status_label"], "Hoàn thành");
    assert_eq!(last["comment"], "finished");
    // carried over from the reconciled row
    assert_eq!(last["deadline"], due(-3));
    assert_eq!(last["assignee"], "Lan");
    assert_eq!(last["link"], "https://tracker.example.com/browse/HOME-1");
}

#[test]
fn test_edit_unknown_task_or_status() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    login(tmp.path(), "lan", "pw-lan");

    let (_stdout, stderr, success) = run_tl(tmp.path(), &["edit", "Nope", "--status", "done"]);
    assert!(!success);
    assert!(stderr.contains("task not found"));

    let (_stdout, stderr, success) = run_tl(tmp.path(), &["edit", "Buy milk", "--status", "someday"]);
    assert!(!success);
    assert!(stderr.contains("unknown status"));
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

#[test]
fn test_migrate_dry_run_then_write() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    login(tmp.path(), "admin", "secret");
    let before = sheet_text(tmp.path());

    let out = run_tl_ok(tmp.path(), &["migrate", "--dry-run"]);
    assert!(out.contains("would convert 1 add_time value(s)"));
    assert!(out.contains("would convert 1 deadline value(s)"));
    assert_eq!(sheet_text(tmp.path()), before);

    let out = run_tl_ok(tmp.path(), &["migrate"]);
    assert!(out.contains("converted 1 add_time value(s)"));
    let after = sheet_text(tmp.path());
    assert!(after.contains("Legacy row,05/01/2024 07:30:00,01/02/2024,"));

    let tasks = run_json(tmp.path(), &["list"]);
    assert!(names(&tasks).contains(&"Legacy row".to_string()));
}

#[test]
fn test_migrate_is_admin_only() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    login(tmp.path(), "minh", "pw-minh");

    let (_stdout, stderr, success) = run_tl(tmp.path(), &["migrate", "--dry-run"]);
    assert!(!success);
    assert!(stderr.contains("access denied"));
}

// ---------------------------------------------------------------------------
// -C flag
// ---------------------------------------------------------------------------

#[test]
fn test_project_dir_flag() {
    let tmp = tempfile::TempDir::new().unwrap();
    let elsewhere = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    let dir = tmp.path().to_str().unwrap();

    run_tl_ok(elsewhere.path(), &["-C", dir, "login", "admin", "--password", "secret"]);
    let tasks: serde_json::Value =
        serde_json::from_str(&run_tl_ok(elsewhere.path(), &["-C", dir, "list", "--json"])).unwrap();
    assert_eq!(tasks.as_array().unwrap().len(), 6);
}

#[test]
fn test_project_discovered_from_subdirectory() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_project(tmp.path());
    let nested = tmp.path().join("notes/2024");
    fs::create_dir_all(&nested).unwrap();

    login(&nested, "admin", "secret");
    let tasks = run_json(&nested, &["list"]);
    assert_eq!(tasks.as_array().unwrap().len(), 6);
}
