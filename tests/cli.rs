//! End-to-end CLI tests driving the `aks` binary against a temp store.
//!
//! Stdout is not a TTY under the test harness, so output is JSON.

use assert_cmd::Command;
use tempfile::TempDir;

fn aks(store: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("aks").unwrap();
    cmd.env("AIKNOWSYS_DIR", store.path().join(".aiknowsys"))
        .env("AIKNOWSYS_AUTHOR", "tester")
        .env_remove("AIKNOWSYS_DB_PATH");
    cmd
}

#[test]
fn init_then_reinit_fails_without_force() {
    let store = TempDir::new().unwrap();

    aks(&store).args(["init"]).assert().success();
    assert!(store.path().join(".aiknowsys/context-index.json").is_file());

    // Exit 4: validation error.
    aks(&store).args(["init"]).assert().code(4);
    aks(&store).args(["init", "--force"]).assert().success();
}

#[test]
fn session_create_is_idempotent() {
    let store = TempDir::new().unwrap();
    aks(&store).args(["init"]).assert().success();

    let out = aks(&store)
        .args(["session", "create", "morning work", "--date", "2026-08-20"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&out.get_output().stdout).to_string();
    assert!(stdout.contains("\"created\":true"));

    let out = aks(&store)
        .args(["session", "create", "other title", "--date", "2026-08-20"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&out.get_output().stdout).to_string();
    assert!(stdout.contains("\"created\":false"));
    assert!(stdout.contains("morning work"));
}

#[test]
fn malformed_date_is_rejected_with_exit_4() {
    let store = TempDir::new().unwrap();
    aks(&store).args(["init"]).assert().success();

    aks(&store)
        .args(["session", "create", "x", "--date", "08/20/2026"])
        .assert()
        .code(4);
}

#[test]
fn plan_lifecycle_and_exit_codes() {
    let store = TempDir::new().unwrap();
    aks(&store).args(["init"]).assert().success();

    aks(&store)
        .args(["plan", "create", "Auth Rework"])
        .assert()
        .success();

    // Duplicate slug: exit 5 (conflict).
    aks(&store)
        .args(["plan", "create", "Auth  Rework!"])
        .assert()
        .code(5);

    // PLANNED -> COMPLETE is illegal: exit 5.
    aks(&store)
        .args(["plan", "complete", "PLAN_auth_rework"])
        .assert()
        .code(5);

    aks(&store)
        .args(["plan", "activate", "PLAN_auth_rework"])
        .assert()
        .success();
    aks(&store)
        .args(["plan", "complete", "PLAN_auth_rework"])
        .assert()
        .success();

    // Unknown plan: exit 3 (not found).
    aks(&store)
        .args(["plan", "activate", "PLAN_missing"])
        .assert()
        .code(3);
}

#[test]
fn plan_id_flag_alias_works() {
    let store = TempDir::new().unwrap();
    aks(&store).args(["init"]).assert().success();
    aks(&store).args(["plan", "create", "Work"]).assert().success();

    // --id is rewritten to the positional form.
    aks(&store)
        .args(["plan", "show", "--id", "PLAN_work"])
        .assert()
        .success();
}

#[test]
fn search_returns_ranked_json() {
    let store = TempDir::new().unwrap();
    aks(&store).args(["init"]).assert().success();
    aks(&store)
        .args(["session", "create", "cache design", "--date", "2026-08-20"])
        .assert()
        .success();

    let out = aks(&store)
        .args(["search", "cache"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&out.get_output().stdout).to_string();
    assert!(stdout.contains("\"count\":1"));
    assert!(stdout.contains("\"type\":\"session\""));

    let out = aks(&store)
        .args(["search", "nothing-matches-this"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&out.get_output().stdout).to_string();
    assert!(stdout.contains("\"count\":0"));
}

#[test]
fn index_rebuild_recovers_corrupt_index() {
    let store = TempDir::new().unwrap();
    aks(&store).args(["init"]).assert().success();
    aks(&store)
        .args(["session", "create", "work", "--date", "2026-08-20"])
        .assert()
        .success();

    std::fs::write(
        store.path().join(".aiknowsys/context-index.json"),
        "{broken",
    )
    .unwrap();

    // Exit 8: storage I/O (corrupt index).
    aks(&store).args(["session", "list"]).assert().code(8);

    aks(&store).args(["index", "rebuild"]).assert().success();
    let out = aks(&store).args(["session", "list"]).assert().success();
    let stdout = String::from_utf8_lossy(&out.get_output().stdout).to_string();
    assert!(stdout.contains("\"count\":1"));
}

#[test]
fn sqlite_backend_end_to_end() {
    let store = TempDir::new().unwrap();
    let db = store.path().join("data/test.db");
    let db_arg = db.to_string_lossy().to_string();

    aks(&store)
        .args(["init", "--backend", "sqlite", "--db", &db_arg])
        .assert()
        .success();
    assert!(db.is_file());

    aks(&store)
        .args(["plan", "create", "Schema Work", "--db", &db_arg])
        .assert()
        .success();
    aks(&store)
        .args(["plan", "activate", "PLAN_schema_work", "--db", &db_arg])
        .assert()
        .success();

    let out = aks(&store)
        .args(["plan", "list", "--status", "ACTIVE", "--db", &db_arg])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&out.get_output().stdout).to_string();
    assert!(stdout.contains("PLAN_schema_work"));
}

#[test]
fn structured_error_json_on_stderr() {
    let store = TempDir::new().unwrap();
    aks(&store).args(["init"]).assert().success();

    let out = aks(&store)
        .args(["plan", "show", "PLAN_missing"])
        .assert()
        .code(3);
    let stderr = String::from_utf8_lossy(&out.get_output().stderr).to_string();
    assert!(stderr.contains("\"code\":\"PLAN_NOT_FOUND\""));
    assert!(stderr.contains("\"id\":\"PLAN_missing\""));
}
