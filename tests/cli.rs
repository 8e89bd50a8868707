//! Exit status and output of the command line

use assert_cmd::prelude::*;
use predicates::prelude::*;
use rusqlite::Connection;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn planner(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("factory-planner").unwrap();
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("FACTORY_PLANNER_DB")
        .env_remove("FACTORY_PLANNER_TENANT")
        .arg("--database")
        .arg(dir.join("catalog.db"));
    cmd
}

#[test]
fn test_calc_succeeds_on_sample() {
    let temp_dir = TempDir::new().unwrap();
    planner(temp_dir.path()).arg("load-sample").assert().success();

    planner(temp_dir.path())
        .args(["calc", "iron_plate", "--rate", "1", "--format", "tree"])
        .assert()
        .success()
        .stdout(predicate::str::contains("iron_ore"));
}

#[test]
fn test_missing_recipe_exits_with_client_status() {
    let temp_dir = TempDir::new().unwrap();
    planner(temp_dir.path()).arg("load-sample").assert().success();

    planner(temp_dir.path())
        .args(["calc", "fuel", "--rate", "1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("could not find recipe for 'fuel'"));
}

#[test]
fn test_invalid_rate_exits_with_client_status() {
    let temp_dir = TempDir::new().unwrap();

    planner(temp_dir.path())
        .args(["calc", "iron_plate", "--rate", "0"])
        .assert()
        .code(2);
}

#[test]
fn test_broken_store_exits_with_server_status() {
    let temp_dir = TempDir::new().unwrap();
    // a machines table without speed/power columns makes every lookup fail
    let conn = Connection::open(temp_dir.path().join("catalog.db")).unwrap();
    conn.execute_batch(
        "CREATE TABLE machines (id INTEGER PRIMARY KEY, tenant_id INTEGER NOT NULL, name TEXT NOT NULL);",
    )
    .unwrap();
    drop(conn);

    planner(temp_dir.path())
        .args(["calc", "iron_plate", "--rate", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("catalog lookup failed"));
}

#[test]
fn test_list_resources_shows_liquid_and_unit() {
    let temp_dir = TempDir::new().unwrap();
    planner(temp_dir.path()).arg("load-sample").assert().success();

    planner(temp_dir.path())
        .arg("list-resources")
        .assert()
        .success()
        .stdout(predicate::str::contains("Liquid"))
        .stdout(predicate::str::is_match(r"crude_oil\s+yes\s+m3\s+yes").unwrap());
}
