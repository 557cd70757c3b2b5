//! `git-pm config`: set/get/unset a project-scope key and list the
//! effective configuration.

mod common;
use common::TestProject;
use predicates::prelude::*;

#[test]
fn set_then_get_round_trips_through_project_config() {
    let project = TestProject::new();
    project.write_manifest("");

    project.cmd(&["config", "packages_dir", "vendor"]).assert().success();
    project.cmd(&["config", "packages_dir"]).assert().success().stdout(predicate::str::contains("vendor"));

    assert!(project.path().join(".git-pm/config.toml").exists());
}

#[test]
fn unset_reverts_to_default() {
    let project = TestProject::new();
    project.write_manifest("");

    project.cmd(&["config", "packages_dir", "vendor"]).assert().success();
    project.cmd(&["config", "--unset", "packages_dir"]).assert().success();
    project
        .cmd(&["config", "packages_dir"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".git-packages"));
}

#[test]
fn list_reports_every_recognized_key() {
    let project = TestProject::new();
    project.write_manifest("");
    project.cmd(&["config", "packages_dir", "vendor"]).assert().success();

    project
        .cmd(&["config", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("packages_dir = vendor (project)"))
        .stdout(predicate::str::contains("cache_dir"))
        .stdout(predicate::str::contains("azure_devops_pat"));
}

#[test]
fn unknown_key_is_rejected() {
    let project = TestProject::new();
    project.write_manifest("");
    project.cmd(&["config", "nonexistent", "x"]).assert().failure();
}
