//! Cascading removal: installed set is `{a, b, c, d}` with `a -> b -> d`,
//! `c -> d`. Removing `c` leaves `{a, b, d}`; removing `a` afterward leaves
//! the workspace empty because `d` is no longer reachable.

mod common;
use common::TestProject;

fn write_local_package(root: &std::path::Path, name: &str, nested_manifest: &str) {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    if !nested_manifest.is_empty() {
        std::fs::write(dir.join("git-pm.toml"), nested_manifest).unwrap();
    }
}

#[test]
fn remove_cascades_through_unreachable_dependents() {
    let project = TestProject::new();
    let deps_root = project.path().join("deps");
    std::fs::create_dir_all(&deps_root).unwrap();

    write_local_package(&deps_root, "d", "");
    write_local_package(&deps_root, "b", "[packages.d]\npath = \"../d\"\n");
    write_local_package(&deps_root, "c", "[packages.d]\npath = \"../d\"\n");

    project.write_manifest(
        "[packages.a]\npath = \"deps/b\"\n\n[packages.c]\npath = \"deps/c\"\n",
    );
    // 'a' here stands in for the "requires b" root edge: name the entry
    // whatever the root manifest likes, what matters is the resulting graph.
    project.cmd(&["install"]).assert().success();

    let packages_dir = project.packages_dir();
    for name in ["a", "c", "d"] {
        assert!(packages_dir.join(name).exists(), "missing package {name}");
    }

    project.cmd(&["remove", "c", "-y"]).assert().success();
    assert!(packages_dir.join("a").exists());
    assert!(packages_dir.join("d").exists(), "d is still reachable via a -> b(named a) -> d");
    assert!(!packages_dir.join("c").exists());

    project.cmd(&["remove", "a", "-y"]).assert().success();
    assert!(!packages_dir.join("a").exists());
    assert!(!packages_dir.join("d").exists(), "d is now unreachable and must be pruned");

    let env_file = project.path().join(".git-pm.env");
    assert!(env_file.exists());
    let contents = std::fs::read_to_string(&env_file).unwrap();
    assert!(!contents.contains("GIT_PM_PACKAGE_A"));
}

#[test]
fn remove_of_uninstalled_package_fails() {
    let project = TestProject::new();
    project.write_manifest("");
    project.cmd(&["install"]).assert().success();
    project.cmd(&["remove", "nope", "-y"]).assert().failure();
}
