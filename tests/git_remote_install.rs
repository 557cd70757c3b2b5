//! Installs from an actual local git remote (`file://`), exercising the
//! fetch/cache/sparse-checkout path the `Local`-only tests above never
//! touch.

mod common;
use common::TestProject;

#[test]
fn installs_a_tagged_package_from_a_local_remote() {
    let project = TestProject::new();
    let remote = project.create_remote("widgets");
    remote.write_file("lib.txt", "widgets v1").unwrap();
    remote.commit_all("initial").unwrap();
    remote.tag("v1.0.0").unwrap();

    project.write_manifest(&format!(
        "[packages.widgets]\nrepo = \"{}\"\ntag = \"v1.0.0\"\n",
        remote.file_url()
    ));

    project.cmd(&["install"]).assert().success();

    let installed = project.packages_dir().join("widgets").join("lib.txt");
    assert_eq!(std::fs::read_to_string(installed).unwrap(), "widgets v1");
}

#[test]
fn two_packages_pinned_to_the_same_branch_resolve_to_the_same_commit() {
    let project = TestProject::new();
    let remote = project.create_remote("shared");
    remote.write_file("README.md", "hello").unwrap();
    let head = remote.commit_all("initial").unwrap();

    project.write_manifest(&format!(
        "[packages.one]\nrepo = \"{url}\"\nbranch = \"main\"\n\n[packages.two]\nrepo = \"{url}\"\nbranch = \"main\"\n",
        url = remote.file_url()
    ));

    project.cmd(&["install"]).assert().success();

    for name in ["one", "two"] {
        let readme = project.packages_dir().join(name).join("README.md");
        assert_eq!(std::fs::read_to_string(readme).unwrap(), "hello");
    }
    // Both packages pinned to the same branch of the same repo must share
    // the cache entry keyed off the resolved commit.
    let cache_dirs: Vec<_> = std::fs::read_dir(project.cache_dir_for_test())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .collect();
    assert_eq!(cache_dirs.len(), 1, "expected a single shared cache entry for commit {head}");
}

#[test]
fn sparse_path_materializes_only_the_declared_subdirectory() {
    let project = TestProject::new();
    let remote = project.create_remote("monorepo");
    remote.write_file("pkg-a/lib.txt", "a content").unwrap();
    remote.write_file("pkg-b/lib.txt", "b content").unwrap();
    remote.commit_all("initial").unwrap();
    remote.tag("v1.0.0").unwrap();

    project.write_manifest(&format!(
        "[packages.pkg_a]\nrepo = \"{}\"\npath = \"pkg-a\"\ntag = \"v1.0.0\"\n",
        remote.file_url()
    ));

    project.cmd(&["install"]).assert().success();

    let installed = project.packages_dir().join("pkg_a");
    assert!(installed.join("lib.txt").exists());
    let entries: Vec<_> = std::fs::read_dir(&installed).unwrap().filter_map(Result::ok).collect();
    assert_eq!(entries.len(), 1, "only the declared subdirectory's content should be materialized");
}
