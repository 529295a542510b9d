use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use walkdir::WalkDir;

fn cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::from(Command::new(env!("CARGO_BIN_EXE_helm-docs")));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

/// Copy a fixture tree into `dest`.
fn copy_fixture(name: &str, dest: &Path) {
    let src = Path::new(&fixture_path(name)).to_path_buf();
    for entry in WalkDir::new(&src) {
        let entry = entry.unwrap();
        let target = dest.join(name).join(entry.path().strip_prefix(&src).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}

fn write_chart(dir: &Path, chart_yaml: &str, values: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("Chart.yaml"), chart_yaml).unwrap();
    fs::write(dir.join("values.yaml"), values).unwrap();
}

fn stdout_of(assert: assert_cmd::assert::Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

// -- README generation --

#[test]
fn generates_readme_for_fixture() {
    let dir = TempDir::new().unwrap();
    copy_fixture("web", dir.path());

    cmd()
        .args(["-c", dir.path().to_str().unwrap(), "--skip-version-footer"])
        .assert()
        .success();

    let output = fs::read_to_string(dir.path().join("web/README.md")).unwrap();
    let expected = fs::read_to_string(fixture_path("web.expected.md")).unwrap();
    assert_eq!(output, expected);
}

#[test]
fn version_footer_by_default() {
    let dir = TempDir::new().unwrap();
    copy_fixture("web", dir.path());

    cmd()
        .args(["-c", dir.path().to_str().unwrap()])
        .assert()
        .success();

    let output = fs::read_to_string(dir.path().join("web/README.md")).unwrap();
    assert!(output.contains("Autogenerated from chart metadata using helm-docs v"));
}

#[test]
fn dry_run_prints_without_writing() {
    let dir = TempDir::new().unwrap();
    copy_fixture("web", dir.path());

    cmd()
        .args(["-c", dir.path().to_str().unwrap(), "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# web"))
        .stdout(predicate::str::contains("| replicaCount | int | `1` | Number of replicas |"));

    assert!(!dir.path().join("web/README.md").exists());
}

#[test]
fn custom_output_file_from_env() {
    let dir = TempDir::new().unwrap();
    copy_fixture("web", dir.path());

    cmd()
        .env("HELM_DOCS_OUTPUT_FILE", "VALUES.md")
        .args(["-c", dir.path().to_str().unwrap()])
        .assert()
        .success();

    assert!(dir.path().join("web/VALUES.md").is_file());
    assert!(!dir.path().join("web/README.md").exists());
}

#[test]
fn file_sort_order() {
    let dir = TempDir::new().unwrap();
    copy_fixture("web", dir.path());

    let output = stdout_of(
        cmd()
            .args(["-c", dir.path().to_str().unwrap(), "-d", "-s", "file"])
            .assert()
            .success(),
    );
    let replicas = output.find("| replicaCount |").unwrap();
    let repository = output.find("| image.repository |").unwrap();
    let pull_policy = output.find("| image.pullPolicy |").unwrap();
    assert!(replicas < repository);
    assert!(repository < pull_policy);
}

#[test]
fn invalid_sort_order_is_rejected() {
    cmd()
        .args(["-s", "random"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("random"));
}

#[test]
fn json_format() {
    let dir = TempDir::new().unwrap();
    copy_fixture("web", dir.path());

    let output = stdout_of(
        cmd()
            .args(["-c", dir.path().to_str().unwrap(), "-d", "--format", "json"])
            .assert()
            .success(),
    );
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["chart"]["name"], "web");
    let keys: Vec<&str> = parsed["values"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys[0], "image.pullPolicy");
    assert!(keys.contains(&"service.type"));
}

#[test]
fn json_format_writes_readme_json() {
    let dir = TempDir::new().unwrap();
    copy_fixture("web", dir.path());

    cmd()
        .args(["-c", dir.path().to_str().unwrap(), "--format", "json"])
        .assert()
        .success();

    assert!(!dir.path().join("web/README.md").exists());
    let written = fs::read_to_string(dir.path().join("web/README.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(parsed["chart"]["name"], "web");
}

#[test]
fn ignore_non_descriptions() {
    let dir = TempDir::new().unwrap();
    copy_fixture("web", dir.path());

    cmd()
        .args(["-c", dir.path().to_str().unwrap(), "-d", "--ignore-non-descriptions"])
        .assert()
        .success()
        .stdout(predicate::str::contains("| service.port |"))
        .stdout(predicate::str::contains("| service.type |").not())
        .stdout(predicate::str::contains("| image.tag |").not());
}

#[test]
fn custom_template() {
    let dir = TempDir::new().unwrap();
    copy_fixture("web", dir.path());
    fs::write(
        dir.path().join("web/README.md.tera"),
        "{{ header }}\n{% for e in entries %}{{ e.key }}={{ e.default }}\n{% endfor %}",
    )
    .unwrap();

    cmd()
        .args(["-c", dir.path().to_str().unwrap()])
        .assert()
        .success();

    let output = fs::read_to_string(dir.path().join("web/README.md")).unwrap();
    assert!(output.starts_with("# web\n"));
    assert!(output.contains("replicaCount=1\n"));
    assert!(output.contains("service.type=ClusterIP\n"));
}

// -- Discovery --

#[test]
fn ignore_file_skips_charts() {
    let dir = TempDir::new().unwrap();
    write_chart(&dir.path().join("app"), "name: app\n", "a: 1\n");
    write_chart(&dir.path().join("legacy/old"), "name: old\n", "b: 1\n");
    fs::write(dir.path().join(".helmdocsignore"), "# not maintained\nlegacy\n").unwrap();

    cmd()
        .args(["-c", dir.path().to_str().unwrap()])
        .assert()
        .success();

    assert!(dir.path().join("app/README.md").is_file());
    assert!(!dir.path().join("legacy/old/README.md").exists());
}

#[test]
fn chart_to_generate_limits_output() {
    let dir = TempDir::new().unwrap();
    write_chart(&dir.path().join("one"), "name: one\n", "a: 1\n");
    write_chart(&dir.path().join("two"), "name: two\n", "b: 1\n");

    cmd()
        .args(["-c", dir.path().to_str().unwrap(), "-g", "two"])
        .assert()
        .success();

    assert!(!dir.path().join("one/README.md").exists());
    assert!(dir.path().join("two/README.md").is_file());
}

// -- Dependencies --

fn dependency_tree(dir: &Path) {
    write_chart(
        &dir.join("web"),
        "name: web\ndependencies:\n  - name: common\n    version: 1.0.0\n    repository: file://../common\n  - name: redis\n    version: 17.0.0\n    repository: https://charts.example.com\n    alias: cache\n",
        "# -- Cache overrides\ncache:\n  port: 6380\n",
    );
    write_chart(&dir.join("common"), "name: common\n", "# -- Shared setting\nshared: true\n");
    write_chart(
        &dir.join("web/charts/redis"),
        "name: redis\n",
        "# -- Redis port\nport: 6379\n# -- Persistence\npersistence: false\n",
    );
}

#[test]
fn dependency_values_are_documented_under_mount_key() {
    let dir = TempDir::new().unwrap();
    dependency_tree(dir.path());

    cmd()
        .args(["-c", dir.path().to_str().unwrap(), "-g", "web", "-d", "-u"])
        .assert()
        .success()
        .stdout(predicate::str::contains("| common.shared | bool | `true` | Shared setting |"))
        .stdout(predicate::str::contains("| cache.persistence | bool | `false` | Persistence |"))
        // The parent's value wins; the description comes from the subchart
        .stdout(predicate::str::contains("| cache.port | int | `6380` | Redis port |"))
        .stdout(predicate::str::contains(
            "| https://charts.example.com | redis(cache) | 17.0.0 |",
        ));
}

#[test]
fn dependencies_are_plain_entries_without_flag() {
    let dir = TempDir::new().unwrap();
    dependency_tree(dir.path());

    cmd()
        .args(["-c", dir.path().to_str().unwrap(), "-g", "web", "-d"])
        .assert()
        .success()
        .stdout(predicate::str::contains("| common | object | `{}` |  |"))
        .stdout(predicate::str::contains("| cache.port | int | `6380` |  |"))
        .stdout(predicate::str::contains("common.shared").not());
}

#[test]
fn dependency_cycle_fails() {
    let dir = TempDir::new().unwrap();
    write_chart(
        &dir.path().join("a"),
        "name: a\ndependencies:\n  - name: b\n    repository: file://../b\n",
        "x: 1\n",
    );
    write_chart(
        &dir.path().join("b"),
        "name: b\ndependencies:\n  - name: a\n    repository: file://../a\n",
        "y: 1\n",
    );

    cmd()
        .args(["-c", dir.path().to_str().unwrap(), "-u"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dependency cycle"));

    assert!(!dir.path().join("a/README.md").exists());
    assert!(!dir.path().join("b/README.md").exists());
}

// -- Failures --

#[test]
fn malformed_chart_does_not_stop_others() {
    let dir = TempDir::new().unwrap();
    write_chart(&dir.path().join("bad"), "name: bad\n", "- not\n- a mapping\n");
    write_chart(&dir.path().join("good"), "name: good\n", "ok: true\n");

    cmd()
        .args(["-c", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed values"));

    assert!(dir.path().join("good/README.md").is_file());
    assert!(!dir.path().join("bad/README.md").exists());
}

#[test]
fn missing_search_root_fails() {
    cmd()
        .args(["-c", "/nonexistent/helm-docs-root"])
        .assert()
        .failure();
}
