//! Binary-level tests for the reqforge commands
//!
//! None of these reach an LLM provider.

mod test_support;

use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use std::process::{Command, Stdio};
use test_support::Project;

fn reqforge(project: &Project) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("reqforge"));
    cmd.stdin(Stdio::null());
    cmd.current_dir(project.root())
        .env_remove("REQFORGE_LLM_PROVIDER")
        .env_remove("REQFORGE_LLM_BUDGET")
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("OPENROUTER_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::new(assert_cmd::cargo::cargo_bin!("reqforge"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("requirements"));
}

#[test]
fn test_unknown_flag_is_rejected() {
    let project = Project::new();
    reqforge(&project)
        .args(["run", "--frobnicate"])
        .assert()
        .code(2);
}

#[test]
fn test_config_shows_sources() {
    let project = Project::new();
    project.write(
        ".reqforge/config.toml",
        "[project]\nchangelog = \"CHANGES.md\"\n\n[llm]\ntimeout_secs = 30\n",
    );

    reqforge(&project)
        .args(["config", "--budget", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"))
        .stdout(predicate::str::is_match(r"llm\.budget\s+= 7\s+\[cli\]").unwrap())
        .stdout(predicate::str::is_match(r"llm\.timeout_secs\s+= 30\s+\[config\]").unwrap())
        .stdout(predicate::str::contains("CHANGES.md"))
        .stdout(predicate::str::is_match(r"artifacts\.markup\s+= index\.html\s+\[default\]").unwrap());
}

#[test]
fn test_malformed_config_exits_with_cli_args_code() {
    let project = Project::new();
    project.write(".reqforge/config.toml", "[llm\nprovider = ");

    reqforge(&project)
        .arg("config")
        .assert()
        .code(2)
        .stderr(predicate::str::is_match("(?i)config").unwrap());
}

#[test]
fn test_requirements_lists_in_source_order() {
    let project = Project::new();
    project.write(
        "REQUIREMENTS.md",
        "Add a footer\n- with a copyright line\n\nAdd a dark-mode toggle\n",
    );

    reqforge(&project)
        .arg("requirements")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. Add a footer"))
        .stdout(predicate::str::contains("- with a copyright line"))
        .stdout(predicate::str::contains("2. Add a dark-mode toggle"));
}

#[test]
fn test_requirements_with_missing_source() {
    let project = Project::new();

    reqforge(&project)
        .arg("requirements")
        .assert()
        .success()
        .stdout(predicate::str::contains("No requirements source found"));
}

#[test]
fn test_check_reports_invalid_artifacts() {
    let project = Project::new();
    project
        .write("index.html", "<main><p>hi</p></main>")
        .write("styles.css", "a { color: red;");

    reqforge(&project)
        .arg("check")
        .assert()
        .code(3)
        .stdout(predicate::str::contains("✓ index.html"))
        .stdout(predicate::str::contains("✗ styles.css"))
        .stdout(predicate::str::contains("2 artifacts checked, 1 invalid"));

    assert_eq!(project.read("styles.css"), "a { color: red;");
}

#[test]
fn test_check_passes_on_valid_tree() {
    let project = Project::new();
    project
        .write("index.html", "<p>hi</p>")
        .write("js/app.js", "const x = [1, 2];\n");

    reqforge(&project).args(["check", "--json"]).assert().success().stdout(
        predicate::str::contains("\"status\": \"valid\"").and(predicate::str::contains("app.js")),
    );
}

#[test]
fn test_dry_run_needs_no_credentials_and_writes_nothing() {
    let project = Project::new();
    project
        .write("REQUIREMENTS.md", "Add a footer\nAdd a header\n")
        .write("script.js", "if (x {");

    reqforge(&project)
        .args(["run", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"))
        .stdout(predicate::str::contains("Oracle calls: 0"));

    assert_eq!(project.read("script.js"), "if (x {");
    assert!(!project.exists("script.js.bak"));
    assert!(!project.exists("FEATURES.md"));
}

#[test]
fn test_run_without_source_is_a_noop() {
    let project = Project::new();

    reqforge(&project)
        .args(["run", "--dry-run", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"source_found\": false"));
}

#[test]
fn test_run_without_source_needs_no_credentials() {
    let project = Project::new();
    project.write("styles.css", "a {");

    reqforge(&project)
        .args(["run", "--model", "some-model"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No requirements source found"));

    assert_eq!(project.read("styles.css"), "a {");
    assert!(!project.exists("styles.css.bak"));
}

#[test]
fn test_run_without_api_key_is_backend_failure() {
    let project = Project::new();
    project.write("REQUIREMENTS.md", "Add a footer\n");

    reqforge(&project)
        .args(["run", "--model", "some-model"])
        .assert()
        .code(70)
        .stderr(predicate::str::contains("ANTHROPIC_API_KEY"));

    assert!(!project.exists("index.html"));
}

#[test]
fn test_explicit_requirements_path() {
    let project = Project::new();
    project.write("docs/features.md", "Add a sidebar\n");

    reqforge(&project)
        .args(["requirements", "--requirements", "docs/features.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. Add a sidebar"));
}
