// Binary-level tests: argument parsing plus full runs of the compiled `rdist`
// against a temporary skill tree.
use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use clap::Parser;
use predicates::prelude::*;
use serde_json::Value;
use std::process::Command;

use ruledist::cli::{Cli, Commands, PlanArgs};

mod util;

use util::{RULES_YAML, make_skill_fixture};

fn rdist(dir: &std::path::Path) -> Command
{
    let mut cmd = Command::cargo_bin("rdist").expect("bin");
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("RULEDIST_RULES_FILE")
        .env_remove("RULEDIST_LOG_LEVEL");
    cmd
}

#[test]
fn plan_flag_parsing()
{
    // Given
    let argv = vec!["rdist", "--quiet", "plan", "--config", "rules.yaml", "--task", "claude", "--json"];

    // When
    let cmd = Cli::parse_from(argv);

    // Then
    assert!(cmd.quiet);
    match cmd.command
    {
        Commands::Plan(PlanArgs { source, task, json }) =>
        {
            assert_eq!(task.as_deref(), Some("claude"));
            assert!(json);
            let p = source
                .config
                .expect("flag should be captured");
            assert!(p.to_string_lossy().ends_with("rules.yaml"));
            assert!(source.root.is_none());
        }
        _ => panic!("expected Plan command"),
    }
}

#[test]
fn help_uses_binary_name()
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    rdist(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: rdist"));

    let err = Cli::try_parse_from(["rdist", "bogus"]).expect_err("unknown subcommand");
    assert!(err.to_string().contains("rdist"));
}

#[test]
fn completions_into_default_directory()
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    rdist(tmp.path())
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rdist.fish"));

    tmp.child("rdist.fish")
        .assert(predicate::str::contains("complete -c rdist"));
}

#[test]
fn run_writes_every_task()
{
    let tmp = make_skill_fixture();

    rdist(tmp.path())
        .args(["--no-color", "run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("claude: 2 written, 1 skipped"))
        .stdout(predicate::str::contains("codex: 1 written"));

    tmp.child("out/.claude/skills/pdf/SKILL.md")
        .assert(predicate::path::is_file());
    tmp.child("out/.cursor/rules/xlsx.mdc")
        .assert(predicate::path::is_file());
    tmp.child("out/AGENTS.md")
        .assert(predicate::str::contains("./.claude/skills/pdf/SKILL.md"));
}

#[test]
fn dry_run_leaves_tree_untouched()
{
    let tmp = make_skill_fixture();

    rdist(tmp.path())
        .args(["--dry-run", "--no-color", "run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DRY RUN"));

    tmp.child("out")
        .assert(predicate::path::missing());
}

#[test]
fn plan_json_lists_targets()
{
    let tmp = make_skill_fixture();

    let assert = rdist(tmp.path())
        .args(["plan", "--json", "--task", "cursor"])
        .assert()
        .success();

    let stdout = String::from_utf8(
        assert
            .get_output()
            .stdout
            .clone(),
    )
    .expect("utf8");
    let v: Value = serde_json::from_str(&stdout).expect("json");

    assert_eq!(v["cursor"]["skills/pdf/SKILL.md"], ".cursor/rules/pdf.mdc");
    assert!(v.get("claude").is_none());
    tmp.child("out")
        .assert(predicate::path::missing());
}

#[test]
fn plan_table_and_unknown_task()
{
    let tmp = make_skill_fixture();

    rdist(tmp.path())
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains(".claude/skills/xlsx/SKILL.md"));

    rdist(tmp.path())
        .args(["plan", "--task", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No task named `nope`"));
}

#[test]
fn missing_rule_document_is_fatal()
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    rdist(tmp.path())
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("rule configuration not found"));
}

#[test]
fn env_selects_yaml_rule_document()
{
    let tmp = make_skill_fixture();
    tmp.child("rules.yaml")
        .write_str(RULES_YAML)
        .expect("write yaml");

    rdist(tmp.path())
        .env("RULEDIST_RULES_FILE", "rules.yaml")
        .args(["--quiet", "run"])
        .assert()
        .success();

    tmp.child("out/AGENTS.md")
        .assert(predicate::path::is_file());
    tmp.child("out/.claude")
        .assert(predicate::path::missing());
}

#[test]
fn init_refuses_to_overwrite()
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    rdist(tmp.path())
        .arg("init")
        .assert()
        .success();
    tmp.child("ruledist.toml")
        .assert(predicate::str::contains("rules_file"));

    rdist(tmp.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    rdist(tmp.path())
        .args(["init", "--force"])
        .assert()
        .success();
}

#[test]
fn completions_to_stdout()
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    rdist(tmp.path())
        .args(["completions", "bash", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rdist"));
}
