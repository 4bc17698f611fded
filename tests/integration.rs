//! End-to-end integration tests for the suite runner
//!
//! These tests drive the real `asyncro` binary from a temporary workspace,
//! with `mock_engine` standing in for both the test engine and the merge
//! tool. Suite files hold mock directives (`sleep`, `exit`, `screenshot`,
//! `exclusive`) instead of real test cases.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Test context with paths and cleanup
struct TestContext {
    /// Working directory of the run
    workdir: PathBuf,
    /// Path to the runner binary
    runner_bin: PathBuf,
}

impl TestContext {
    /// Create a new workspace with a config pointing at the mock engine
    fn new(test_name: &str) -> Self {
        let workdir = env::temp_dir().join("asyncro-tests").join(test_name);

        // Clean up any previous test artifacts
        let _ = fs::remove_dir_all(&workdir);
        fs::create_dir_all(workdir.join("tests")).expect("Failed to create workspace");

        let ctx = Self {
            workdir,
            runner_bin: PathBuf::from(env!("CARGO_BIN_EXE_asyncro")),
        };
        ctx.write_config("");
        ctx
    }

    /// Write `asyncro.toml`; `extra` is appended verbatim
    fn write_config(&self, extra: &str) {
        let engine = env!("CARGO_BIN_EXE_mock_engine");
        let config = format!(
            r#"
[engine]
command = ['{engine}', 'run']
merge_command = ['{engine}', 'rebot']

[heartbeat]
first_secs = 0
{extra}
"#
        );
        fs::write(self.workdir.join("asyncro.toml"), config).expect("Failed to write config");
    }

    /// Create a suite file under the workspace
    fn suite(&self, relative: &str, directives: &[&str]) -> PathBuf {
        let path = self.workdir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, directives.join("\n")).unwrap();
        path
    }

    fn results(&self) -> PathBuf {
        self.workdir.join("results")
    }

    /// Run the runner with `args` from the workspace
    fn run(&self, args: &[&str]) -> RunOutput {
        let output = Command::new(&self.runner_bin)
            .args(args)
            .current_dir(&self.workdir)
            .env_remove("ASYNCRO_CONFIG")
            .env("NO_COLOR", "1")
            .env("CLICOLOR", "0")
            .env("RUST_LOG", "asyncro=info")
            .output()
            .expect("Failed to run asyncro");

        RunOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code(),
        }
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        // Preserve artifacts for debugging unless asked not to
        let preserve = env::var("PRESERVE_ASYNCRO_TEST_ARTIFACTS")
            .unwrap_or_else(|_| "1".to_string())
            .to_ascii_lowercase();

        if preserve == "0" || preserve == "false" || preserve == "no" {
            let _ = fs::remove_dir_all(&self.workdir);
        }
    }
}

/// Output from a runner invocation
#[derive(Debug)]
struct RunOutput {
    stdout: String,
    stderr: String,
    code: Option<i32>,
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("reading {}: {}", path.display(), e))
}

// ============== Tests ==============

#[test]
fn test_empty_datasource_merges_nothing() {
    let ctx = TestContext::new("empty_datasource");

    let output = ctx.run(&["tests"]);

    assert_eq!(output.code, Some(0), "{:?}", output);
    assert!(output.stdout.contains("0 suite(s)"), "{}", output.stdout);
    let aggregate = read(&ctx.results().join("output.xml"));
    assert!(aggregate.contains(r#"name="Tests""#));
    assert!(!aggregate.contains("source="));
    // the manifest never outlives discovery
    assert!(!ctx.workdir.join("suites.xml").exists());
}

#[test]
fn test_pass_and_fail_are_both_reported_and_merged() {
    let ctx = TestContext::new("pass_and_fail");
    ctx.suite("tests/pass.robot", &["sleep 50"]);
    ctx.suite("tests/fail.robot", &["exit 1"]);

    let output = ctx.run(&["--n=2", "tests"]);

    assert_eq!(output.code, Some(1), "{:?}", output);
    assert_eq!(output.stdout.matches("Started [PID:").count(), 2);
    assert!(output.stdout.contains("Passed! tests.pass.robot"));
    assert!(output.stdout.contains("Failed! tests.fail.robot"));

    let aggregate = read(&ctx.results().join("output.xml"));
    assert!(aggregate.contains(r#"name="pass""#));
    assert!(aggregate.contains(r#"name="fail""#));
    assert!(ctx.results().join("tests.pass.robot/stdout.txt").exists());
}

#[test]
fn test_single_worker_runs_suites_one_at_a_time() {
    let ctx = TestContext::new("single_worker");
    for name in ["a", "b", "c", "d", "e"] {
        ctx.suite(
            &format!("tests/{name}.robot"),
            &["exclusive running.lock", "sleep 100"],
        );
    }

    let output = ctx.run(&["--n=1", "tests"]);

    assert_eq!(output.code, Some(0), "{:?}", output);
    assert_eq!(output.stdout.matches("Passed!").count(), 5);
}

#[test]
fn test_nested_suites_get_flat_keys() {
    let ctx = TestContext::new("nested_suites");
    ctx.suite("tests/login/admin.robot", &[]);
    ctx.suite("tests/search.robot", &[]);

    let output = ctx.run(&["tests"]);

    assert_eq!(output.code, Some(0), "{:?}", output);
    assert!(ctx
        .results()
        .join("tests.login.admin.robot/result.xml")
        .exists());
    assert!(ctx.results().join("tests.search.robot/result.xml").exists());
}

#[test]
fn test_screenshots_are_relocated() {
    let ctx = TestContext::new("screenshots");
    ctx.suite("tests/shot.robot", &["screenshot selenium-screenshot-1.png", "exit 1"]);

    let output = ctx.run(&["tests"]);

    assert_eq!(output.code, Some(1), "{:?}", output);
    let relocated = ctx.results().join("tests.shot.robot.selenium-screenshot-1.png");
    assert!(relocated.exists(), "{:?}", output);

    let result = read(&ctx.results().join("tests.shot.robot/result.xml"));
    assert!(result.contains("tests.shot.robot.selenium-screenshot-1.png"));
    let aggregate = read(&ctx.results().join("output.xml"));
    assert!(aggregate.contains("tests.shot.robot.selenium-screenshot-1.png"));
}

#[test]
fn test_media_relocation_can_be_disabled() {
    let ctx = TestContext::new("no_relocation");
    ctx.write_config("\n[media]\nrelocate = false\n");
    ctx.suite("tests/shot.robot", &["screenshot shot.png"]);

    let output = ctx.run(&["tests"]);

    assert_eq!(output.code, Some(0), "{:?}", output);
    assert!(!ctx.results().join("tests.shot.robot.shot.png").exists());
    assert!(ctx.results().join("tests.shot.robot/shot.png").exists());
}

#[test]
fn test_options_are_forwarded_and_outputdir_is_taken() {
    let ctx = TestContext::new("forwarding");
    ctx.suite("tests/a.robot", &[]);

    let output = ctx.run(&[
        "--variable",
        "ENV:ci",
        "--output",
        "mine.xml",
        "-d",
        "out",
        "tests",
    ]);

    assert_eq!(output.code, Some(0), "{:?}", output);
    assert!(output.stderr.contains("--output"), "{}", output.stderr);

    let out = ctx.workdir.join("out");
    assert!(out.join("output.xml").exists());
    assert!(!ctx.results().exists());

    let engine_stdout = read(&out.join("tests.a.robot/stdout.txt"));
    assert!(engine_stdout.contains("--variable ENV:ci"), "{}", engine_stdout);
    assert!(!engine_stdout.contains("mine.xml"));
    assert!(engine_stdout.contains("--output=result.xml"));
}

#[test]
fn test_previous_results_are_removed() {
    let ctx = TestContext::new("clean_results");
    ctx.suite("tests/a.robot", &[]);
    fs::create_dir_all(ctx.results().join("stale.robot")).unwrap();

    let output = ctx.run(&["tests"]);

    assert_eq!(output.code, Some(0), "{:?}", output);
    assert!(!ctx.results().join("stale.robot").exists());
}

#[test]
fn test_heartbeat_for_long_suites() {
    let ctx = TestContext::new("heartbeat");
    // replace the disabled heartbeat with a one-second one
    let config = read(&ctx.workdir.join("asyncro.toml"))
        .replace("first_secs = 0", "first_secs = 1\nstep_secs = 1");
    fs::write(ctx.workdir.join("asyncro.toml"), config).unwrap();
    ctx.suite("tests/slow.robot", &["sleep 1600"]);

    let output = ctx.run(&["tests"]);

    assert_eq!(output.code, Some(0), "{:?}", output);
    assert!(
        output.stdout.contains("still running tests.slow.robot after"),
        "{}",
        output.stdout
    );
}

#[test]
fn test_datasource_without_marker_is_fatal() {
    let ctx = TestContext::new("no_marker");
    ctx.suite("suites/a.robot", &[]);

    let output = ctx.run(&["suites"]);

    assert_eq!(output.code, Some(1));
    assert!(output.stderr.contains("Error: Datasource 'suites'"), "{}", output.stderr);
    assert!(!ctx.results().exists());
}

#[test]
fn test_missing_datasource_argument_is_fatal() {
    let ctx = TestContext::new("no_datasource");

    let output = ctx.run(&["--n=2"]);

    assert_eq!(output.code, Some(1));
    assert!(output.stderr.contains("No tests path provided"), "{}", output.stderr);
}

#[test]
fn test_invalid_worker_count_is_fatal() {
    let ctx = TestContext::new("bad_workers");

    let output = ctx.run(&["--n=0", "tests"]);

    assert_eq!(output.code, Some(1));
    assert!(output.stderr.contains("Invalid worker count '0'"), "{}", output.stderr);
}

#[test]
fn test_failed_discovery_schedules_nothing() {
    let ctx = TestContext::new("failed_discovery");

    let output = ctx.run(&["tests/missing.robot"]);

    assert_eq!(output.code, Some(1));
    assert!(output.stderr.contains("Suite discovery failed"), "{}", output.stderr);
    assert!(!output.stdout.contains("Started"));
}

#[test]
fn test_results_dir_holding_test_data_is_not_cleaned() {
    let ctx = TestContext::new("results_in_tests");
    ctx.suite("tests/a.robot", &[]);

    let output = ctx.run(&["-d", "tests", "tests"]);

    assert_eq!(output.code, Some(1), "{:?}", output);
    assert!(output.stderr.contains("Refusing to clean"), "{}", output.stderr);
    assert!(ctx.workdir.join("tests/a.robot").exists());
    assert!(!output.stdout.contains("Started"));
}
