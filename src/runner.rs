//! Run orchestration
//!
//! Discovery, scheduling and merging in sequence. Only discovery and
//! setup failures abort a run; anything that goes wrong with a single
//! suite is reported and the remaining suites still run and get merged.

use std::path::{Path, PathBuf};

use colored::Colorize;
use tracing::{debug, info};

use crate::cli::Invocation;
use crate::common::config::Config;
use crate::common::paths;
use crate::common::{Error, Result};
use crate::engine::EngineCommand;
use crate::merge::{MergeReport, Merger};
use crate::pool::{HeartbeatSchedule, InterruptGuard, PoolReport, WorkerContext, WorkerPool};
use crate::suite;

/// Exit status of an interrupted run
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Counts of one finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub interrupted: bool,
}

impl RunSummary {
    pub fn from_report(report: &PoolReport) -> Self {
        let mut summary = Self {
            interrupted: report.interrupted,
            ..Self::default()
        };
        for outcome in &report.outcomes {
            if outcome.passed() {
                summary.passed += 1;
            } else if outcome.skipped() {
                summary.skipped += 1;
            } else {
                summary.failed += 1;
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    /// Process exit status for this run
    pub fn exit_code(&self) -> i32 {
        if self.interrupted {
            INTERRUPTED_EXIT_CODE
        } else if self.failed > 0 {
            1
        } else {
            0
        }
    }

    fn print(&self, merged: &MergeReport) {
        println!();
        let mut line = format!(
            "{} suite(s): {}, {}",
            self.total(),
            format!("{} passed", self.passed).green(),
            format!("{} failed", self.failed).red()
        );
        if self.skipped > 0 {
            line.push_str(&format!(", {}", format!("{} skipped", self.skipped).yellow()));
        }
        println!("{}", line);
        if self.interrupted {
            println!("{}", "Run was interrupted".yellow().bold());
        }
        println!("Output: {}", merged.output.display());
    }
}

/// Run every suite named by `invocation` from `workdir`
pub async fn run(invocation: Invocation, config: &Config, workdir: &Path) -> Result<RunSummary> {
    let engine = EngineCommand::resolve(&config.engine.command)?;
    let merge_tool = EngineCommand::resolve(&config.engine.merge_command)?;
    let forwarded = invocation.options.to_args();
    let results_dir = paths::results_dir(workdir, &invocation.results_dir);
    debug!(?forwarded, results = %results_dir.display(), "run parameters");

    let suites = suite::discover(
        &engine,
        workdir,
        &forwarded,
        &invocation.datasources,
        &config.engine.suite_extension,
    )
    .await?;
    suite::warn_on_collisions(&suites);

    let inputs: Vec<PathBuf> = invocation
        .datasources
        .iter()
        .map(|source| workdir.join(source))
        .chain(suites.iter().map(|suite| suite.source.clone()))
        .collect();
    prepare_results_dir(&results_dir, workdir, &inputs, config.run.clean_results)?;

    let pool = WorkerPool::new(
        invocation.workers,
        WorkerContext {
            engine,
            workdir: workdir.to_path_buf(),
            results_dir: results_dir.clone(),
            options: forwarded,
            heartbeat: HeartbeatSchedule::from(&config.heartbeat),
        },
    );

    let guard = InterruptGuard::install();
    let report = pool.run_until(&suites, guard.interrupted()).await;
    guard.restore();

    let merger = Merger::new(merge_tool, workdir, &results_dir, &config.run.report_name);
    if config.media.relocate {
        merger.relocate_media(&suites, &config.media);
    }
    let merged = merger.merge(&suites).await?;

    let summary = RunSummary::from_report(&report);
    summary.print(&merged);
    Ok(summary)
}

/// Make sure the results directory exists, emptying it first if asked to
///
/// Cleaning is refused when the results directory holds the working
/// directory or any of `inputs` (datasources and suite files).
fn prepare_results_dir(
    results_dir: &Path,
    workdir: &Path,
    inputs: &[PathBuf],
    clean: bool,
) -> Result<()> {
    if clean && results_dir.exists() {
        let results = results_dir.canonicalize()?;
        let workdir = workdir.canonicalize()?;
        if workdir.starts_with(&results) {
            return Err(Error::Config(format!(
                "Refusing to clean results directory '{}': it contains the working directory",
                results.display()
            )));
        }
        // inputs that do not exist cannot be lost
        if let Some(input) = inputs
            .iter()
            .filter_map(|input| input.canonicalize().ok())
            .find(|input| input.starts_with(&results))
        {
            return Err(Error::Config(format!(
                "Refusing to clean results directory '{}': it contains test data '{}'",
                results.display(),
                input.display()
            )));
        }
        info!("Removing previous results in {}", results_dir.display());
        std::fs::remove_dir_all(results_dir)?;
    }
    std::fs::create_dir_all(results_dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{SuiteOutcome, TaskState};
    use crate::suite::Suite;

    fn outcome(name: &str, state: TaskState) -> SuiteOutcome {
        let workdir = Path::new("/work");
        SuiteOutcome {
            suite: Suite::new(workdir.join("tests").join(name), workdir),
            state,
        }
    }

    #[test]
    fn test_summary_counts_and_exit_codes() {
        let report = PoolReport {
            outcomes: vec![
                outcome("a.robot", TaskState::Completed { pid: 1, code: Some(0) }),
                outcome("b.robot", TaskState::Completed { pid: 2, code: Some(3) }),
                outcome("c.robot", TaskState::Errored("gone".into())),
                outcome("d.robot", TaskState::Skipped),
            ],
            interrupted: false,
        };
        let summary = RunSummary::from_report(&report);
        assert_eq!(
            summary,
            RunSummary {
                passed: 1,
                failed: 2,
                skipped: 1,
                interrupted: false
            }
        );
        assert_eq!(summary.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_policy() {
        assert_eq!(RunSummary::default().exit_code(), 0);
        let passed = RunSummary {
            passed: 3,
            ..RunSummary::default()
        };
        assert_eq!(passed.exit_code(), 0);
        let interrupted = RunSummary {
            passed: 3,
            failed: 1,
            interrupted: true,
            ..RunSummary::default()
        };
        assert_eq!(interrupted.exit_code(), INTERRUPTED_EXIT_CODE);
    }

    #[test]
    fn test_prepare_results_dir_cleans_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");
        std::fs::create_dir_all(results.join("old.suite")).unwrap();

        prepare_results_dir(&results, dir.path(), &[], true).unwrap();
        assert!(results.is_dir());
        assert!(!results.join("old.suite").exists());
    }

    #[test]
    fn test_prepare_results_dir_keeps_previous_run_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");
        std::fs::create_dir_all(results.join("old.suite")).unwrap();

        prepare_results_dir(&results, dir.path(), &[], false).unwrap();
        assert!(results.join("old.suite").exists());
    }

    #[test]
    fn test_prepare_results_dir_refuses_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path().join("project");
        std::fs::create_dir_all(&workdir).unwrap();

        assert!(matches!(
            prepare_results_dir(&workdir, &workdir, &[], true),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            prepare_results_dir(dir.path(), &workdir, &[], true),
            Err(Error::Config(_))
        ));
        assert!(workdir.exists());
    }

    #[test]
    fn test_prepare_results_dir_refuses_test_data() {
        let dir = tempfile::tempdir().unwrap();
        let tests = dir.path().join("tests");
        std::fs::create_dir_all(&tests).unwrap();
        std::fs::write(tests.join("a.robot"), "").unwrap();

        let err = prepare_results_dir(&tests, dir.path(), &[tests.join("a.robot")], true);
        assert!(matches!(err, Err(Error::Config(ref msg)) if msg.contains("test data")));
        assert!(tests.join("a.robot").exists());

        // a sibling results folder is fine
        let results = dir.path().join("results");
        std::fs::create_dir_all(&results).unwrap();
        prepare_results_dir(&results, dir.path(), &[tests.join("a.robot")], true).unwrap();
        assert!(tests.join("a.robot").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_refuses_results_dir_inside_datasource() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path();
        std::fs::create_dir_all(workdir.join("tests")).unwrap();
        std::fs::write(workdir.join("tests/a.robot"), "").unwrap();

        let engine = r#"printf '<robot><suite name="Tests" source="tests"><suite name="A" source="tests/a.robot"/></suite></robot>' > "${2#--output=}""#;
        let mut config = Config::default();
        config.engine.command = vec!["sh".into(), "-c".into(), engine.into(), "robot".into()];
        config.engine.merge_command = vec!["true".into()];

        let invocation = Invocation::parse(["-d", "tests", "tests"], &config.run).unwrap();
        let err = run(invocation, &config, workdir).await.unwrap_err();

        assert!(matches!(err, Error::Config(_)), "{err}");
        assert!(workdir.join("tests/a.robot").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_pipeline_with_shell_engines() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path();
        std::fs::create_dir_all(workdir.join("tests")).unwrap();

        let engine = r#"case "$1" in
  --dryrun)
    printf '<robot><suite name="Tests" source="tests"><suite name="A" source="tests/a.robot"/><suite name="B" source="tests/b.robot"/></suite></robot>' > "${2#--output=}"
    ;;
  *)
    for last; do :; done
    printf '<robot/>' > "${1#--outputdir=}/result.xml"
    case "$last" in *b.robot) exit 1;; esac
    ;;
esac"#;
        let merge = r#"printf '%s\n' "$@" > "${1#--outputdir=}/output.xml""#;

        let mut config = Config::default();
        config.engine.command = vec!["sh".into(), "-c".into(), engine.into(), "robot".into()];
        config.engine.merge_command = vec!["sh".into(), "-c".into(), merge.into(), "rebot".into()];
        config.heartbeat.first_secs = 0;

        let invocation = Invocation::parse(["--n=2", "tests"], &config.run).unwrap();
        let summary = run(invocation, &config, workdir).await.unwrap();

        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.exit_code(), 1);
        assert!(!workdir.join(paths::MANIFEST_FILE).exists());

        let merged = std::fs::read_to_string(workdir.join("results/output.xml")).unwrap();
        assert!(merged.contains("tests.a.robot/result.xml"));
        assert!(merged.contains("tests.b.robot/result.xml"));
    }
}
