//! Execution of one suite
//!
//! A worker owns exactly one child process: it prepares the suite's output
//! directory, starts the engine on the single suite, and waits for it while
//! printing heartbeat notices.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use colored::Colorize;
use tokio::fs::File;
use tokio::process::Child;
use tokio::time::Instant;
use tracing::{debug, error};

use super::heartbeat::HeartbeatSchedule;
use super::TaskState;
use crate::common::paths::{self, STDERR_FILE, STDOUT_FILE};
use crate::common::{Error, Result};
use crate::engine::{suite_args, EngineCommand};
use crate::suite::Suite;

/// Everything a worker needs besides its suite
#[derive(Debug)]
pub struct WorkerContext {
    pub engine: EngineCommand,
    pub workdir: PathBuf,
    pub results_dir: PathBuf,
    /// Translated engine options forwarded to every suite
    pub options: Vec<String>,
    pub heartbeat: HeartbeatSchedule,
}

/// Run one suite to completion
pub async fn run_suite(ctx: Arc<WorkerContext>, suite: Suite) -> TaskState {
    let output_dir = paths::suite_dir(&ctx.results_dir, suite.key.as_str());

    let mut child = match spawn(&ctx, &suite, &output_dir).await {
        Ok(child) => child,
        Err(e) => {
            error!("Could not start suite {}: {}", suite.key, e);
            println!("{} {}", "Failed!".red().bold(), suite.key);
            return TaskState::Errored(e.to_string());
        }
    };

    let pid = child.id().unwrap_or_default();
    println!("Started [PID:{}] {}", pid, suite.key);

    match wait_with_heartbeat(&mut child, pid, &suite, ctx.heartbeat).await {
        Ok(status) => {
            if status.success() {
                println!("{} {}", "Passed!".green().bold(), suite.key);
            } else {
                println!("{} {}", "Failed!".red().bold(), suite.key);
            }
            debug!(suite = %suite.key, pid, code = ?status.code(), "suite finished");
            TaskState::Completed {
                pid,
                code: status.code(),
            }
        }
        Err(e) => {
            error!("Lost track of suite {} [PID:{}]: {}", suite.key, pid, e);
            println!("{} {}", "Failed!".red().bold(), suite.key);
            TaskState::Errored(e.to_string())
        }
    }
}

async fn spawn(ctx: &WorkerContext, suite: &Suite, output_dir: &Path) -> Result<Child> {
    tokio::fs::create_dir_all(output_dir).await?;
    let stdout = File::create(output_dir.join(STDOUT_FILE)).await?.into_std().await;
    let stderr = File::create(output_dir.join(STDERR_FILE)).await?.into_std().await;

    let mut cmd = ctx.engine.command(&ctx.workdir);
    cmd.args(suite_args(output_dir, &ctx.options, &suite.source))
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));

    // Own process group: a terminal Ctrl-C reaches the runner, not the suites
    #[cfg(unix)]
    cmd.process_group(0);

    cmd.spawn()
        .map_err(|e| Error::engine_spawn(ctx.engine.program(), e))
}

async fn wait_with_heartbeat(
    child: &mut Child,
    pid: u32,
    suite: &Suite,
    schedule: HeartbeatSchedule,
) -> io::Result<ExitStatus> {
    if !schedule.is_enabled() {
        return child.wait().await;
    }

    let started = Instant::now();
    let mut heartbeat = schedule.start();

    loop {
        tokio::select! {
            status = child.wait() => return status,
            _ = tokio::time::sleep_until(started + heartbeat.next_due()) => {
                println!(
                    "[PID:{}] still running {} after {:.1} seconds",
                    pid,
                    suite.key,
                    started.elapsed().as_secs_f64()
                );
                heartbeat.advance();
            }
        }
    }
}
