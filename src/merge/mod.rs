//! Result merging
//!
//! Once the pool is drained, every suite's `result.xml` is handed to the
//! merge tool in one invocation, producing the aggregate report in the
//! results root. Media relocation runs first so the aggregate can find the
//! screenshots its messages reference.

pub mod media;

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::{debug, info, warn};

use crate::common::config::MediaConfig;
use crate::common::paths::{self, AGGREGATE_FILE};
use crate::common::{Error, Result};
use crate::engine::{merge_args, EngineCommand};
use crate::suite::Suite;
pub use media::Relocation;

/// What the merge step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Number of result documents handed to the merge tool
    pub merged: usize,
    /// Exit status of the merge tool; `None` when killed by a signal
    pub status: Option<i32>,
    /// Path of the aggregate report
    pub output: PathBuf,
}

/// Merges the per-suite results of one run
pub struct Merger {
    tool: EngineCommand,
    workdir: PathBuf,
    results_dir: PathBuf,
    report_name: String,
}

impl Merger {
    pub fn new(
        tool: EngineCommand,
        workdir: impl Into<PathBuf>,
        results_dir: impl Into<PathBuf>,
        report_name: impl Into<String>,
    ) -> Self {
        Self {
            tool,
            workdir: workdir.into(),
            results_dir: results_dir.into(),
            report_name: report_name.into(),
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Relocate media for every suite that produced a result
    ///
    /// A suite whose media cannot be relocated is logged and skipped; the
    /// others are still processed.
    pub fn relocate_media(&self, suites: &[Suite], media: &MediaConfig) -> Relocation {
        let mut total = Relocation::default();

        for suite in suites {
            let suite_dir = paths::suite_dir(&self.results_dir, suite.key.as_str());
            if !suite_dir.join(paths::RESULT_FILE).is_file() {
                continue;
            }
            match media::relocate_suite(&suite_dir, &suite.key, &self.results_dir, &media.extensions)
            {
                Ok(done) => {
                    total.files_copied += done.files_copied;
                    total.references_rewritten += done.references_rewritten;
                }
                Err(e) => warn!("Could not relocate media of {}: {}", suite.key, e),
            }
        }

        if total.files_copied > 0 {
            info!(
                "Relocated {} media file(s), rewrote {} reference(s)",
                total.files_copied, total.references_rewritten
            );
        }
        total
    }

    /// Result documents that exist on disk, in suite order
    pub fn result_paths(&self, suites: &[Suite]) -> Vec<PathBuf> {
        suites
            .iter()
            .filter_map(|suite| {
                let path = paths::suite_result(&self.results_dir, suite.key.as_str());
                if path.is_file() {
                    Some(path)
                } else {
                    warn!("No result for suite {} (expected {})", suite.key, path.display());
                    None
                }
            })
            .collect()
    }

    /// Run the merge tool over all existing suite results
    ///
    /// The tool runs even when no result exists, so a run always leaves an
    /// aggregate behind. A nonzero tool status only means the merged
    /// results contain failures; it is reported, not treated as an error.
    pub async fn merge(&self, suites: &[Suite]) -> Result<MergeReport> {
        let results = self.result_paths(suites);
        let output = self.results_dir.join(AGGREGATE_FILE);

        debug!(
            "Merging {} result(s) with {}",
            results.len(),
            self.tool.describe()
        );
        let status = self
            .tool
            .command(&self.workdir)
            .args(merge_args(
                &self.results_dir,
                &self.report_name,
                AGGREGATE_FILE,
                &results,
            ))
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| Error::engine_spawn(self.tool.program(), e))?;

        match status.code() {
            Some(0) => {}
            Some(code) => warn!("Merge tool exited with status {}", code),
            None => {
                return Err(Error::MergeFailed(format!(
                    "{} was terminated by a signal",
                    self.tool.program().display()
                )))
            }
        }

        Ok(MergeReport {
            merged: results.len(),
            status: status.code(),
            output,
        })
    }
}
