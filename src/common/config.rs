//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// External engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Run layout and pool settings
    #[serde(default)]
    pub run: RunConfig,

    /// Liveness notices for long-running suites
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// Media relocation settings
    #[serde(default)]
    pub media: MediaConfig,
}

/// External engine and merge tool commands
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Engine program followed by leading arguments
    #[serde(default = "default_engine")]
    pub command: Vec<String>,

    /// Merge tool program followed by leading arguments
    #[serde(default = "default_merge")]
    pub merge_command: Vec<String>,

    /// Extension of leaf suite files
    #[serde(default = "default_suite_extension")]
    pub suite_extension: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: default_engine(),
            merge_command: default_merge(),
            suite_extension: default_suite_extension(),
        }
    }
}

fn default_engine() -> Vec<String> {
    vec!["robot".to_string()]
}
fn default_merge() -> Vec<String> {
    vec!["rebot".to_string()]
}
fn default_suite_extension() -> String {
    "robot".to_string()
}

/// Run settings
#[derive(Debug, Deserialize)]
pub struct RunConfig {
    /// Worker count; `--n=<count>` takes precedence
    #[serde(default)]
    pub workers: Option<usize>,

    /// Results directory used when no `-d`/`--outputdir` is given
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Remove an existing results directory before the run
    #[serde(default = "default_true")]
    pub clean_results: bool,

    /// Substring every datasource must contain (case-insensitive)
    #[serde(default = "default_marker")]
    pub datasource_marker: String,

    /// Top-level suite name of the aggregate report
    #[serde(default = "default_report_name")]
    pub report_name: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: None,
            results_dir: default_results_dir(),
            clean_results: true,
            datasource_marker: default_marker(),
            report_name: default_report_name(),
        }
    }
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}
fn default_true() -> bool {
    true
}
fn default_marker() -> String {
    "test".to_string()
}
fn default_report_name() -> String {
    "Tests".to_string()
}

/// Heartbeat settings in seconds
#[derive(Debug, Deserialize)]
pub struct HeartbeatConfig {
    /// First notice after this long
    #[serde(default = "default_first")]
    pub first_secs: u64,

    /// Each following gap is this much longer than the previous one
    #[serde(default = "default_step")]
    pub step_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            first_secs: default_first(),
            step_secs: default_step(),
        }
    }
}

fn default_first() -> u64 {
    15
}
fn default_step() -> u64 {
    5
}

impl HeartbeatConfig {
    pub fn first(&self) -> Duration {
        Duration::from_secs(self.first_secs)
    }

    pub fn step(&self) -> Duration {
        Duration::from_secs(self.step_secs)
    }
}

/// Media relocation settings
#[derive(Debug, Deserialize)]
pub struct MediaConfig {
    /// Copy media into the results root and rewrite references
    #[serde(default = "default_true")]
    pub relocate: bool,

    /// File extensions treated as media
    #[serde(default = "default_media_extensions")]
    pub extensions: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            relocate: true,
            extensions: default_media_extensions(),
        }
    }
}

fn default_media_extensions() -> Vec<String> {
    vec!["png".to_string()]
}

impl Config {
    /// Load configuration for a run rooted at `workdir`
    ///
    /// Returns default configuration if no file exists
    pub fn load(workdir: &Path) -> Result<Self> {
        match config_path(workdir) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let config: Self =
            toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.engine.command.is_empty() {
            return Err(super::Error::Config("engine.command must not be empty".into()));
        }
        if self.engine.merge_command.is_empty() {
            return Err(super::Error::Config(
                "engine.merge_command must not be empty".into(),
            ));
        }
        if self.run.workers == Some(0) {
            return Err(super::Error::Config("run.workers must be at least 1".into()));
        }
        Ok(())
    }
}
