//! Configuration and run-layout paths
//!
//! Config lookup order: `$ASYNCRO_CONFIG`, `./asyncro.toml`, then the
//! platform config directory.

use std::path::{Path, PathBuf};

/// Name used for the config directory
const APP_NAME: &str = "asyncro";

/// Environment variable that points at an explicit config file
pub const CONFIG_ENV: &str = "ASYNCRO_CONFIG";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "asyncro.toml";

/// Manifest written by the dry run, relative to the working directory
pub const MANIFEST_FILE: &str = "suites.xml";

/// Per-suite result document name
pub const RESULT_FILE: &str = "result.xml";

/// Aggregate report written by the merge tool
pub const AGGREGATE_FILE: &str = "output.xml";

/// Captured console output of a suite process
pub const STDOUT_FILE: &str = "stdout.txt";
pub const STDERR_FILE: &str = "stderr.txt";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/asyncro/`
/// - macOS: `~/Library/Application Support/asyncro/`
/// - Windows: `%APPDATA%\asyncro\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the user configuration file
pub fn user_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Resolve the configuration file to load, if any exists
pub fn config_path(workdir: &Path) -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(explicit));
    }

    let local = workdir.join(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    user_config_path().filter(|p| p.exists())
}

/// Absolute results directory for a run
pub fn results_dir(workdir: &Path, results: &Path) -> PathBuf {
    if results.is_absolute() {
        results.to_path_buf()
    } else {
        workdir.join(results)
    }
}

/// Directory holding one suite's result artifacts
pub fn suite_dir(results_dir: &Path, key: &str) -> PathBuf {
    results_dir.join(key)
}

/// Result document of one suite
pub fn suite_result(results_dir: &Path, key: &str) -> PathBuf {
    suite_dir(results_dir, key).join(RESULT_FILE)
}
