//! External engine invocations
//!
//! The runner never executes tests itself. It drives three command lines:
//! the dry run that lists suites, one execution per suite, and a single
//! merge of all results.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::common::paths::RESULT_FILE;
use crate::common::{Error, Result};

/// A resolved external program plus its leading arguments
#[derive(Debug, Clone)]
pub struct EngineCommand {
    program: PathBuf,
    leading: Vec<String>,
}

impl EngineCommand {
    /// Resolve `command` (program followed by leading arguments)
    ///
    /// Bare program names are looked up on `PATH`; anything containing a
    /// path separator is used as given.
    pub fn resolve(command: &[String]) -> Result<Self> {
        let (name, leading) = command
            .split_first()
            .ok_or_else(|| Error::Config("empty engine command".to_string()))?;

        let as_path = Path::new(name);
        let program = if as_path.components().count() > 1 {
            if !as_path.exists() {
                return Err(Error::engine_not_found(name, &[name.as_str()]));
            }
            as_path.to_path_buf()
        } else {
            which::which(name).map_err(|_| Error::engine_not_found(name, &search_path()))?
        };

        tracing::debug!(program = %program.display(), "resolved external command");
        Ok(Self {
            program,
            leading: leading.to_vec(),
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// A command with the leading arguments applied, run from `workdir`
    pub fn command(&self, workdir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading)
            .current_dir(workdir)
            .stdin(Stdio::null());
        cmd
    }

    /// Human-readable form for logs
    pub fn describe(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.leading.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn search_path() -> Vec<String> {
    std::env::var_os("PATH")
        .map(|path| {
            std::env::split_paths(&path)
                .map(|p| p.display().to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn assign(flag: &str, value: impl AsRef<OsStr>) -> OsString {
    let mut arg = OsString::from(flag);
    arg.push("=");
    arg.push(value);
    arg
}

/// `--dryrun --output=<manifest> --report=NONE --log=NONE <options> <datasources>`
pub fn dry_run_args(manifest: &Path, options: &[String], datasources: &[String]) -> Vec<OsString> {
    let mut args = vec![
        OsString::from("--dryrun"),
        assign("--output", manifest),
        OsString::from("--report=NONE"),
        OsString::from("--log=NONE"),
    ];
    args.extend(options.iter().map(OsString::from));
    if datasources.iter().any(|source| source.starts_with('-')) {
        args.push(OsString::from("--"));
    }
    args.extend(datasources.iter().map(OsString::from));
    args
}

/// `--outputdir=<dir> --output=result.xml --report=NONE --log=NONE <options> <suite>`
pub fn suite_args(output_dir: &Path, options: &[String], suite: &Path) -> Vec<OsString> {
    let mut args = vec![
        assign("--outputdir", output_dir),
        assign("--output", RESULT_FILE),
        OsString::from("--report=NONE"),
        OsString::from("--log=NONE"),
    ];
    args.extend(options.iter().map(OsString::from));
    args.push(suite.as_os_str().to_os_string());
    args
}

/// `--outputdir=<dir> --name=<name> --output=<file> <results...>`
pub fn merge_args(output_dir: &Path, name: &str, output: &str, results: &[PathBuf]) -> Vec<OsString> {
    let mut args = vec![
        assign("--outputdir", output_dir),
        assign("--name", name),
        assign("--output", output),
    ];
    args.extend(results.iter().map(|p| p.as_os_str().to_os_string()));
    args
}
