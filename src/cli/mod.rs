//! Command-line invocation
//!
//! Everything after the program name is engine syntax except the runner's
//! own `--n[=<count>]`. Tokens are split into the worker count, the engine
//! option set and the datasources, then checked before anything is spawned.

use std::path::PathBuf;

use tracing::warn;

use crate::common::config::RunConfig;
use crate::common::{Error, Result};
use crate::options::OptionSet;

/// Prefix of the worker-count option
const WORKERS_OPTION: &str = "--n";

/// Smallest default pool size, even on a single-core machine
const MIN_DEFAULT_WORKERS: usize = 2;

/// A validated run request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub workers: usize,
    /// Engine options forwarded to the dry run and every suite
    pub options: OptionSet,
    pub datasources: Vec<String>,
    /// Results folder, relative to the working directory unless absolute
    pub results_dir: PathBuf,
}

impl Invocation {
    /// Parse raw command-line tokens (without the program name)
    pub fn parse<I, S>(tokens: I, run: &RunConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut workers = None;
        let mut engine_tokens = Vec::new();
        let mut tokens = tokens.into_iter().map(Into::into);

        while let Some(token) = tokens.next() {
            if token == "--" {
                engine_tokens.push(token);
                engine_tokens.extend(tokens.by_ref());
                break;
            }
            if token == WORKERS_OPTION {
                // bare `--n` keeps the default count
            } else if let Some(value) = token
                .strip_prefix(WORKERS_OPTION)
                .and_then(|rest| rest.strip_prefix('='))
            {
                workers = Some(parse_workers(value)?);
            } else {
                engine_tokens.push(token);
            }
        }

        let parsed = OptionSet::parse(engine_tokens)?;
        check_datasources(&parsed.datasources, &run.datasource_marker)?;

        let mut options = parsed.options;
        let results_dir = options.take_results_dir(&run.results_dir);
        let reserved = options.remove_reserved();
        if !reserved.is_empty() {
            warn!(
                "Ignoring option(s) set by the runner itself: {}",
                reserved
                    .iter()
                    .map(|name| format!("--{name}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        Ok(Self {
            workers: workers.or(run.workers).unwrap_or_else(default_workers),
            options,
            datasources: parsed.datasources,
            results_dir,
        })
    }
}

fn parse_workers(value: &str) -> Result<usize> {
    match value.trim().parse::<usize>() {
        Ok(count) if count > 0 => Ok(count),
        _ => Err(Error::InvalidWorkerCount(value.to_string())),
    }
}

fn check_datasources(datasources: &[String], marker: &str) -> Result<()> {
    if datasources.is_empty() {
        return Err(Error::NoDatasource);
    }
    let marker_lower = marker.to_lowercase();
    match datasources
        .iter()
        .find(|source| !source.to_lowercase().contains(&marker_lower))
    {
        Some(source) => Err(Error::not_a_test_path(source, marker)),
        None => Ok(()),
    }
}

/// One worker per available core, at least [`MIN_DEFAULT_WORKERS`]
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(MIN_DEFAULT_WORKERS)
}
