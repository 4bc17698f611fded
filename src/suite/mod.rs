//! Suites and their identities
//!
//! A suite is one leaf suite file found by the dry run. Its folder key is
//! computed once, at discovery, and travels with it to the pool and the
//! merger so every stage looks results up under the same name.

pub mod discovery;
pub mod key;

use std::path::{Path, PathBuf};

pub use discovery::discover;
pub use key::SuiteKey;

/// One leaf suite of the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suite {
    /// Absolute path of the suite file
    pub source: PathBuf,
    /// Results folder name derived from `source`
    pub key: SuiteKey,
}

impl Suite {
    pub fn new(source: PathBuf, workdir: &Path) -> Self {
        let key = SuiteKey::derive(&source, workdir);
        Self { source, key }
    }
}

/// Log a warning for every key shared by several suites
///
/// Such suites write into the same results folder; the last one to finish wins.
pub fn warn_on_collisions(suites: &[Suite]) {
    let pairs = suites.iter().map(|s| (&s.key, s.source.as_path()));
    for (key, sources) in key::collisions(pairs) {
        let sources: Vec<_> = sources.iter().map(|p| p.display().to_string()).collect();
        tracing::warn!(
            "Suites {} share the results folder '{}'",
            sources.join(", "),
            key
        );
    }
}
