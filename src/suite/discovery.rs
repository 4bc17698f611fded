//! Suite discovery through an engine dry run
//!
//! The engine expands the datasources and writes a manifest (`suites.xml`)
//! without running anything. Every `suite` element whose `source` carries
//! the suite extension is a leaf suite; directory suites are skipped.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::{debug, info, warn};
use xmltree::{Element, XMLNode};

use super::Suite;
use crate::common::paths::MANIFEST_FILE;
use crate::common::{has_extension, Error, Result};
use crate::engine::{dry_run_args, EngineCommand};

/// Lowest engine exit status reserved for usage or internal errors.
/// Lower nonzero statuses count failed tests, which a dry run may report.
pub const FATAL_STATUS: i32 = 251;

/// Removes the manifest when discovery finishes, whatever the outcome
struct ManifestGuard {
    path: PathBuf,
}

impl ManifestGuard {
    fn new(path: PathBuf) -> Self {
        let _ = std::fs::remove_file(&path);
        Self { path }
    }
}

impl Drop for ManifestGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove manifest {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Run the dry run and return the leaf suites in manifest order
pub async fn discover(
    engine: &EngineCommand,
    workdir: &Path,
    options: &[String],
    datasources: &[String],
    extension: &str,
) -> Result<Vec<Suite>> {
    let manifest = ManifestGuard::new(workdir.join(MANIFEST_FILE));

    debug!("Dry run: {} {:?} {:?}", engine.describe(), options, datasources);
    let status = engine
        .command(workdir)
        .args(dry_run_args(&manifest.path, options, datasources))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| Error::engine_spawn(engine.program(), e))?;

    match status.code() {
        Some(0) => {}
        Some(code) if code >= FATAL_STATUS => {
            return Err(Error::DiscoveryFailed(format!(
                "dry run exited with status {}",
                code
            )));
        }
        Some(code) => warn!("Dry run reported {} failing test(s); continuing", code),
        None => {
            return Err(Error::DiscoveryFailed(
                "dry run was terminated by a signal".to_string(),
            ));
        }
    }

    if !manifest.path.exists() {
        return Err(Error::DiscoveryFailed(format!(
            "dry run did not write {}",
            manifest.path.display()
        )));
    }

    let suites = parse_manifest(&manifest.path, workdir, extension)?;
    info!("Discovered {} suite(s)", suites.len());
    Ok(suites)
}

/// Parse a manifest file into suites keyed relative to `workdir`
pub fn parse_manifest(path: &Path, workdir: &Path, extension: &str) -> Result<Vec<Suite>> {
    let content = std::fs::read(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    let root = Element::parse(content.as_slice()).map_err(|e| Error::xml_parse(path, e))?;

    let mut seen = HashSet::new();
    let mut sources = Vec::new();
    collect_leaf_sources(&root, extension, &mut sources);

    Ok(sources
        .into_iter()
        .map(|source| {
            if source.is_relative() {
                workdir.join(source)
            } else {
                source
            }
        })
        .filter(|source| seen.insert(source.clone()))
        .map(|source| Suite::new(source, workdir))
        .collect())
}

fn collect_leaf_sources(element: &Element, extension: &str, out: &mut Vec<PathBuf>) {
    if element.name == "suite" {
        if let Some(source) = element.attributes.get("source") {
            let source = PathBuf::from(source);
            if has_extension(&source, &[extension]) {
                out.push(source);
            }
        }
    }

    for child in &element.children {
        if let XMLNode::Element(child) = child {
            collect_leaf_sources(child, extension, out);
        }
    }
}
