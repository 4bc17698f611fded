//! Common utilities shared by every stage of a run

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};

/// Whether `path` carries one of `extensions` (case-insensitive, no dot)
pub fn has_extension<S: AsRef<str>>(path: &std::path::Path, extensions: &[S]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|candidate| candidate.as_ref().eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
