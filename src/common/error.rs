//! Error types for the suite runner
//!
//! Messages are meant to be read by whoever launched the run, so they name
//! the offending path or option and, where it helps, what to do about it.

use std::io;
use std::path::Path;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the suite runner
#[derive(Error, Debug)]
pub enum Error {
    // === Invocation Errors ===
    #[error("No tests path provided. Pass at least one datasource, e.g. 'asyncro tests/'")]
    NoDatasource,

    #[error("Datasource '{path}' does not look like a tests path (expected '{marker}' in the path)")]
    NotATestPath { path: String, marker: String },

    #[error("Invalid worker count '{0}': expected a positive integer")]
    InvalidWorkerCount(String),

    #[error("Option '{0}' requires a value")]
    MissingOptionValue(String),

    #[error("Unknown option '{0}'")]
    UnknownOption(String),

    // === Engine Errors ===
    #[error("Executable '{name}' not found. Searched: {searched}")]
    EngineNotFound { name: String, searched: String },

    #[error("Failed to start '{program}': {source}")]
    EngineSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    // === Discovery Errors ===
    #[error("Suite discovery failed: {0}")]
    DiscoveryFailed(String),

    #[error("Failed to parse XML '{path}': {error}")]
    XmlParse { path: String, error: String },

    #[error("Failed to write XML '{path}': {error}")]
    XmlWrite { path: String, error: String },

    // === Merge Errors ===
    #[error("Result merge failed: {0}")]
    MergeFailed(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a datasource error for a path missing the tests marker
    pub fn not_a_test_path(path: &str, marker: &str) -> Self {
        Self::NotATestPath {
            path: path.to_string(),
            marker: marker.to_string(),
        }
    }

    /// Create an engine not found error with search paths
    pub fn engine_not_found<S: AsRef<str>>(name: &str, paths: &[S]) -> Self {
        Self::EngineNotFound {
            name: name.to_string(),
            searched: paths.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(", "),
        }
    }

    /// Create a spawn error for an external program
    pub fn engine_spawn(program: &Path, source: io::Error) -> Self {
        Self::EngineSpawn {
            program: program.display().to_string(),
            source,
        }
    }

    /// Create an XML parse error
    pub fn xml_parse(path: &Path, error: impl std::fmt::Display) -> Self {
        Self::XmlParse {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Create an XML write error
    pub fn xml_write(path: &Path, error: impl std::fmt::Display) -> Self {
        Self::XmlWrite {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}
