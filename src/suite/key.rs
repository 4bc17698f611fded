//! Suite folder keys
//!
//! A suite's results live under a flat directory named after its path
//! relative to the working directory, with separators replaced by `.`:
//! `<workdir>/tests/login/admin.robot` -> `tests.login.admin.robot`.
//! Dots already present in file names are not escaped.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path};

/// Delimiter replacing path separators in a key
pub const KEY_DELIMITER: char = '.';

/// Flattened, filesystem-safe identity of one suite
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SuiteKey(String);

impl SuiteKey {
    /// Derive the key of `suite` relative to `workdir`
    ///
    /// Paths outside `workdir` keep all of their normal components.
    pub fn derive(suite: &Path, workdir: &Path) -> Self {
        let relative = suite.strip_prefix(workdir).unwrap_or(suite);
        let parts: Vec<_> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect();
        Self(parts.join(&KEY_DELIMITER.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Media file name relocated into the results root
    pub fn prefixed(&self, file_name: &str) -> String {
        format!("{}{}{}", self.0, KEY_DELIMITER, file_name)
    }

    /// Whether `file_name` already carries this key's prefix
    pub fn is_prefix_of(&self, file_name: &str) -> bool {
        file_name
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with(KEY_DELIMITER))
    }
}

impl fmt::Display for SuiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SuiteKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Keys shared by more than one suite, with the colliding sources
pub fn collisions<'a, I>(suites: I) -> Vec<(&'a SuiteKey, Vec<&'a Path>)>
where
    I: IntoIterator<Item = (&'a SuiteKey, &'a Path)>,
{
    let mut by_key: HashMap<&SuiteKey, Vec<&Path>> = HashMap::new();
    for (key, source) in suites {
        by_key.entry(key).or_default().push(source);
    }
    let mut dupes: Vec<_> = by_key.into_iter().filter(|(_, v)| v.len() > 1).collect();
    dupes.sort_by(|a, b| a.0.cmp(b.0));
    dupes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[cfg(unix)]
    #[test]
    fn test_derive_strips_workdir() {
        let key = SuiteKey::derive(
            Path::new("/work/tests/login/admin.robot"),
            Path::new("/work"),
        );
        assert_eq!(key.as_str(), "tests.login.admin.robot");
    }

    #[cfg(unix)]
    #[test]
    fn test_derive_outside_workdir() {
        let key = SuiteKey::derive(Path::new("/other/tests/a.robot"), Path::new("/work"));
        assert_eq!(key.as_str(), "other.tests.a.robot");
    }

    #[cfg(unix)]
    #[test]
    fn test_prefix_is_component_wise() {
        // "/work2" must not be treated as being inside "/work"
        let key = SuiteKey::derive(Path::new("/work2/tests/a.robot"), Path::new("/work"));
        assert_eq!(key.as_str(), "work2.tests.a.robot");
    }

    #[test]
    fn test_derive_is_stable() {
        let workdir = std::env::temp_dir();
        let suite: PathBuf = workdir.join("tests").join("nested").join("b.robot");
        let at_discovery = SuiteKey::derive(&suite, &workdir);
        let at_merge = SuiteKey::derive(&suite, &workdir);
        assert_eq!(at_discovery, at_merge);
        assert_eq!(at_discovery.as_str(), "tests.nested.b.robot");
    }

    #[test]
    fn test_prefixed_and_is_prefix_of() {
        let key = SuiteKey("tests.a.robot".to_string());
        let name = key.prefixed("shot-1.png");
        assert_eq!(name, "tests.a.robot.shot-1.png");
        assert!(key.is_prefix_of(&name));
        assert!(!key.is_prefix_of("shot-1.png"));
        assert!(!key.is_prefix_of("tests.a.robotics.png"));
    }

    #[test]
    fn test_collisions() {
        let a = SuiteKey("tests.a.b.robot".to_string());
        let b = SuiteKey("tests.a.b.robot".to_string());
        let c = SuiteKey("tests.c.robot".to_string());
        let pa = PathBuf::from("tests/a/b.robot");
        let pb = PathBuf::from("tests/a.b.robot");
        let pc = PathBuf::from("tests/c.robot");

        let dupes = collisions([
            (&a, pa.as_path()),
            (&b, pb.as_path()),
            (&c, pc.as_path()),
        ]);
        assert_eq!(dupes.len(), 1);
        assert_eq!(dupes[0].0.as_str(), "tests.a.b.robot");
        assert_eq!(dupes[0].1.len(), 2);
    }
}
