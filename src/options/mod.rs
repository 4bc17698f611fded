//! Engine option set
//!
//! Raw tokens are parsed once into an [`OptionSet`] against the engine
//! grammar and translated back into an argument vector for every child
//! process. The results directory option is taken out of the set before it
//! is forwarded, since each suite gets its own output directory.

pub mod grammar;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::common::{has_extension, Error, Result};
use grammar::OptionKind;

/// Options the runner sets itself for every engine invocation
pub const RESERVED_OPTIONS: &[&str] = &["output", "log", "report"];

/// Extension marking an `--outputdir` value as a result file
const RESULT_EXTENSION: &str = "xml";

/// Value of one option; absent options have no entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Flag(bool),
    Value(String),
    Values(Vec<String>),
}

/// Sparse mapping from canonical option name to value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionSet {
    entries: BTreeMap<String, OptionValue>,
}

/// Engine options and positional datasources split out of raw tokens
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedArgs {
    pub options: OptionSet,
    pub datasources: Vec<String>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse raw engine tokens into options and datasources
    pub fn parse<I, S>(tokens: I) -> Result<ParsedArgs>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parsed = ParsedArgs::default();
        let mut tokens = tokens.into_iter().map(Into::into);

        while let Some(token) = tokens.next() {
            if token == "--" {
                parsed.datasources.extend(tokens.by_ref());
                break;
            }

            if let Some(body) = token.strip_prefix("--") {
                let (name, inline) = match body.split_once('=') {
                    Some((name, value)) => (name, Some(value.to_string())),
                    None => (body, None),
                };
                let name = name.to_ascii_lowercase();

                if let Some(spec) = grammar::lookup(&name) {
                    let value = match spec.kind {
                        OptionKind::Flag => {
                            if inline.is_some() {
                                return Err(Error::Config(format!(
                                    "Option '--{}' does not take a value",
                                    spec.name
                                )));
                            }
                            None
                        }
                        _ => Some(take_value(&token, inline, &mut tokens)?),
                    };
                    parsed.options.apply(spec.name, spec.kind, value);
                } else if let Some(spec) = grammar::negated_flag(&name).filter(|_| inline.is_none())
                {
                    parsed.options.remove(spec.name);
                } else if let Some(value) = inline {
                    parsed.options.set_value(&name, value);
                } else {
                    parsed.options.set_flag(&name, true);
                }
                continue;
            }

            if token.len() > 1 && token.starts_with('-') {
                let mut chars = token[1..].chars();
                let short = chars.next().unwrap_or('-');
                let rest: String = chars.collect();
                let spec =
                    grammar::lookup_short(short).ok_or_else(|| Error::UnknownOption(token.clone()))?;

                let value = match spec.kind {
                    OptionKind::Flag if rest.is_empty() => None,
                    OptionKind::Flag => return Err(Error::UnknownOption(token)),
                    _ if !rest.is_empty() => Some(rest),
                    _ => Some(take_value(&token, None, &mut tokens)?),
                };
                parsed.options.apply(spec.name, spec.kind, value);
                continue;
            }

            parsed.datasources.push(token);
        }

        Ok(parsed)
    }

    fn apply(&mut self, name: &str, kind: OptionKind, value: Option<String>) {
        match (kind, value) {
            (OptionKind::Flag, _) => self.set_flag(name, true),
            (OptionKind::Value, Some(value)) => self.set_value(name, value),
            (OptionKind::List, Some(value)) => self.push_value(name, value),
            (_, None) => {}
        }
    }

    /// Set a boolean option; turning it off removes the entry
    pub fn set_flag(&mut self, name: &str, on: bool) {
        if on {
            self.entries.insert(name.to_string(), OptionValue::Flag(true));
        } else {
            self.entries.remove(name);
        }
    }

    /// Set a single-valued option, replacing any previous value
    pub fn set_value(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .insert(name.to_string(), OptionValue::Value(value.into()));
    }

    /// Append to a list option
    pub fn push_value(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.get_mut(name) {
            Some(OptionValue::Values(values)) => values.push(value),
            _ => {
                self.entries
                    .insert(name.to_string(), OptionValue::Values(vec![value]));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<OptionValue> {
        self.entries.remove(name)
    }

    /// Translate into the engine's argument vector
    ///
    /// Strings become `--key value`, true flags a bare `--key`, lists one
    /// pair per element. False flags are omitted. Options the grammar does
    /// not know are written as `--key=value` so they re-parse unambiguously.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for (name, value) in &self.entries {
            let known = grammar::lookup(name).is_some();
            match value {
                OptionValue::Flag(true) => args.push(format!("--{name}")),
                OptionValue::Flag(false) => {}
                OptionValue::Value(value) => push_pair(&mut args, name, value, known),
                OptionValue::Values(values) => {
                    for value in values {
                        push_pair(&mut args, name, value, known);
                    }
                }
            }
        }
        args
    }

    /// Remove `outputdir` and derive the results folder from it
    ///
    /// A value naming a result file (`out/run.xml`) yields its parent
    /// directory; anything else is used as-is.
    pub fn take_results_dir(&mut self, default: &Path) -> PathBuf {
        match self.remove("outputdir") {
            Some(OptionValue::Value(value)) => results_folder(&value),
            Some(OptionValue::Values(values)) => values
                .last()
                .map(|v| results_folder(v))
                .unwrap_or_else(|| default.to_path_buf()),
            Some(OptionValue::Flag(_)) | None => default.to_path_buf(),
        }
    }

    /// Drop options the runner sets itself; returns the names removed
    pub fn remove_reserved(&mut self) -> Vec<String> {
        RESERVED_OPTIONS
            .iter()
            .filter(|name| self.entries.remove(**name).is_some())
            .map(|name| name.to_string())
            .collect()
    }
}

fn push_pair(args: &mut Vec<String>, name: &str, value: &str, known: bool) {
    if known {
        args.push(format!("--{name}"));
        args.push(value.to_string());
    } else {
        args.push(format!("--{name}={value}"));
    }
}

fn take_value(
    token: &str,
    inline: Option<String>,
    rest: &mut impl Iterator<Item = String>,
) -> Result<String> {
    match inline {
        Some(value) => Ok(value),
        None => rest
            .next()
            .ok_or_else(|| Error::MissingOptionValue(token.to_string())),
    }
}

fn results_folder(value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if has_extension(&path, &[RESULT_EXTENSION]) {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    } else {
        path
    }
}
