//! Engine command-line grammar
//!
//! Kinds of the engine's options, used both to parse raw tokens and to decide
//! how a value is written back out. Names are the canonical lowercase long
//! names; matching is case-insensitive.

/// How an option carries its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Present or not (`--dryrun`), negatable as `--no<name>`
    Flag,
    /// Single value, last occurrence wins (`--name Suite`)
    Value,
    /// Repeatable, occurrences accumulate in order (`--include smoke`)
    List,
}

/// One known engine option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    pub name: &'static str,
    pub short: Option<char>,
    pub kind: OptionKind,
}

const fn flag(name: &'static str, short: Option<char>) -> OptionSpec {
    OptionSpec {
        name,
        short,
        kind: OptionKind::Flag,
    }
}

const fn value(name: &'static str, short: Option<char>) -> OptionSpec {
    OptionSpec {
        name,
        short,
        kind: OptionKind::Value,
    }
}

const fn list(name: &'static str, short: Option<char>) -> OptionSpec {
    OptionSpec {
        name,
        short,
        kind: OptionKind::List,
    }
}

/// Options accepted by the engine and forwarded to it
pub const ENGINE_OPTIONS: &[OptionSpec] = &[
    // Execution
    flag("rpa", None),
    flag("dryrun", None),
    flag("exitonfailure", Some('X')),
    flag("exitonerror", None),
    flag("skipteardownonexit", None),
    flag("runemptysuite", None),
    flag("nostatusrc", None),
    value("randomize", None),
    value("language", None),
    value("extension", Some('F')),
    list("parser", None),
    list("parseinclude", None),
    list("argumentfile", Some('A')),
    list("pythonpath", Some('P')),
    list("listener", None),
    list("prerunmodifier", None),
    list("prerebotmodifier", None),
    // Selection
    list("test", Some('t')),
    list("task", None),
    list("suite", Some('s')),
    list("include", Some('i')),
    list("exclude", Some('e')),
    list("skip", None),
    list("skiponfailure", None),
    value("rerunfailed", Some('R')),
    value("rerunfailedsuites", Some('S')),
    // Data
    value("name", Some('N')),
    value("doc", Some('D')),
    list("metadata", Some('M')),
    list("settag", Some('G')),
    list("variable", Some('v')),
    list("variablefile", Some('V')),
    // Output
    value("outputdir", Some('d')),
    value("output", Some('o')),
    value("log", Some('l')),
    value("report", Some('r')),
    value("xunit", Some('x')),
    value("debugfile", Some('b')),
    flag("timestampoutputs", Some('T')),
    flag("splitlog", None),
    flag("legacyoutput", None),
    value("logtitle", None),
    value("reporttitle", None),
    value("reportbackground", None),
    value("loglevel", Some('L')),
    value("suitestatlevel", None),
    value("maxerrorlines", None),
    value("maxassignlength", None),
    list("tagstatinclude", None),
    list("tagstatexclude", None),
    list("tagstatcombine", None),
    list("tagdoc", None),
    list("tagstatlink", None),
    list("expandkeywords", None),
    list("removekeywords", None),
    list("flattenkeywords", None),
    // Console
    value("console", None),
    flag("dotted", Some('.')),
    flag("quiet", None),
    value("consolewidth", Some('W')),
    value("consolecolors", Some('C')),
    value("consolelinks", None),
    value("consolemarkers", Some('K')),
];

/// Find an option by long name (case-insensitive)
pub fn lookup(name: &str) -> Option<&'static OptionSpec> {
    ENGINE_OPTIONS
        .iter()
        .find(|spec| spec.name.eq_ignore_ascii_case(name))
}

/// Find an option by its short alias (case-sensitive, as `-v` and `-V` differ)
pub fn lookup_short(short: char) -> Option<&'static OptionSpec> {
    ENGINE_OPTIONS.iter().find(|spec| spec.short == Some(short))
}

/// Resolve `--no<flag>` to the flag it negates
pub fn negated_flag(name: &str) -> Option<&'static OptionSpec> {
    let lower = name.to_ascii_lowercase();
    let base = lower.strip_prefix("no")?;
    lookup(base).filter(|spec| spec.kind == OptionKind::Flag)
}
