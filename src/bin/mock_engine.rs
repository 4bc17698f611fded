//! Mock test engine for integration testing
//!
//! Implements the three command-line contracts the runner relies on, so
//! the whole pipeline can be exercised without a real engine installed:
//!
//! - `mock_engine run --dryrun --output=<manifest> ... <datasources>`
//!   writes a suite manifest for every `.robot` file found
//! - `mock_engine run --outputdir=<dir> --output=<file> ... <suite>`
//!   executes one suite file (see [`Directive`]) and writes its result
//! - `mock_engine rebot --outputdir=<dir> --name=<name> --output=<file> <results...>`
//!   combines result documents into one aggregate
//!
//! Suite files contain one directive per line:
//! `sleep <ms>`, `exit <code>`, `screenshot <file>`, `exclusive <dir>`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use xmltree::{Element, EmitterConfig, XMLNode};

/// Options whose value is the following token
const VALUE_OPTIONS: &[&str] = &[
    "--include",
    "--exclude",
    "--variable",
    "--test",
    "--suite",
    "-i",
    "-e",
    "-v",
    "-t",
    "-s",
];

/// Status for a datasource that does not exist
const DATA_ERROR: i32 = 252;

fn main() {
    let mut args = std::env::args().skip(1);
    let mode = args.next().unwrap_or_default();
    let args = Args::parse(args);

    // visible in the suite's captured stdout
    println!("mock_engine {} {}", mode, args.raw.join(" "));

    let code = match (mode.as_str(), args.dryrun) {
        ("run", true) => dry_run(&args),
        ("run", false) => run_suite(&args),
        ("rebot", _) => rebot(&args),
        _ => {
            eprintln!("usage: mock_engine run|rebot [options] <paths>");
            DATA_ERROR
        }
    };
    std::process::exit(code);
}

#[derive(Default)]
struct Args {
    raw: Vec<String>,
    dryrun: bool,
    outputdir: Option<PathBuf>,
    output: Option<String>,
    name: Option<String>,
    paths: Vec<PathBuf>,
}

impl Args {
    fn parse(mut tokens: impl Iterator<Item = String>) -> Self {
        let mut args = Args::default();

        while let Some(token) = tokens.next() {
            args.raw.push(token.clone());
            if let Some((name, value)) = token.split_once('=') {
                match name {
                    "--outputdir" => args.outputdir = Some(PathBuf::from(value)),
                    "--output" => args.output = Some(value.to_string()),
                    "--name" => args.name = Some(value.to_string()),
                    _ => {}
                }
            } else if token == "--dryrun" {
                args.dryrun = true;
            } else if VALUE_OPTIONS.contains(&token.as_str()) {
                if let Some(value) = tokens.next() {
                    args.raw.push(value);
                }
            } else if !token.starts_with('-') {
                args.paths.push(PathBuf::from(token));
            }
        }
        args
    }

    fn output_path(&self) -> PathBuf {
        let output = self.output.clone().unwrap_or_else(|| "output.xml".to_string());
        match &self.outputdir {
            Some(dir) => dir.join(output),
            None => PathBuf::from(output),
        }
    }
}

fn element(name: &str, attributes: &[(&str, &str)]) -> Element {
    let mut element = Element::new(name);
    for (key, value) in attributes {
        element
            .attributes
            .insert(key.to_string(), value.to_string());
    }
    element
}

fn write_document(root: &Element, path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok();
    }
    let file = fs::File::create(path).expect("create output document");
    root.write_with_config(file, EmitterConfig::new().perform_indent(true))
        .expect("write output document");
}

fn absolute(path: &Path) -> PathBuf {
    std::env::current_dir().unwrap().join(path)
}

// === Dry run ===

fn dry_run(args: &Args) -> i32 {
    let mut robot = element("robot", &[("generator", "mock_engine")]);

    for datasource in &args.paths {
        let source = absolute(datasource);
        if !source.exists() {
            eprintln!("[ ERROR ] Parsing '{}' failed: File or directory does not exist.", datasource.display());
            return DATA_ERROR;
        }
        robot.children.push(XMLNode::Element(suite_tree(&source)));
    }

    write_document(&robot, &PathBuf::from(args.output.clone().unwrap_or_default()));
    0
}

fn suite_tree(source: &Path) -> Element {
    let name = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let source_attr = source.display().to_string();
    let mut suite = element("suite", &[("name", name.as_str()), ("source", source_attr.as_str())]);

    if source.is_dir() {
        let mut entries: Vec<_> = fs::read_dir(source)
            .map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default();
        entries.sort();
        for entry in entries {
            if entry.is_dir() || entry.extension().is_some_and(|e| e == "robot") {
                suite.children.push(XMLNode::Element(suite_tree(&entry)));
            }
        }
    }
    suite
}

// === Single suite ===

/// One line of a suite file
enum Directive {
    Sleep(u64),
    Exit(i32),
    Screenshot(String),
    Exclusive(PathBuf),
}

fn parse_directives(content: &str) -> Vec<Directive> {
    content
        .lines()
        .filter_map(|line| {
            let (word, arg) = line.trim().split_once(' ')?;
            let arg = arg.trim();
            match word {
                "sleep" => arg.parse().ok().map(Directive::Sleep),
                "exit" => arg.parse().ok().map(Directive::Exit),
                "screenshot" => Some(Directive::Screenshot(arg.to_string())),
                "exclusive" => Some(Directive::Exclusive(PathBuf::from(arg))),
                _ => None,
            }
        })
        .collect()
}

fn run_suite(args: &Args) -> i32 {
    let Some(suite_path) = args.paths.last() else {
        eprintln!("[ ERROR ] Expected a suite path");
        return DATA_ERROR;
    };
    let Ok(content) = fs::read_to_string(suite_path) else {
        eprintln!("[ ERROR ] Cannot read suite '{}'", suite_path.display());
        return DATA_ERROR;
    };
    let output_dir = args.outputdir.clone().unwrap_or_else(|| PathBuf::from("."));

    let mut code = 0;
    let mut messages = Vec::new();
    let mut locks = Vec::new();

    for directive in parse_directives(&content) {
        match directive {
            Directive::Sleep(ms) => std::thread::sleep(Duration::from_millis(ms)),
            Directive::Exit(status) => code = status,
            Directive::Screenshot(file) => {
                fs::write(output_dir.join(&file), b"\x89PNG\r\n").ok();
                messages.push(format!(
                    r#"</td></tr><tr><td colspan="3"><a href="{file}"><img src="{file}" width="800px"></a>"#
                ));
            }
            Directive::Exclusive(dir) => {
                // another suite holding the lock means two ran at once
                if fs::create_dir(&dir).is_err() {
                    eprintln!("[ ERROR ] '{}' is already held", dir.display());
                    code = 99;
                } else {
                    locks.push(dir);
                }
            }
        }
    }

    for lock in locks {
        fs::remove_dir(lock).ok();
    }

    let status = if code == 0 { "PASS" } else { "FAIL" };
    let source = absolute(suite_path);
    let name = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut keyword = element("kw", &[("name", "Run Directives")]);
    for html in messages {
        let mut msg = element("msg", &[("level", "INFO"), ("html", "true")]);
        msg.children.push(XMLNode::Text(html));
        keyword.children.push(XMLNode::Element(msg));
    }
    let test_name = format!("{name} Case");
    let mut test = element("test", &[("name", test_name.as_str())]);
    test.children.push(XMLNode::Element(keyword));
    test.children
        .push(XMLNode::Element(element("status", &[("status", status)])));

    let source_attr = source.display().to_string();
    let mut suite = element("suite", &[("name", name.as_str()), ("source", source_attr.as_str())]);
    suite.children.push(XMLNode::Element(test));
    suite.children
        .push(XMLNode::Element(element("status", &[("status", status)])));

    let mut robot = element("robot", &[("generator", "mock_engine")]);
    robot.children.push(XMLNode::Element(suite));
    write_document(&robot, &args.output_path());

    code
}

// === Merge ===

fn rebot(args: &Args) -> i32 {
    let name = args.name.clone().unwrap_or_else(|| "Tests".to_string());
    let mut top = element("suite", &[("name", name.as_str())]);
    let mut failed = 0;

    for path in &args.paths {
        let Ok(content) = fs::read(path) else {
            eprintln!("[ ERROR ] Reading '{}' failed", path.display());
            return DATA_ERROR;
        };
        let Ok(robot) = Element::parse(content.as_slice()) else {
            eprintln!("[ ERROR ] '{}' is not a result document", path.display());
            return DATA_ERROR;
        };
        for child in robot.children {
            if let XMLNode::Element(suite) = child {
                if suite.name != "suite" {
                    continue;
                }
                let suite_failed = suite
                    .get_child("status")
                    .and_then(|s| s.attributes.get("status"))
                    .is_some_and(|s| s == "FAIL");
                if suite_failed {
                    failed += 1;
                }
                top.children.push(XMLNode::Element(suite));
            }
        }
    }

    let mut robot = element("robot", &[("generator", "mock_engine rebot")]);
    robot.children.push(XMLNode::Element(top));
    write_document(&robot, &args.output_path());

    failed.min(250)
}
