//! Media relocation
//!
//! Screenshots are written next to each suite's `result.xml`, but the
//! aggregate report lives in the results root. Each media file is copied
//! there as `<key>.<name>` and the HTML messages in the suite's result
//! document are rewritten to point at the new names.
//!
//! Files are copied before the document is rewritten, and the rewritten
//! document replaces the old one with an atomic rename, so a reference
//! never points at a file that is not there yet. References that already
//! carry the key prefix are left alone, which makes relocation idempotent.

use std::io::Write;
use std::path::Path;

use tracing::debug;
use xml::reader::XmlEvent as ReadEvent;
use xml::writer::XmlEvent as WriteEvent;
use xml::{EmitterConfig, ParserConfig};

use crate::common::paths::RESULT_FILE;
use crate::common::{has_extension, Error, Result};
use crate::suite::SuiteKey;

/// What relocation did for one suite
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub files_copied: usize,
    pub references_rewritten: usize,
}

/// Relocate the media of one suite into `results_dir`
pub fn relocate_suite(
    suite_dir: &Path,
    key: &SuiteKey,
    results_dir: &Path,
    extensions: &[String],
) -> Result<Relocation> {
    let files_copied = copy_media(suite_dir, key, results_dir, extensions)?;
    let references_rewritten = rewrite_result(&suite_dir.join(RESULT_FILE), key)?;

    debug!(
        suite = %key,
        files_copied, references_rewritten, "relocated media"
    );
    Ok(Relocation {
        files_copied,
        references_rewritten,
    })
}

fn copy_media(
    suite_dir: &Path,
    key: &SuiteKey,
    results_dir: &Path,
    extensions: &[String],
) -> Result<usize> {
    let mut copied = 0;
    for entry in std::fs::read_dir(suite_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() || !has_extension(&path, extensions) {
            continue;
        }
        let name = entry.file_name();
        let target = results_dir.join(key.prefixed(&name.to_string_lossy()));
        std::fs::copy(&path, &target)?;
        copied += 1;
    }
    Ok(copied)
}

/// Rewrite media references in a result document; returns how many changed
pub fn rewrite_result(path: &Path, key: &SuiteKey) -> Result<usize> {
    let content = std::fs::read(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    let (document, rewritten) = rewrite_document(&content, key, path)?;
    if rewritten > 0 {
        write_atomically(&document, path)?;
    }
    Ok(rewritten)
}

/// Stream a result document through, rewriting text inside HTML messages
///
/// Every other event is written back as read, whitespace-only text included.
fn rewrite_document(content: &[u8], key: &SuiteKey, path: &Path) -> Result<(Vec<u8>, usize)> {
    let reader = ParserConfig::new()
        .trim_whitespace(false)
        .whitespace_to_characters(true)
        .cdata_to_characters(false)
        .ignore_comments(false)
        .create_reader(content);
    let mut writer = EmitterConfig::new()
        .perform_indent(false)
        .autopad_comments(false)
        .create_writer(Vec::with_capacity(content.len()));

    // one entry per open element, true for an HTML message
    let mut open = Vec::new();
    let mut rewritten = 0;

    for event in reader {
        let event = event.map_err(|e| Error::xml_parse(path, e))?;
        let replaced = match &event {
            ReadEvent::StartElement {
                name, attributes, ..
            } => {
                open.push(
                    name.local_name == "msg"
                        && attributes
                            .iter()
                            .any(|a| a.name.local_name == "html" && is_enabled(&a.value)),
                );
                None
            }
            ReadEvent::EndElement { .. } => {
                open.pop();
                None
            }
            ReadEvent::Characters(text) | ReadEvent::CData(text) if open.last() == Some(&true) => {
                rewrite_html(text, key)
            }
            _ => None,
        };

        let out = match (&event, &replaced) {
            (ReadEvent::CData(_), Some((html, count))) => {
                rewritten += count;
                Some(WriteEvent::CData(html))
            }
            (_, Some((html, count))) => {
                rewritten += count;
                Some(WriteEvent::Characters(html))
            }
            (_, None) => event.as_writer_event(),
        };
        if let Some(out) = out {
            writer.write(out).map_err(|e| Error::xml_write(path, e))?;
        }
    }

    Ok((writer.into_inner(), rewritten))
}

fn is_enabled(value: &str) -> bool {
    value.eq_ignore_ascii_case("yes") || value.eq_ignore_ascii_case("true")
}

fn write_atomically(document: &[u8], path: &Path) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::Internal(format!("{} has no parent", path.display())))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(document)?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Rewrite `<a href>` and `<img src>` values in an HTML fragment
///
/// Only bare local file names are touched. Returns `None` when nothing
/// changed. The fragment need not be well-formed: messages typically start
/// in the middle of a table (`</td></tr><tr><td>...`).
pub fn rewrite_html(html: &str, key: &SuiteKey) -> Option<(String, usize)> {
    let mut out = String::with_capacity(html.len() + 64);
    let mut rewritten = 0;
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let from_tag = &rest[open..];
        let Some(close) = from_tag.find('>') else {
            out.push_str(from_tag);
            rest = "";
            break;
        };
        let tag = &from_tag[..=close];

        match reference_attribute(tag).and_then(|attr| rewrite_attribute(tag, attr, key)) {
            Some(new_tag) => {
                out.push_str(&new_tag);
                rewritten += 1;
            }
            None => out.push_str(tag),
        }
        rest = &from_tag[close + 1..];
    }
    out.push_str(rest);

    (rewritten > 0).then_some((out, rewritten))
}

/// Attribute holding the media reference for a tag, if any
fn reference_attribute(tag: &str) -> Option<&'static str> {
    let name: String = tag[1..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    match name.to_ascii_lowercase().as_str() {
        "a" => Some("href"),
        "img" => Some("src"),
        _ => None,
    }
}

fn rewrite_attribute(tag: &str, attr: &str, key: &SuiteKey) -> Option<String> {
    let lower = tag.to_ascii_lowercase();
    let bytes = tag.as_bytes();
    let mut search_from = 0;

    while let Some(found) = lower[search_from..].find(attr) {
        let start = search_from + found;
        search_from = start + attr.len();

        // must be a whole attribute name
        if start == 0 || !bytes[start - 1].is_ascii_whitespace() {
            continue;
        }

        let mut pos = start + attr.len();
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'=') {
            continue;
        }
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let quote = match bytes.get(pos) {
            Some(&q) if q == b'"' || q == b'\'' => q,
            _ => return None,
        };
        let value_start = pos + 1;
        let value_end = value_start + tag[value_start..].find(quote as char)?;
        let value = &tag[value_start..value_end];

        if !is_local_file_name(value) || key.is_prefix_of(value) {
            return None;
        }
        return Some(format!(
            "{}{}{}",
            &tag[..value_start],
            key.prefixed(value),
            &tag[value_end..]
        ));
    }
    None
}

fn is_local_file_name(value: &str) -> bool {
    !value.is_empty()
        && !value.contains(['/', '\\', ':', '#', '?'])
        && !value.starts_with('.')
}
