//! Deployed settings document editing.
//!
//! [`set_app_setting`] updates or appends one `appSettings` entry in the
//! `web.config` that ships with an endpoint. The document is handled as
//! lines of XML: a matching entry is rewritten on its own line, keeping
//! entry order and all surrounding content untouched. Entries are one per
//! line, which is how staged documents are written.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::config::DEPLOYED_CONFIG_NAME;
use crate::error::{GantryError, GantryResult};

/// What `set_app_setting` did to the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingOutcome {
    Updated,
    Added,
}

impl SettingOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            SettingOutcome::Updated => "updated",
            SettingOutcome::Added => "added",
        }
    }
}

/// Set `key` to `value` in the settings document inside `site_dir`.
///
/// The write replaces the document atomically. Fails with `MissingFile`
/// when no document has been deployed to the directory yet.
pub fn set_app_setting(site_dir: &Path, key: &str, value: &str) -> GantryResult<SettingOutcome> {
    if key.is_empty() {
        return Err(GantryError::EmptyArgument { name: "key" });
    }
    if value.is_empty() {
        return Err(GantryError::EmptyArgument { name: "value" });
    }

    let path = site_dir.join(DEPLOYED_CONFIG_NAME);
    if !path.is_file() {
        return Err(GantryError::MissingFile { path });
    }

    let content = fs::read_to_string(&path)?;
    let (patched, outcome) =
        patch_document(&content, key, value).map_err(|message| GantryError::ConfigWrite {
            path: path.clone(),
            message,
        })?;

    let mut tmp = tempfile::NamedTempFile::new_in(site_dir)?;
    tmp.write_all(patched.as_bytes())?;
    tmp.persist(&path).map_err(|e| GantryError::Io(e.error))?;

    Ok(outcome)
}

/// Apply the entry change to a document held in memory.
pub fn patch_document(
    content: &str,
    key: &str,
    value: &str,
) -> Result<(String, SettingOutcome), String> {
    let newline = if content.contains("\r\n") { "\r\n" } else { "\n" };
    let had_final_newline = content.ends_with('\n');
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();

    let section = locate_section(&mut lines)?;
    let (open, close) = section;

    for index in open + 1..close {
        let line = &lines[index];
        if entry_key(line).as_deref() == Some(key) {
            let indent = leading_whitespace(line);
            lines[index] = render_entry(&indent, key, value);
            return Ok((join_lines(&lines, newline, had_final_newline), SettingOutcome::Updated));
        }
    }

    let indent = if close > open + 1 {
        leading_whitespace(&lines[close - 1])
    } else {
        format!("{}  ", leading_whitespace(&lines[open]))
    };
    lines.insert(close, render_entry(&indent, key, value));

    Ok((join_lines(&lines, newline, had_final_newline), SettingOutcome::Added))
}

/// Read an entry back out of a document, unescaped.
pub fn find_app_setting(content: &str, key: &str) -> Option<String> {
    let mut inside = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("<appSettings") && !trimmed.ends_with("/>") {
            inside = true;
            continue;
        }
        if trimmed == "</appSettings>" {
            inside = false;
            continue;
        }
        if inside && entry_key(line).as_deref() == Some(key) {
            return attr_value(line, "value").map(|raw| unescape_attr(raw));
        }
    }
    None
}

/// Find the `appSettings` open/close line indexes, creating the section
/// (or expanding a self-closed one) when needed.
fn locate_section(lines: &mut Vec<String>) -> Result<(usize, usize), String> {
    for index in 0..lines.len() {
        let trimmed = lines[index].trim();
        if !trimmed.starts_with("<appSettings") {
            continue;
        }

        if trimmed.ends_with("/>") {
            let indent = leading_whitespace(&lines[index]);
            lines[index] = format!("{indent}<appSettings>");
            lines.insert(index + 1, format!("{indent}</appSettings>"));
            return Ok((index, index + 1));
        }

        let close = lines[index + 1..]
            .iter()
            .position(|line| line.trim() == "</appSettings>")
            .map(|offset| index + 1 + offset)
            .ok_or_else(|| "appSettings element is not closed".to_string())?;
        return Ok((index, close));
    }

    let configuration_close = lines
        .iter()
        .position(|line| line.trim() == "</configuration>")
        .ok_or_else(|| "no configuration element to hold appSettings".to_string())?;

    let indent = format!("{}  ", leading_whitespace(&lines[configuration_close]));
    lines.insert(configuration_close, format!("{indent}</appSettings>"));
    lines.insert(configuration_close, format!("{indent}<appSettings>"));
    Ok((configuration_close, configuration_close + 1))
}

fn join_lines(lines: &[String], newline: &str, final_newline: bool) -> String {
    let mut joined = lines.join(newline);
    if final_newline {
        joined.push_str(newline);
    }
    joined
}

fn render_entry(indent: &str, key: &str, value: &str) -> String {
    format!(
        "{indent}<add key=\"{}\" value=\"{}\" />",
        escape_attr(key),
        escape_attr(value)
    )
}

/// Key of an `<add>` entry line, unescaped. `None` for any other line.
fn entry_key(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with("<add") {
        return None;
    }
    attr_value(line, "key").map(|raw| unescape_attr(raw))
}

/// Raw text of a double-quoted attribute on a single line.
fn attr_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let marker = format!("{name}=\"");
    let mut search_from = 0;
    while let Some(found) = line[search_from..].find(&marker) {
        let start = search_from + found;
        let boundary_ok = start == 0
            || line[..start]
                .chars()
                .next_back()
                .map(|c| c.is_whitespace() || c == '<')
                .unwrap_or(true);
        let value_start = start + marker.len();
        if boundary_ok {
            let end = line[value_start..].find('"')?;
            return Some(&line[value_start..value_start + end]);
        }
        search_from = value_start;
    }
    None
}

fn leading_whitespace(line: &str) -> String {
    line.chars().take_while(|c| c.is_whitespace()).collect()
}

fn escape_attr(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn unescape_attr(raw: &str) -> String {
    raw.replace("&apos;", "'")
        .replace("&quot;", "\"")
        .replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&amp;", "&")
}
