//! Gettext `.po` files, read and written through `polib`.
//!
//! `polib` panics on some malformed input and merges entries that are not
//! separated by a blank line, so content is checked and normalized line by
//! line before it is handed over. Translator comments (`# `), previous
//! strings (`#|`) and obsolete entries (`#~`) are not kept by `polib` and are
//! gone once a catalog is saved. The writer wraps strings at 79 columns.

use anyhow::{Result, anyhow, bail};
use polib::catalog::Catalog as Messages;
use polib::message::MessageView;
use polib::po_file;
use std::collections::HashSet;
use std::path::Path;

use crate::file_utils::FileManager;

/// Separator gettext uses between context and msgid in a lookup key
pub const CONTEXT_SEPARATOR: char = '\u{4}';

/// Header fields a catalog must declare to be readable
pub const REQUIRED_HEADER_FIELDS: [&str; 9] = [
    "Project-Id-Version",
    "POT-Creation-Date",
    "PO-Revision-Date",
    "Language-Team",
    "MIME-Version",
    "Content-Type",
    "Content-Transfer-Encoding",
    "Language",
    "Plural-Forms",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Context,
    Id,
    IdPlural,
    Str,
    StrForm,
}

impl Keyword {
    fn parse(word: &str) -> Option<Self> {
        match word {
            "msgctxt" => Some(Self::Context),
            "msgid" => Some(Self::Id),
            "msgid_plural" => Some(Self::IdPlural),
            "msgstr" => Some(Self::Str),
            _ => {
                let index = word.strip_prefix("msgstr[")?.strip_suffix(']')?;
                match index.parse::<usize>() {
                    Ok(n) if n < 10 => Some(Self::StrForm),
                    _ => None,
                }
            }
        }
    }

    fn starts_entry(self) -> bool {
        matches!(self, Self::Context | Self::Id)
    }

    fn is_translation(self) -> bool {
        matches!(self, Self::Str | Self::StrForm)
    }
}

/// Whether `value` is one complete `"..."` string
fn is_quoted(value: &str) -> bool {
    if value.len() < 2 || !value.starts_with('"') || !value.ends_with('"') {
        return false;
    }
    let inner = &value[1..value.len() - 1];
    let escapes = inner.chars().rev().take_while(|&c| c == '\\').count();
    escapes % 2 == 0
}

fn unquote(value: &str) -> &str {
    &value[1..value.len() - 1]
}

/// Append a comment line, spacing its marker the way `polib` matches it.
/// Consecutive flag lines are merged into one.
fn push_comment(normalized: &mut String, line: &str) {
    let Some(marker @ ("#." | "#:" | "#,")) = line.get(..2) else {
        normalized.push_str(line);
        normalized.push('\n');
        return;
    };
    let rest = line[2..].trim_start();

    if marker == "#," {
        let previous_start = normalized[..normalized.len().saturating_sub(1)]
            .rfind('\n')
            .map_or(0, |i| i + 1);
        if normalized[previous_start..].starts_with("#, ") {
            normalized.pop();
            normalized.push_str(", ");
            normalized.push_str(rest);
            normalized.push('\n');
            return;
        }
    }

    normalized.push_str(marker);
    normalized.push(' ');
    normalized.push_str(rest);
    normalized.push('\n');
}

/// Check `content` line by line and return it in the shape `polib` reads
/// safely: trimmed lines, a blank line between entries.
///
/// Errors name the offending line.
pub fn normalize(content: &str) -> Result<String> {
    let mut normalized = String::with_capacity(content.len() + 64);
    let mut seen: Vec<&str> = Vec::new();
    let mut current: Option<Keyword> = None;

    for (index, raw) in content.lines().enumerate() {
        let number = index + 1;
        let line = raw.trim();

        if line.is_empty() {
            seen.clear();
            current = None;
            normalized.push('\n');
            continue;
        }

        if line.starts_with('#') {
            if current.is_some_and(Keyword::is_translation) {
                normalized.push('\n');
                seen.clear();
            }
            current = None;
            push_comment(&mut normalized, line);
            continue;
        }

        if line.starts_with('"') {
            if current.is_none() {
                bail!("Line {}: string without a keyword", number);
            }
            if !is_quoted(line) {
                bail!("Line {}: unterminated string", number);
            }
            normalized.push_str(line);
            normalized.push('\n');
            continue;
        }

        let (word, value) = line
            .split_once(|c: char| c.is_whitespace())
            .ok_or_else(|| anyhow!("Line {}: unexpected content", number))?;
        let keyword = Keyword::parse(word)
            .ok_or_else(|| anyhow!("Line {}: unknown keyword '{}'", number, word))?;
        let value = value.trim_start();
        if !is_quoted(value) {
            bail!("Line {}: unterminated string", number);
        }

        if keyword.starts_entry() && current.is_some_and(Keyword::is_translation) {
            normalized.push('\n');
            seen.clear();
        }
        if seen.contains(&word) {
            bail!("Line {}: duplicate {}", number, word);
        }
        if keyword.is_translation() && !seen.contains(&"msgid") {
            bail!("Line {}: {} without msgid", number, word);
        }
        seen.push(word);
        current = Some(keyword);

        normalized.push_str(word);
        normalized.push(' ');
        normalized.push_str(value);
        normalized.push('\n');
    }

    Ok(normalized)
}

/// Check that normalized content starts with a header declaring every
/// required field
pub fn check_header(normalized: &str) -> Result<()> {
    let mut lines = normalized
        .lines()
        .filter(|l| !l.is_empty() && !l.starts_with('#'));

    if lines.next() != Some("msgid \"\"") {
        bail!("Catalog has no header entry");
    }
    let Some(first) = lines.next().and_then(|l| l.strip_prefix("msgstr ")) else {
        bail!("Catalog has no header entry");
    };

    let mut header = unquote(first).to_string();
    for line in lines.take_while(|l| l.starts_with('"')) {
        header.push_str(unquote(line));
    }

    let declared: HashSet<&str> = header
        .split("\\n")
        .filter_map(|field| field.split_once(':'))
        .map(|(name, _)| name)
        .collect();
    let missing: Vec<&str> = REQUIRED_HEADER_FIELDS
        .iter()
        .copied()
        .filter(|name| !declared.contains(name))
        .collect();

    if !missing.is_empty() {
        bail!("Catalog header is missing {}", missing.join(", "));
    }
    Ok(())
}

/// Parse catalog content
pub fn parse_catalog(content: &str) -> Result<Messages> {
    let normalized = normalize(content)?;
    check_header(&normalized)?;

    let staged = FileManager::stage(&normalized)?;
    let mut messages = po_file::parse(staged.path())?;
    // Comment lines above an obsolete entry come back as an entry with an empty msgid
    messages.delete_message(None, "", None);
    Ok(messages)
}

/// Read and parse the catalog at `path`
pub fn read_catalog(path: &Path) -> Result<Messages> {
    parse_catalog(&FileManager::read_to_string(path)?)
}

/// Write `messages` over the file at `path`, atomically
pub fn write_catalog(messages: &Messages, path: &Path) -> Result<()> {
    FileManager::replace_with(path, |temp| Ok(po_file::write(messages, temp)?))
}

/// Lookup key: msgid, prefixed by context and `\u{4}` when present
pub fn message_key<M: MessageView + ?Sized>(message: &M) -> String {
    if message.msgctxt().is_empty() {
        message.msgid().to_string()
    } else {
        format!("{}{}{}", message.msgctxt(), CONTEXT_SEPARATOR, message.msgid())
    }
}
