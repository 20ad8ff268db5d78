/*!
 * Response parsing and reconciliation.
 *
 * Models wrap their JSON in code fences, lead with a sentence or trail off
 * with a remark. The extractor strips the fence, then scans for a balanced
 * `[ ... ]` with a small string-aware state machine and hands each candidate
 * to `serde_json` until one parses as an array of strings.
 *
 * Reconciliation is strictly positional: string N belongs to unit N.
 */

use log::{debug, warn};

use crate::errors::TranslateError;
use crate::translation::unit::{Batch, OutcomeStatus, TranslationOutcome, missing_placeholders};

/// Characters of raw content kept in error previews
pub const PREVIEW_CHARS: usize = 200;

/// Shorten `text` to at most `max_chars` characters for logs and errors
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

fn malformed(reason: impl Into<String>, raw: &str) -> TranslateError {
    TranslateError::MalformedResponse {
        reason: reason.into(),
        preview: preview(raw, PREVIEW_CHARS),
    }
}

/// Remove a leading ```` ```lang ```` line and a trailing ```` ``` ````
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if text.starts_with("```") {
        text = match text.find('\n') {
            Some(newline) => &text[newline + 1..],
            None => text.trim_start_matches('`'),
        };
    }
    if let Some(stripped) = text.trim_end().strip_suffix("```") {
        text = stripped;
    }
    text.trim()
}

/// Scanner state while looking for the bracket closing an array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Code,
    InString,
    Escaped,
}

/// Byte index of the `]` matching the `[` at `start`, if the array is closed.
///
/// Brackets inside JSON strings are ignored, including escaped quotes.
pub fn matching_bracket(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'[') {
        return None;
    }

    let mut depth = 0usize;
    let mut state = ScanState::Code;
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        state = match (state, byte) {
            (ScanState::Code, b'"') => ScanState::InString,
            (ScanState::Code, b'[') => {
                depth += 1;
                ScanState::Code
            }
            (ScanState::Code, b']') => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
                ScanState::Code
            }
            (ScanState::InString, b'\\') => ScanState::Escaped,
            (ScanState::InString, b'"') => ScanState::Code,
            (ScanState::Escaped, _) => ScanState::InString,
            (current, _) => current,
        };
    }
    None
}

/// Extract the translated strings from raw provider output.
///
/// Tries every `[` in order; the first balanced candidate that parses as an
/// array of strings wins. An empty array counts as malformed.
pub fn parse_string_array(raw: &str) -> Result<Vec<String>, TranslateError> {
    let text = strip_code_fence(raw);
    if text.is_empty() {
        return Err(malformed("empty response", raw));
    }

    let mut last_error = String::from("no JSON array found");
    for (start, _) in text.match_indices('[') {
        let Some(end) = matching_bracket(text, start) else {
            last_error = "unterminated JSON array".to_string();
            continue;
        };
        match serde_json::from_str::<Vec<String>>(&text[start..=end]) {
            Ok(strings) if strings.is_empty() => {
                last_error = "empty JSON array".to_string();
            }
            Ok(strings) => return Ok(strings),
            Err(e) => {
                debug!("Skipping JSON candidate at byte {}: {}", start, e);
                last_error = format!("invalid JSON array: {}", e);
            }
        }
    }

    Err(malformed(last_error, raw))
}

/// Map a raw reply onto the units of `batch`.
///
/// Returns one outcome per unit, in order. A reply with a different number of
/// strings is rejected as a whole.
pub fn reconcile(batch: &Batch, raw: &str) -> Result<Vec<TranslationOutcome>, TranslateError> {
    let translations = parse_string_array(raw)?;

    if translations.len() != batch.len() {
        return Err(TranslateError::Reconciliation {
            expected: batch.len(),
            received: translations.len(),
        });
    }

    let outcomes = batch
        .units()
        .iter()
        .zip(translations)
        .map(|(unit, translated)| {
            if translated.trim().is_empty() {
                return TranslationOutcome {
                    unit_key: unit.key.clone(),
                    translated_text: None,
                    status: OutcomeStatus::Missing,
                };
            }

            let missing = missing_placeholders(unit.placeholders(), &translated);
            let status = if missing.is_empty() {
                OutcomeStatus::Ok
            } else {
                warn!(
                    "Placeholder mismatch for '{}': missing {}",
                    unit.key,
                    missing.join(", ")
                );
                OutcomeStatus::PlaceholderMismatch
            };

            TranslationOutcome {
                unit_key: unit.key.clone(),
                translated_text: Some(translated),
                status,
            }
        })
        .collect();

    Ok(outcomes)
}
