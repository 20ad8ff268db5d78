/*!
 * Unit model shared by the catalog and record drivers.
 *
 * A `TranslationUnit` is one string to translate, independent of where it
 * came from. Placeholders are extracted once, at construction.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;

/// Substrings that must survive translation untouched:
/// python `%(name)s` and printf `%s`/`%d` specifiers, `%%`,
/// brace formats `{name}`, `{0}`, `{}`, and markup tags.
/// A printf specifier glued to a word (`20%discount`) is prose.
static PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        %\([A-Za-z0-9_.]+\)[\#0+\-]?\d*(?:\.\d+)?[sdifeEgGxXorcub%]
        | %%
        | %[\#0+\-]?\d*(?:\.\d+)?[sdifeEgGxXorc]\b
        | \{[A-Za-z0-9_.\[\]]*(?:![rsa])?(?::[^{}]*)?\}
        | </?[A-Za-z][A-Za-z0-9\-]*(?:\s[^<>]*)?/?>
        ",
    )
    .expect("Invalid placeholder regex")
});

/// Extract the placeholder set of a source string
pub fn extract_placeholders(text: &str) -> BTreeSet<String> {
    PLACEHOLDER_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Placeholders of `placeholders` that do not occur in `translated`
pub fn missing_placeholders<'a>(
    placeholders: &'a BTreeSet<String>,
    translated: &str,
) -> Vec<&'a str> {
    placeholders
        .iter()
        .filter(|p| !translated.contains(p.as_str()))
        .map(|p| p.as_str())
        .collect()
}

/// One atomic string to translate
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUnit {
    /// Opaque identifier used for tracing and write-back
    pub key: String,
    /// Original-language text, never empty
    pub source_text: String,
    /// Current translation, possibly empty
    pub existing_target_text: String,
    /// Previously translated but the source changed since
    pub is_stale: bool,
    /// Developer note shown to the model to disambiguate the text
    pub comment: Option<String>,
    placeholders: BTreeSet<String>,
}

impl TranslationUnit {
    /// Create a unit; placeholders are derived from `source_text`
    pub fn new(
        key: impl Into<String>,
        source_text: impl Into<String>,
        existing_target_text: impl Into<String>,
        is_stale: bool,
    ) -> Self {
        let source_text = source_text.into();
        let placeholders = extract_placeholders(&source_text);
        Self {
            key: key.into(),
            source_text,
            existing_target_text: existing_target_text.into(),
            is_stale,
            comment: None,
            placeholders,
        }
    }

    /// Attach a developer comment. Blank comments are ignored.
    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self
    }

    /// Placeholders found in the source text
    pub fn placeholders(&self) -> &BTreeSet<String> {
        &self.placeholders
    }

    /// JSON element sent to the model for this unit
    pub fn payload_item(&self, annotated: bool) -> PayloadItem<'_> {
        if annotated {
            PayloadItem::Annotated {
                text: &self.source_text,
                comment: self.comment.as_deref(),
            }
        } else {
            PayloadItem::Plain(&self.source_text)
        }
    }
}

/// Serialized form of a unit inside the request payload
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PayloadItem<'a> {
    /// Bare string
    Plain(&'a str),
    /// Object form, used for the whole batch as soon as one unit has a comment
    Annotated {
        /// Source text
        text: &'a str,
        /// Developer comment
        #[serde(skip_serializing_if = "Option::is_none")]
        comment: Option<&'a str>,
    },
}

/// JSON payload for a run of units, as sent in the user message
pub fn payload_json(units: &[TranslationUnit]) -> String {
    let annotated = units.iter().any(|u| u.comment.is_some());
    let items: Vec<PayloadItem<'_>> = units.iter().map(|u| u.payload_item(annotated)).collect();
    serde_json::to_string(&items).unwrap_or_else(|_| "[]".to_string())
}

/// Ordered, non-empty group of units sent in one provider request
#[derive(Debug, Clone)]
pub struct Batch {
    units: Vec<TranslationUnit>,
}

impl Batch {
    /// Build a batch; returns `None` for an empty unit list
    pub fn new(units: Vec<TranslationUnit>) -> Option<Self> {
        if units.is_empty() {
            None
        } else {
            Some(Self { units })
        }
    }

    /// Units of the batch, in request order
    pub fn units(&self) -> &[TranslationUnit] {
        &self.units
    }

    /// Number of units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the batch has no units
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Whether any unit carries a comment (switches the payload to objects)
    pub fn has_comments(&self) -> bool {
        self.units.iter().any(|u| u.comment.is_some())
    }

    /// JSON payload for the user message
    pub fn payload_json(&self) -> String {
        payload_json(&self.units)
    }

    /// Serialized size used against the batch budget
    pub fn serialized_size(&self) -> usize {
        self.payload_json().len()
    }

    /// Consume the batch, returning its units
    pub fn into_units(self) -> Vec<TranslationUnit> {
        self.units
    }
}

/// Status of one unit after its batch completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Translated and every placeholder preserved
    Ok,
    /// Translated, but at least one placeholder is missing
    PlaceholderMismatch,
    /// No usable translation for this unit
    Missing,
}

/// Result for one unit
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOutcome {
    /// Key of the unit this outcome belongs to
    pub unit_key: String,
    /// Translated text, absent when the unit failed
    pub translated_text: Option<String>,
    /// Outcome status
    pub status: OutcomeStatus,
}

impl TranslationOutcome {
    /// Whether this outcome may be written under the given mismatch policy
    pub fn is_accepted(&self, accept_placeholder_mismatch: bool) -> bool {
        match self.status {
            OutcomeStatus::Ok => self.translated_text.is_some(),
            OutcomeStatus::PlaceholderMismatch => {
                accept_placeholder_mismatch && self.translated_text.is_some()
            }
            OutcomeStatus::Missing => false,
        }
    }
}

/// Options of one job, already validated by the CLI layer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobOptions {
    /// Compute what would be translated, call nothing, write nothing
    pub dry_run: bool,
    /// Re-translate entries that already have a translation
    pub overwrite: bool,
    /// Restrict record translation to these models
    pub selected_model_names: Option<Vec<String>>,
}
