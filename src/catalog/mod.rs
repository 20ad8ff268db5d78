/*!
 * Gettext message catalogs.
 *
 * - `po`: `.po` reader and writer over `polib`
 * - `discovery`: locating the catalogs of a language
 * - `driver`: running translation jobs over groups of catalogs
 *
 * A `Catalog` is one `.po` file loaded in memory. It turns its entries into
 * translation units, takes accepted translations back, and rewrites the file
 * at most once.
 */

use anyhow::{Context, Result};
use log::debug;
use polib::catalog::Catalog as Messages;
use polib::message::MessageMutView;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::translation::selection::needs_translation;
use crate::translation::{JobOptions, TranslationUnit};

pub use self::discovery::{CatalogLocation, all_catalog_paths, find_catalogs};
pub use self::driver::{CatalogGroup, CatalogReport, CatalogTranslator};
pub use self::po::{CONTEXT_SEPARATOR, message_key, parse_catalog, read_catalog, write_catalog};
pub use polib::message::MessageView;

pub mod discovery;
pub mod driver;
pub mod po;

/// Key suffix of the unit carrying a plural entry's `msgid_plural`
pub const PLURAL_KEY_SUFFIX: &str = "\u{0}plural";

/// Store of catalog entries the driver reads units from and writes back into
pub trait CatalogSource {
    /// Name used in logs
    fn name(&self) -> String;

    /// Ordered units of every translatable entry, obsolete entries excluded
    fn units(&self) -> Vec<TranslationUnit>;

    /// Write accepted translations onto the entries that needed one.
    ///
    /// Returns the number of entries changed.
    fn apply(&mut self, translations: &HashMap<String, String>, options: &JobOptions) -> usize;

    /// Persist pending changes; returns whether anything was written
    fn save(&mut self) -> Result<bool>;
}

/// Translation counts of one catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    /// Translatable entries
    pub total: usize,
    /// Entries with an empty form
    pub untranslated: usize,
    /// Entries flagged fuzzy
    pub fuzzy: usize,
}

impl CatalogStats {
    /// Whether the catalog needs attention
    pub fn has_issues(&self) -> bool {
        self.untranslated > 0 || self.fuzzy > 0
    }
}

/// A `.po` file loaded in memory
pub struct Catalog {
    path: PathBuf,
    messages: Messages,
    dirty: bool,
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("path", &self.path)
            .field("messages", &self.messages.count())
            .field("dirty", &self.dirty)
            .finish()
    }
}

/// Whether every form of a message is filled; a plural without forms is not
fn is_complete<M: MessageView + ?Sized>(message: &M) -> bool {
    match message.msgstr_plural() {
        Ok(forms) => !forms.is_empty() && forms.iter().all(|f| !f.is_empty()),
        Err(_) => message.is_translated(),
    }
}

/// Units of one message: the singular, then the plural form when present
fn message_units<M: MessageView + ?Sized>(message: &M) -> Vec<TranslationUnit> {
    let key = message_key(message);
    let stale = message.is_fuzzy();
    let comment = Some(message.comments().to_string());

    let (Ok(plural), Ok(forms)) = (message.msgid_plural(), message.msgstr_plural()) else {
        let existing = message.msgstr().unwrap_or_default();
        return vec![
            TranslationUnit::new(key, message.msgid(), existing, stale).with_comment(comment),
        ];
    };

    // Any empty form makes the whole entry untranslated
    let complete = is_complete(message);
    let form = |n: usize| {
        if complete {
            forms.get(n).cloned().unwrap_or_default()
        } else {
            String::new()
        }
    };
    let plural_existing = if forms.len() > 1 { form(1) } else { form(0) };

    let mut units = vec![
        TranslationUnit::new(key.clone(), message.msgid(), form(0), stale)
            .with_comment(comment.clone()),
    ];
    if !plural.is_empty() {
        units.push(
            TranslationUnit::new(
                format!("{}{}", key, PLURAL_KEY_SUFFIX),
                plural,
                plural_existing,
                stale,
            )
            .with_comment(comment),
        );
    }
    units
}

impl Catalog {
    /// Load and parse the catalog at `path`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let messages = read_catalog(path)
            .with_context(|| format!("Failed to parse catalog: {}", path.display()))?;
        Ok(Self::from_messages(path, messages))
    }

    /// Parse `content` as the catalog stored at `path`
    pub fn parse<P: AsRef<Path>>(path: P, content: &str) -> Result<Self> {
        let path = path.as_ref();
        let messages = parse_catalog(content)
            .with_context(|| format!("Failed to parse catalog: {}", path.display()))?;
        Ok(Self::from_messages(path, messages))
    }

    fn from_messages(path: &Path, messages: Messages) -> Self {
        Self {
            path: path.to_path_buf(),
            messages,
            dirty: false,
        }
    }

    /// File path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Message with lookup key `key` (see `message_key`)
    pub fn message(&self, key: &str) -> Option<&dyn MessageView> {
        self.messages.messages().find(|m| message_key(*m) == key)
    }

    /// Number of messages, header excluded
    pub fn message_count(&self) -> usize {
        self.messages.count()
    }

    /// Plural forms declared by the header
    pub fn nplurals(&self) -> usize {
        self.messages.metadata.plural_rules.nplurals
    }

    /// Whether unsaved changes exist
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Untranslated and fuzzy counts
    pub fn stats(&self) -> CatalogStats {
        let mut stats = CatalogStats::default();
        for message in self.messages.messages().filter(|m| !m.msgid().is_empty()) {
            stats.total += 1;
            if !is_complete(message) {
                stats.untranslated += 1;
            }
            if message.is_fuzzy() {
                stats.fuzzy += 1;
            }
        }
        stats
    }
}

impl CatalogSource for Catalog {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn units(&self) -> Vec<TranslationUnit> {
        self.messages
            .messages()
            .filter(|m| !m.msgid().is_empty())
            .flat_map(|m| message_units(m))
            .collect()
    }

    fn apply(&mut self, translations: &HashMap<String, String>, options: &JobOptions) -> usize {
        let nplurals = self.nplurals();
        let mut changed = 0;

        for mut message in self.messages.messages_mut() {
            if message.msgid().is_empty() {
                continue;
            }
            if !message_units(&message).iter().any(|u| needs_translation(u, options)) {
                continue;
            }

            let key = message_key(&message);
            let Some(singular) = translations.get(&key) else {
                continue;
            };

            if let Ok(forms) = message.msgstr_plural_mut() {
                let plural = translations
                    .get(&format!("{}{}", key, PLURAL_KEY_SUFFIX))
                    .unwrap_or(singular);
                let count = nplurals.max(forms.len()).max(1);
                forms.clear();
                forms.push(singular.clone());
                forms.resize(count, plural.clone());
            } else if message.set_msgstr(singular.clone()).is_err() {
                continue;
            }

            message.flags_mut().remove_flag("fuzzy");
            changed += 1;
        }

        if changed > 0 {
            self.dirty = true;
            debug!("{}: {} entr(ies) updated", self.path.display(), changed);
        }
        changed
    }

    fn save(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        write_catalog(&self.messages, &self.path)
            .with_context(|| format!("Failed to save catalog: {}", self.path.display()))?;
        self.dirty = false;
        Ok(true)
    }
}
