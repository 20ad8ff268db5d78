/*!
 * Translation of database record fields.
 *
 * A translatable field `title` is stored once per language in variant columns
 * such as `title_en`, `title_fr`, `title_pt_br`. The driver builds one unit per
 * (record, field) for the target language, sourced from the first populated
 * source-language variant, and writes accepted translations back with a single
 * bulk update per model.
 *
 * - `FieldRegistry`: which models and fields are translatable, and how
 *   variant columns are named
 * - `RecordStore`: reading records and bulk-updating them
 * - `sqlite`: both capabilities over a SQLite database
 */

use anyhow::{Result, anyhow};
use indicatif::ProgressBar;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::app_config::ModelConfig;
use crate::language_utils::field_suffix;
use crate::translation::{JobOptions, JobReport, TranslationEngine, TranslationUnit};

pub use self::sqlite::SqliteStore;

pub mod sqlite;

/// Primary key of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Text(id) => write!(f, "{}", id),
        }
    }
}

/// One record with the requested column values
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Primary key
    pub id: RecordId,
    /// Column values; `None` for SQL NULL
    pub values: HashMap<String, Option<String>>,
}

impl Record {
    /// Value of `column`, empty or whitespace-only values as `None`
    pub fn populated(&self, column: &str) -> Option<&str> {
        self.values
            .get(column)
            .and_then(|v| v.as_deref())
            .filter(|v| !v.trim().is_empty())
    }
}

/// New value for one column of one record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    /// Record to update
    pub id: RecordId,
    /// Variant column
    pub column: String,
    /// Translated text
    pub value: String,
}

/// Translatable models and fields
pub trait FieldRegistry {
    /// Every registered model
    fn models(&self) -> &[ModelConfig];

    /// Base names of the translatable fields of `model`
    fn translatable_fields(&self, model: &ModelConfig) -> Result<Vec<String>>;

    /// Whether the variant column of `field` for `language` exists
    fn has_variant(&self, model: &ModelConfig, field: &str, language: &str) -> Result<bool>;

    /// Variant column of `field` for `language`
    fn variant_column(&self, field: &str, language: &str) -> String {
        format!("{}_{}", field, field_suffix(language))
    }
}

/// Record query and bulk-update primitives
pub trait RecordStore {
    /// Every record of `model`, with the given columns
    fn fetch_records(&self, model: &ModelConfig, columns: &[String]) -> Result<Vec<Record>>;

    /// Apply `updates` to `model` in one transaction; returns rows changed
    fn bulk_update(&mut self, model: &ModelConfig, updates: &[RecordUpdate]) -> Result<usize>;
}

/// Resolve `Article` or `blog.Article` (case-insensitive) against `models`.
///
/// A bare name matching models of several apps selects all of them.
pub fn parse_model_names(models: &[ModelConfig], names: &[String]) -> Result<Vec<ModelConfig>> {
    let mut selected: Vec<ModelConfig> = Vec::new();

    for name in names {
        let wanted = name.trim();
        let matches: Vec<&ModelConfig> = models
            .iter()
            .filter(|m| match wanted.split_once('.') {
                Some((app, model)) => {
                    m.app_label.eq_ignore_ascii_case(app) && m.name.eq_ignore_ascii_case(model)
                }
                None => m.name.eq_ignore_ascii_case(wanted),
            })
            .collect();

        if matches.is_empty() {
            let available: Vec<String> = models.iter().map(ModelConfig::label).collect();
            return Err(anyhow!(
                "Unknown model '{}'. Registered models: {}",
                wanted,
                if available.is_empty() { "(none)".to_string() } else { available.join(", ") }
            ));
        }

        for model in matches {
            if !selected.contains(model) {
                selected.push(model.clone());
            }
        }
    }

    // Keep registry order
    selected.sort_by_key(|s| models.iter().position(|m| m == s));
    Ok(selected)
}

/// Where an accepted translation goes
#[derive(Debug, Clone)]
struct UnitTarget {
    model: usize,
    id: RecordId,
    column: String,
}

/// Units for one language, with their write-back targets
#[derive(Debug, Default)]
pub struct RecordPlan {
    units: Vec<TranslationUnit>,
    targets: HashMap<String, UnitTarget>,
    per_model: Vec<(String, usize)>,
}

impl RecordPlan {
    /// Units in model, record, field order
    pub fn units(&self) -> &[TranslationUnit] {
        &self.units
    }

    /// Units per model label
    pub fn per_model(&self) -> &[(String, usize)] {
        &self.per_model
    }
}

/// Result of translating record fields for one language
#[derive(Debug, Default)]
pub struct RecordReport {
    /// Target language code
    pub language: String,
    /// Engine report
    pub job: JobReport,
    /// Units per model label
    pub per_model: Vec<(String, usize)>,
    /// Rows updated per model label
    pub updated: Vec<(String, usize)>,
}

impl RecordReport {
    /// Fields written across all models
    pub fn updated_fields(&self) -> usize {
        self.updated.iter().map(|(_, n)| n).sum()
    }
}

/// Runs an engine job over the record fields of the selected models
pub struct RecordTranslator<'a> {
    engine: &'a TranslationEngine,
}

impl<'a> RecordTranslator<'a> {
    /// Create a driver for `engine`
    pub fn new(engine: &'a TranslationEngine) -> Self {
        Self { engine }
    }

    /// Build units for `language` from `models`
    pub fn plan<S: FieldRegistry + RecordStore>(
        store: &S,
        models: &[ModelConfig],
        language: &str,
        source_languages: &[String],
    ) -> Result<RecordPlan> {
        let mut plan = RecordPlan::default();

        for (model_index, model) in models.iter().enumerate() {
            let label = model.label();
            let mut columns: Vec<String> = Vec::new();
            let mut fields: Vec<(String, String, Vec<String>)> = Vec::new();

            for field in store.translatable_fields(model)? {
                if !store.has_variant(model, &field, language)? {
                    warn!("{}.{}: no column for language '{}', skipping", label, field, language);
                    continue;
                }
                let mut sources = Vec::new();
                for source in source_languages {
                    if store.has_variant(model, &field, source)? {
                        sources.push(store.variant_column(&field, source));
                    }
                }
                if sources.is_empty() {
                    warn!("{}.{}: no source-language column, skipping", label, field);
                    continue;
                }

                let target = store.variant_column(&field, language);
                for column in sources.iter().chain(std::iter::once(&target)) {
                    if !columns.contains(column) {
                        columns.push(column.clone());
                    }
                }
                fields.push((field, target, sources));
            }

            if fields.is_empty() {
                plan.per_model.push((label, 0));
                continue;
            }

            let records = store.fetch_records(model, &columns)?;
            let before = plan.units.len();

            for record in &records {
                for (field, target, sources) in &fields {
                    // First populated source wins; never an empty fallback
                    let Some(source) = sources.iter().find_map(|c| record.populated(c)) else {
                        continue;
                    };
                    let existing = record
                        .values
                        .get(target)
                        .and_then(|v| v.clone())
                        .unwrap_or_default();
                    let key = format!("{}:{}:{}", label, record.id, field);

                    plan.targets.insert(
                        key.clone(),
                        UnitTarget {
                            model: model_index,
                            id: record.id.clone(),
                            column: target.clone(),
                        },
                    );
                    plan.units.push(TranslationUnit::new(key, source, existing, false));
                }
            }

            debug!(
                "{}: {} record(s), {} field value(s)",
                label,
                records.len(),
                plan.units.len() - before
            );
            plan.per_model.push((label, plan.units.len() - before));
        }

        Ok(plan)
    }

    /// Translate the record fields of `models` into `language`.
    ///
    /// Nothing is written when the job fails with a job-fatal error or runs
    /// in dry-run mode.
    #[allow(clippy::too_many_arguments)]
    pub async fn translate<S: FieldRegistry + RecordStore>(
        &self,
        store: &mut S,
        models: &[ModelConfig],
        language: &str,
        source_languages: &[String],
        context: Option<&str>,
        options: &JobOptions,
        progress: Option<&ProgressBar>,
    ) -> Result<RecordReport> {
        let plan = Self::plan(store, models, language, source_languages)?;
        let order: Vec<String> = plan.units.iter().map(|u| u.key.clone()).collect();

        let job = self
            .engine
            .run_job(plan.units, language, context, options, progress)
            .await?;

        let mut report = RecordReport {
            language: language.to_string(),
            per_model: plan.per_model,
            ..Default::default()
        };

        if options.dry_run || job.accepted.is_empty() {
            report.job = job;
            return Ok(report);
        }

        let mut by_model: BTreeMap<usize, Vec<RecordUpdate>> = BTreeMap::new();
        for key in &order {
            let (Some(value), Some(target)) = (job.accepted.get(key), plan.targets.get(key)) else {
                continue;
            };
            by_model.entry(target.model).or_default().push(RecordUpdate {
                id: target.id.clone(),
                column: target.column.clone(),
                value: value.clone(),
            });
        }

        for (model_index, updates) in by_model {
            let model = &models[model_index];
            let changed = store.bulk_update(model, &updates)?;
            info!("💾 {}: updated {} field(s)", model.label(), changed);
            report.updated.push((model.label(), changed));
        }

        report.job = job;
        Ok(report)
    }
}
