use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::catalog::{Catalog, CatalogGroup, CatalogReport, CatalogStats, CatalogTranslator, all_catalog_paths, find_catalogs};
use crate::context::ContextResolver;
use crate::errors::TranslateError;
use crate::language_utils::display_name;
use crate::providers::{Provider, create_provider};
use crate::records::{FieldRegistry, RecordReport, RecordTranslator, SqliteStore, parse_model_names};
use crate::translation::{EngineSettings, JobOptions, TranslationEngine};
use crate::translation::response::preview;

// @module: Application controller for catalog and record translation

/// What one `translate` run covers
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Target languages; empty means every configured language
    pub target_languages: Vec<String>,
    /// Restrict catalogs to these apps
    pub apps: Vec<String>,
    /// Job options shared by every language
    pub job: JobOptions,
}

impl RunOptions {
    /// Whether the run translates record fields instead of catalogs
    pub fn translates_records(&self) -> bool {
        self.job.selected_model_names.is_some()
    }
}

/// Outcome of one language
#[derive(Debug)]
pub struct LanguageResult {
    /// Target language code
    pub language: String,
    /// Catalog report, when catalogs were translated
    pub catalogs: Option<CatalogReport>,
    /// Record report, when record fields were translated
    pub records: Option<RecordReport>,
    /// Error that stopped this language
    pub error: Option<String>,
}

/// Outcome of a run
#[derive(Debug, Default)]
pub struct RunSummary {
    /// One entry per language, in processing order
    pub results: Vec<LanguageResult>,
}

impl RunSummary {
    /// Languages that stopped with an error
    pub fn failed_languages(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.error.is_some())
            .map(|r| r.language.as_str())
            .collect()
    }
}

/// Result of the `check` command
#[derive(Debug, Default)]
pub struct CheckReport {
    /// Counts per catalog
    pub catalogs: Vec<(PathBuf, CatalogStats)>,
}

impl CheckReport {
    /// Whether any catalog has untranslated or fuzzy entries
    pub fn has_issues(&self) -> bool {
        self.catalogs.iter().any(|(_, stats)| stats.has_issues())
    }
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Directories searched for the project context file
    context_dirs: Vec<PathBuf>,
    // @field: Engine shared by every language of the run
    engine: TranslationEngine,
}

impl Controller {
    // @method: Create a controller with the provider named in the configuration
    pub fn with_config(config: Config, config_dir: Option<&Path>) -> Result<Self> {
        let provider = create_provider(&config.translation)?;
        Ok(Self::with_provider(config, config_dir, provider))
    }

    /// Create a controller around an existing provider
    pub fn with_provider(config: Config, config_dir: Option<&Path>, provider: Arc<dyn Provider>) -> Self {
        let settings = EngineSettings::from_config(&config.translation);
        let mut context_dirs: Vec<PathBuf> = config_dir.map(Path::to_path_buf).into_iter().collect();
        if let Ok(cwd) = std::env::current_dir() {
            if !context_dirs.contains(&cwd) {
                context_dirs.push(cwd);
            }
        }
        Self {
            config,
            context_dirs,
            engine: TranslationEngine::new(provider, settings),
        }
    }

    /// Replace the directories searched for the project context file
    pub fn with_context_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.context_dirs = dirs;
        self
    }

    /// Translation engine
    pub fn engine(&self) -> &TranslationEngine {
        &self.engine
    }

    /// Run every target language as an independent job
    pub async fn run(&self, options: &RunOptions) -> Result<RunSummary> {
        let start_time = Instant::now();
        let languages = if options.target_languages.is_empty() {
            self.config.languages.clone()
        } else {
            options.target_languages.clone()
        };
        if languages.is_empty() {
            return Err(anyhow!("No target language given and none configured"));
        }

        info!(
            "🚀 translatebot: {} - {}",
            self.config.translation.provider.display_name(),
            self.config.translation.get_model()
        );
        if options.job.dry_run {
            info!("🔍 Dry run: nothing will be sent or written");
        }

        let mut resolver = ContextResolver::new(&self.context_dirs);
        let mut summary = RunSummary::default();

        for language in &languages {
            if languages.len() > 1 {
                info!("🌍 Processing language: {}", display_name(language));
            }

            let mut result = LanguageResult {
                language: language.clone(),
                catalogs: None,
                records: None,
                error: None,
            };

            let outcome = if options.translates_records() {
                let context = resolver.project_context().map(str::to_string);
                self.translate_records(language, context.as_deref(), &options.job)
                    .await
                    .map(|report| result.records = Some(report))
            } else {
                self.translate_catalogs(language, &options.apps, &options.job, &mut resolver)
                    .await
                    .map(|report| result.catalogs = Some(report))
            };

            if let Err(e) = outcome {
                match e.downcast_ref::<TranslateError>() {
                    Some(fatal) if fatal.is_job_fatal() => {
                        error!("{}: stopped, nothing written: {}", language, fatal);
                    }
                    _ => error!("{}: {:#}", language, e),
                }
                result.error = Some(format!("{:#}", e));
            }
            summary.results.push(result);
        }

        let usage = self.engine.token_usage().await;
        if usage.total_tokens > 0 {
            info!("🔢 {}", usage.summary());
        }
        info!("Finished in {}", Self::format_duration(start_time.elapsed()));

        Ok(summary)
    }

    /// Translate the catalogs of one language
    async fn translate_catalogs(
        &self,
        language: &str,
        apps: &[String],
        options: &JobOptions,
        resolver: &mut ContextResolver,
    ) -> Result<CatalogReport> {
        let locations = find_catalogs(&self.config.catalog, language, apps)?;

        let mut items = Vec::new();
        for location in &locations {
            let catalog = Catalog::load(&location.path)?;
            items.push((resolver.context_for(&location.base_dir), catalog));
        }
        let mut groups = CatalogGroup::group(items);

        let progress = self.progress_bar(language, options);
        let result = CatalogTranslator::new(&self.engine)
            .translate(&mut groups, language, options, progress.as_ref())
            .await;
        if let Some(pb) = &progress {
            pb.finish_and_clear();
        }
        let report = result?;

        if report.selected_units() == 0 {
            info!("✨ Language '{}': already up to date", language);
        } else if options.dry_run {
            Self::log_sample(language, report.selected_units(), &report.sample());
        } else {
            info!(
                "✨ Language '{}': {} entr(ies) updated in {} file(s)",
                language,
                report.updated_entries,
                report.written.len()
            );
            if report.failed_units() > 0 {
                warn!("{} string(s) left untranslated, run again to retry", report.failed_units());
            }
        }
        Ok(report)
    }

    /// Translate the record fields of one language
    async fn translate_records(&self, language: &str, context: Option<&str>, options: &JobOptions) -> Result<RecordReport> {
        let db_path = self
            .config
            .records
            .database_path
            .as_ref()
            .ok_or_else(|| anyhow!("`records.database_path` is not configured"))?;

        let source_languages = self.config.source_languages_for(language);
        let mut store_languages = source_languages.clone();
        store_languages.push(language.to_string());
        let mut store = SqliteStore::open(db_path, self.config.records.models.clone(), store_languages)
            .context("Failed to open the record database")?;

        let models = match options.selected_model_names.as_deref() {
            Some(names) if !names.is_empty() => parse_model_names(store.models(), names)?,
            _ => store.models().to_vec(),
        };
        if models.is_empty() {
            return Err(anyhow!("No models registered in `records.models`"));
        }

        let progress = self.progress_bar(language, options);
        let result = RecordTranslator::new(&self.engine)
            .translate(&mut store, &models, language, &source_languages, context, options, progress.as_ref())
            .await;
        if let Some(pb) = &progress {
            pb.finish_and_clear();
        }
        let report = result?;

        for (label, count) in &report.per_model {
            info!("  • {}: {} field value(s)", label, count);
        }
        if report.job.selected_units == 0 {
            info!("✨ Language '{}': no untranslated model fields", language);
        } else if options.dry_run {
            Self::log_sample(language, report.job.selected_units, &report.job.sample);
        } else {
            info!("✨ Language '{}': {} model field(s) updated", language, report.updated_fields());
        }
        Ok(report)
    }

    /// Untranslated and fuzzy counts of every discovered catalog
    pub fn check(config: &Config) -> Result<CheckReport> {
        let mut report = CheckReport::default();
        for path in all_catalog_paths(&config.catalog)? {
            let stats = Catalog::load(&path)?.stats();
            if stats.has_issues() {
                warn!(
                    "{}: {} untranslated, {} fuzzy of {}",
                    path.display(),
                    stats.untranslated,
                    stats.fuzzy,
                    stats.total
                );
            } else {
                info!("{}: complete ({} entries)", path.display(), stats.total);
            }
            report.catalogs.push((path, stats));
        }
        if report.catalogs.is_empty() {
            warn!("No catalogs found");
        }
        Ok(report)
    }

    fn log_sample(language: &str, count: usize, sample: &[(String, String)]) {
        info!("🔍 Language '{}': {} string(s) would be translated", language, count);
        for (_, source) in sample {
            info!("  • {}", preview(source, 60));
        }
        if count > sample.len() {
            info!("  … and {} more", count - sample.len());
        }
    }

    /// Progress bar ticking once per batch; none in dry-run mode
    fn progress_bar(&self, language: &str, options: &JobOptions) -> Option<ProgressBar> {
        if options.dry_run {
            return None;
        }
        let progress_bar = ProgressBar::new(0);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message(display_name(language));
        Some(progress_bar)
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
