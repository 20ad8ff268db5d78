/*!
 * Catalog translation driver.
 *
 * Catalogs of one language are grouped by effective context. Each group is
 * one engine job: units are deduplicated by key across the group's catalogs,
 * translated once, then applied to every catalog containing them. Files are
 * written only after every group finished, so a job-fatal error leaves all
 * catalogs of the language untouched.
 */

use anyhow::Result;
use indicatif::ProgressBar;
use log::{debug, info};
use std::collections::HashMap;

use super::CatalogSource;
use crate::translation::selection::needs_translation;
use crate::translation::{JobOptions, JobReport, TranslationEngine, TranslationUnit};
use crate::translation::core::DRY_RUN_SAMPLE_SIZE;

/// Catalogs sharing one effective context
#[derive(Debug)]
pub struct CatalogGroup<S> {
    /// Context for the system prompt
    pub context: Option<String>,
    /// Catalogs of the group
    pub catalogs: Vec<S>,
}

impl<S> CatalogGroup<S> {
    /// Group catalogs by context, keeping first-seen order
    pub fn group(items: Vec<(Option<String>, S)>) -> Vec<CatalogGroup<S>> {
        let mut groups: Vec<CatalogGroup<S>> = Vec::new();
        for (context, catalog) in items {
            match groups.iter_mut().find(|g| g.context == context) {
                Some(group) => group.catalogs.push(catalog),
                None => groups.push(CatalogGroup {
                    context,
                    catalogs: vec![catalog],
                }),
            }
        }
        groups
    }
}

/// Result of translating the catalogs of one language
#[derive(Debug, Default)]
pub struct CatalogReport {
    /// Target language code
    pub language: String,
    /// One report per context group
    pub jobs: Vec<JobReport>,
    /// Entries changed across all catalogs
    pub updated_entries: usize,
    /// Catalogs rewritten
    pub written: Vec<String>,
}

impl CatalogReport {
    /// Units that needed translation
    pub fn selected_units(&self) -> usize {
        self.jobs.iter().map(|j| j.selected_units).sum()
    }

    /// Dry-run sample over every group
    pub fn sample(&self) -> Vec<(String, String)> {
        self.jobs
            .iter()
            .flat_map(|j| j.sample.iter().cloned())
            .take(DRY_RUN_SAMPLE_SIZE)
            .collect()
    }

    /// Units left untranslated by failed batches
    pub fn failed_units(&self) -> usize {
        self.jobs.iter().map(JobReport::failed_units).sum()
    }
}

/// Runs engine jobs over catalog groups
pub struct CatalogTranslator<'a> {
    engine: &'a TranslationEngine,
}

impl<'a> CatalogTranslator<'a> {
    /// Create a driver for `engine`
    pub fn new(engine: &'a TranslationEngine) -> Self {
        Self { engine }
    }

    /// Units of every catalog, one per key.
    ///
    /// When a key appears in several catalogs, the first occurrence that
    /// needs translation wins, so a key current in one catalog but missing in
    /// another is still sent.
    pub fn collect_units<S: CatalogSource>(catalogs: &[S], options: &JobOptions) -> Vec<TranslationUnit> {
        let mut units: Vec<TranslationUnit> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for catalog in catalogs {
            for unit in catalog.units() {
                match index.get(&unit.key) {
                    Some(&position) => {
                        if !needs_translation(&units[position], options) && needs_translation(&unit, options) {
                            units[position] = unit;
                        }
                    }
                    None => {
                        index.insert(unit.key.clone(), units.len());
                        units.push(unit);
                    }
                }
            }
        }
        units
    }

    /// Translate every group, then write changed catalogs once.
    ///
    /// A job-fatal error is returned before anything is written.
    pub async fn translate<S: CatalogSource>(
        &self,
        groups: &mut [CatalogGroup<S>],
        language: &str,
        options: &JobOptions,
        progress: Option<&ProgressBar>,
    ) -> Result<CatalogReport> {
        let mut report = CatalogReport {
            language: language.to_string(),
            ..Default::default()
        };

        for group in groups.iter() {
            let units = Self::collect_units(&group.catalogs, options);
            debug!(
                "{}: {} catalog(s), {} unique string(s), context: {}",
                language,
                group.catalogs.len(),
                units.len(),
                if group.context.is_some() { "yes" } else { "no" }
            );
            let job = self
                .engine
                .run_job(units, language, group.context.as_deref(), options, progress)
                .await?;
            report.jobs.push(job);
        }

        if options.dry_run {
            return Ok(report);
        }

        for (group, job) in groups.iter_mut().zip(&report.jobs) {
            if job.accepted.is_empty() {
                continue;
            }
            for catalog in group.catalogs.iter_mut() {
                report.updated_entries += catalog.apply(&job.accepted, options);
            }
        }

        for group in groups.iter_mut() {
            for catalog in group.catalogs.iter_mut() {
                if catalog.save()? {
                    info!("💾 Saved {}", catalog.name());
                    report.written.push(catalog.name());
                }
            }
        }

        Ok(report)
    }
}
