/*!
 * Core translation engine.
 *
 * The engine runs one job's units through selection, batching, prompting,
 * the classified provider call and reconciliation. Batches are processed one
 * at a time. A job-fatal error stops the job and is returned as `Err`; a
 * batch-fatal error is recorded in the report and the job moves on.
 */

use indicatif::ProgressBar;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::app_config::TranslationConfig;
use crate::errors::TranslateError;
use crate::providers::{CompletionRequest, Provider};
use super::batch::BatchBuilder;
use super::prompts::TranslationPromptBuilder;
use super::response::reconcile;
use super::retry::{RetryDecision, RetryPolicy, RetryState, call_provider};
use super::selection::select_units;
use super::unit::{Batch, JobOptions, OutcomeStatus, TranslationOutcome, TranslationUnit};

/// Units listed in a dry-run report
pub const DRY_RUN_SAMPLE_SIZE: usize = 10;

/// Token usage statistics for tracking API consumption
#[derive(Debug, Clone)]
pub struct TokenUsageStats {
    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,

    /// Total number of tokens
    pub total_tokens: u64,

    /// Number of provider calls, retries included
    pub requests: u64,

    /// Start time of token tracking
    pub start_time: Instant,

    /// Total time spent on API requests
    pub api_duration: Duration,

    /// Provider name
    pub provider: String,

    /// Model name
    pub model: String,
}

impl Default for TokenUsageStats {
    fn default() -> Self {
        Self::with_provider_info(String::new(), String::new())
    }
}

impl TokenUsageStats {
    /// Create new token usage stats with provider info
    pub fn with_provider_info(provider: String, model: String) -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            requests: 0,
            start_time: Instant::now(),
            api_duration: Duration::from_secs(0),
            provider,
            model,
        }
    }

    /// Add the usage reported for one call
    pub fn add_token_usage(&mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>) {
        if let Some(pt) = prompt_tokens {
            self.prompt_tokens += pt;
            self.total_tokens += pt;
        }

        if let Some(ct) = completion_tokens {
            self.completion_tokens += ct;
            self.total_tokens += ct;
        }
    }

    /// Calculate tokens per minute rate
    pub fn tokens_per_minute(&self) -> f64 {
        let duration_minutes = if self.api_duration.as_secs_f64() > 0.0 {
            self.api_duration.as_secs_f64() / 60.0
        } else {
            self.start_time.elapsed().as_secs_f64() / 60.0
        };

        if duration_minutes > 0.0 {
            self.total_tokens as f64 / duration_minutes
        } else {
            0.0
        }
    }

    /// Generate a summary of token usage
    pub fn summary(&self) -> String {
        let elapsed_minutes = self.start_time.elapsed().as_secs_f64() / 60.0;
        let api_minutes = self.api_duration.as_secs_f64() / 60.0;

        format!(
            "Token Usage Summary:\n\
             Provider: {}\n\
             Model: {}\n\
             Requests: {}\n\
             Prompt tokens: {}\n\
             Completion tokens: {}\n\
             Total tokens: {}\n\
             Elapsed time: {:.2} minutes\n\
             API request time: {:.2} minutes\n\
             Tokens per minute: {:.2}",
            self.provider,
            self.model,
            self.requests,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            elapsed_minutes,
            api_minutes,
            self.tokens_per_minute()
        )
    }
}

/// Engine settings, resolved from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Model identifier sent with every request
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Explicit batch budget; derived from `max_tokens` when absent
    pub max_batch_chars: Option<usize>,
    /// Model context size, in tokens
    pub max_tokens: usize,
    /// Retry policy
    pub retry: RetryPolicy,
    /// Write translations that lost a placeholder
    pub accept_placeholder_mismatch: bool,
}

impl EngineSettings {
    /// Resolve settings for the active provider
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            model: config.get_model(),
            temperature: config.common.temperature,
            max_batch_chars: config.get_max_chars_per_request(),
            max_tokens: config.get_max_tokens(),
            retry: RetryPolicy::from_config(&config.common),
            accept_placeholder_mismatch: config.common.accept_placeholder_mismatch,
        }
    }
}

/// A batch that could not be translated
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    /// Keys of the units in the batch
    pub unit_keys: Vec<String>,
    /// Final error
    pub error: TranslateError,
}

/// Result of one job
#[derive(Debug, Clone, Default)]
pub struct JobReport {
    /// Target language code
    pub target_language: String,
    /// Whether the job ran in dry-run mode
    pub dry_run: bool,
    /// Units offered to the engine
    pub total_units: usize,
    /// Units that needed translation
    pub selected_units: usize,
    /// Dry run only: (key, source) of the first units that would be sent
    pub sample: Vec<(String, String)>,
    /// Number of batches planned
    pub batches: usize,
    /// One outcome per unit of every completed batch
    pub outcomes: Vec<TranslationOutcome>,
    /// Accepted translations by unit key
    pub accepted: HashMap<String, String>,
    /// Batches that failed after retries
    pub failed_batches: Vec<BatchFailure>,
}

impl JobReport {
    /// Outcomes with a given status
    pub fn count_status(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Units left untranslated because their batch failed
    pub fn failed_units(&self) -> usize {
        self.failed_batches.iter().map(|f| f.unit_keys.len()).sum()
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        if self.dry_run {
            return format!(
                "{}: {} of {} string(s) would be translated in {} batch(es)",
                self.target_language, self.selected_units, self.total_units, self.batches
            );
        }
        format!(
            "{}: {} translated, {} placeholder mismatch(es), {} missing, {} failed in {} batch(es)",
            self.target_language,
            self.accepted.len(),
            self.count_status(OutcomeStatus::PlaceholderMismatch),
            self.count_status(OutcomeStatus::Missing),
            self.failed_units(),
            self.failed_batches.len()
        )
    }
}

/// Sequential translation engine bound to one provider
#[derive(Debug)]
pub struct TranslationEngine {
    /// Provider client
    provider: Arc<dyn Provider>,
    /// Engine settings
    settings: EngineSettings,
    /// Token usage accumulated over every job of this engine
    token_stats: Arc<Mutex<TokenUsageStats>>,
}

impl TranslationEngine {
    /// Create an engine for `provider`
    pub fn new(provider: Arc<dyn Provider>, settings: EngineSettings) -> Self {
        let stats = TokenUsageStats::with_provider_info(provider.name().to_string(), settings.model.clone());
        Self {
            provider,
            settings,
            token_stats: Arc::new(Mutex::new(stats)),
        }
    }

    /// Engine settings
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Snapshot of the token usage so far
    pub async fn token_usage(&self) -> TokenUsageStats {
        self.token_stats.lock().await.clone()
    }

    /// Batch builder for prompts rendered by `prompts`
    pub fn batch_builder(&self, prompts: &TranslationPromptBuilder) -> BatchBuilder {
        let builder = match self.settings.max_batch_chars {
            Some(chars) => BatchBuilder::new(chars),
            None => BatchBuilder::from_token_limit(self.settings.max_tokens, prompts.overhead_chars()),
        };
        builder.with_max_units(self.provider.max_texts_per_request())
    }

    /// Select the units needing translation and split them into batches
    pub fn plan(
        &self,
        units: Vec<TranslationUnit>,
        options: &JobOptions,
        prompts: &TranslationPromptBuilder,
    ) -> Vec<Batch> {
        let selected = select_units(units, options);
        self.batch_builder(prompts).build(selected)
    }

    fn completion_request(&self, batch: &Batch, prompts: &TranslationPromptBuilder) -> CompletionRequest {
        let prompt = prompts.build(batch);
        CompletionRequest {
            model: self.settings.model.clone(),
            system: prompt.system,
            user: prompt.user,
            temperature: self.settings.temperature,
            max_output_tokens: None,
            texts: batch.units().iter().map(|u| u.source_text.clone()).collect(),
            target_language: prompts.target_language().to_string(),
        }
    }

    /// Translate one batch, retrying under the policy.
    ///
    /// Returns the outcomes, or the error that ended the batch.
    pub async fn translate_batch(
        &self,
        batch: &Batch,
        prompts: &TranslationPromptBuilder,
    ) -> Result<Vec<TranslationOutcome>, TranslateError> {
        let request = self.completion_request(batch, prompts);
        let mut state = RetryState::default();

        loop {
            let started = Instant::now();
            let result = call_provider(self.provider.as_ref(), &request).await;
            {
                let mut stats = self.token_stats.lock().await;
                stats.requests += 1;
                stats.api_duration += started.elapsed();
                if let Ok(response) = &result {
                    stats.add_token_usage(response.prompt_tokens, response.completion_tokens);
                }
            }

            let error = match result.and_then(|response| reconcile(batch, &response.text)) {
                Ok(outcomes) => return Ok(outcomes),
                Err(error) => error,
            };

            let failures = state.record(&error);
            match self.settings.retry.decide(&error, failures) {
                RetryDecision::RetryAfter(wait) => {
                    self.settings.retry.log_retry(&error, failures, wait);
                    if !wait.is_zero() {
                        tokio::time::sleep(wait).await;
                    }
                }
                RetryDecision::AbortBatch | RetryDecision::AbortJob => return Err(error),
            }
        }
    }

    /// Run one job over `units`.
    ///
    /// `Err` is returned only for job-fatal errors; the caller must then
    /// write nothing for this job.
    pub async fn run_job(
        &self,
        units: Vec<TranslationUnit>,
        target_language: &str,
        context: Option<&str>,
        options: &JobOptions,
        progress: Option<&ProgressBar>,
    ) -> Result<JobReport, TranslateError> {
        let context = match context {
            Some(_) if !self.provider.supports_context() => {
                warn!(
                    "{} does not take translation context; TRANSLATING.md is not sent",
                    self.provider.name()
                );
                None
            }
            other => other,
        };
        let prompts = TranslationPromptBuilder::new(target_language).with_context(context);
        let total_units = units.len();
        let batches = self.plan(units, options, &prompts);
        let selected_units: usize = batches.iter().map(Batch::len).sum();

        let mut report = JobReport {
            target_language: target_language.to_string(),
            dry_run: options.dry_run,
            total_units,
            selected_units,
            batches: batches.len(),
            ..Default::default()
        };

        debug!(
            "{}: {} of {} unit(s) selected, {} batch(es)",
            target_language,
            selected_units,
            total_units,
            batches.len()
        );

        if options.dry_run {
            report.sample = batches
                .iter()
                .flat_map(|b| b.units())
                .take(DRY_RUN_SAMPLE_SIZE)
                .map(|u| (u.key.clone(), u.source_text.clone()))
                .collect();
            return Ok(report);
        }

        if let Some(pb) = progress {
            pb.inc_length(batches.len() as u64);
        }

        for (index, batch) in batches.iter().enumerate() {
            debug!(
                "Translating batch {}/{} ({} unit(s), {} chars)",
                index + 1,
                batches.len(),
                batch.len(),
                batch.serialized_size()
            );

            match self.translate_batch(batch, &prompts).await {
                Ok(outcomes) => {
                    for outcome in &outcomes {
                        if outcome.is_accepted(self.settings.accept_placeholder_mismatch) {
                            if let Some(text) = &outcome.translated_text {
                                report.accepted.insert(outcome.unit_key.clone(), text.clone());
                            }
                        }
                    }
                    report.outcomes.extend(outcomes);
                }
                Err(error) if error.is_job_fatal() => {
                    error!("{}: aborting job: {}", target_language, error);
                    return Err(error);
                }
                Err(error) => {
                    warn!(
                        "{}: batch {}/{} failed, {} string(s) left untranslated: {}",
                        target_language,
                        index + 1,
                        batches.len(),
                        batch.len(),
                        error
                    );
                    report.failed_batches.push(BatchFailure {
                        unit_keys: batch.units().iter().map(|u| u.key.clone()).collect(),
                        error,
                    });
                }
            }

            if let Some(pb) = progress {
                pb.inc(1);
            }
        }

        info!("{}", report.summary());
        Ok(report)
    }
}
