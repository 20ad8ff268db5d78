/*!
 * Error classification and retry policy.
 *
 * `call_provider` is the only way the engine talks to a provider: it maps
 * every `ProviderError` into the closed `TranslateError` taxonomy. The
 * `RetryPolicy` then decides, per failure, whether to wait and retry, give up
 * on the batch, or stop the whole job.
 */

use log::{debug, warn};
use std::time::Duration;

use crate::app_config::TranslationCommonConfig;
use crate::errors::{ProviderError, TranslateError};
use crate::providers::{CompletionRequest, CompletionResponse, Provider};

/// Backoff ceiling, whatever the attempt number
pub const MAX_BACKOFF: Duration = Duration::from_secs(15 * 60);

fn billing_related(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("credit") || lower.contains("billing") || lower.contains("quota")
}

/// Map a provider-level error onto the translation taxonomy
pub fn classify(error: ProviderError) -> TranslateError {
    match error {
        ProviderError::AuthenticationError(message) => TranslateError::Authentication(message),
        ProviderError::InsufficientCredits(message) => TranslateError::InsufficientCredits(message),
        ProviderError::RateLimitExceeded {
            message,
            retry_after_secs,
        } => TranslateError::RateLimit {
            message,
            retry_after_secs,
        },
        ProviderError::ConnectionError(message) | ProviderError::RequestFailed(message) => {
            TranslateError::TransientProvider(message)
        }
        ProviderError::ParseError(message) => TranslateError::MalformedResponse {
            reason: message,
            preview: String::new(),
        },
        ProviderError::ApiError {
            status_code,
            message,
        } => match status_code {
            401 | 403 => TranslateError::Authentication(message),
            402 => TranslateError::InsufficientCredits(message),
            400..=499 if billing_related(&message) && status_code != 429 => {
                TranslateError::InsufficientCredits(message)
            }
            429 => TranslateError::RateLimit {
                message,
                retry_after_secs: None,
            },
            408 | 409 | 500..=599 => {
                TranslateError::TransientProvider(format!("HTTP {}: {}", status_code, message))
            }
            _ => TranslateError::RequestRejected(format!("HTTP {}: {}", status_code, message)),
        },
    }
}

/// Call `provider` once, classifying any failure
pub async fn call_provider(
    provider: &dyn Provider,
    request: &CompletionRequest,
) -> Result<CompletionResponse, TranslateError> {
    provider.complete(request).await.map_err(|e| {
        let classified = classify(e);
        debug!("{} call failed: {} ({})", provider.name(), classified, classified.kind());
        classified
    })
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait, then send the same batch again
    RetryAfter(Duration),
    /// Give up on this batch; its units stay untranslated
    AbortBatch,
    /// Stop the job before anything is written
    AbortJob,
}

/// Failure counters of one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Rate-limit and transient failures so far
    pub provider_failures: u32,
    /// Unparseable replies so far
    pub malformed_failures: u32,
}

impl RetryState {
    /// Count `error` and return the number of failures of its kind, including it
    pub fn record(&mut self, error: &TranslateError) -> u32 {
        match error {
            TranslateError::MalformedResponse { .. } => {
                self.malformed_failures += 1;
                self.malformed_failures
            }
            _ => {
                self.provider_failures += 1;
                self.provider_failures
            }
        }
    }
}

/// Bounded retry policy, built from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts for rate-limit and transient failures
    pub max_attempts: u32,
    /// Base backoff for transient failures
    pub backoff: Duration,
    /// Base backoff for rate limits without a server hint
    pub rate_limit_backoff: Duration,
    /// Extra attempts after an unparseable reply
    pub malformed_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&TranslationCommonConfig::default())
    }
}

/// `base × 2^(attempt−1)`, capped
fn exponential(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

impl RetryPolicy {
    /// Build the policy from the common translation settings
    pub fn from_config(config: &TranslationCommonConfig) -> Self {
        Self {
            max_attempts: config.retry_count.max(1),
            backoff: Duration::from_millis(config.retry_backoff_ms),
            rate_limit_backoff: Duration::from_millis(config.rate_limit_backoff_ms),
            malformed_retries: config.malformed_retry_count,
        }
    }

    /// Policy without waits, for tests and dry benchmarks
    pub fn immediate(max_attempts: u32, malformed_retries: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Duration::ZERO,
            rate_limit_backoff: Duration::ZERO,
            malformed_retries,
        }
    }

    /// Decide what follows the `failures`-th failure of this kind
    pub fn decide(&self, error: &TranslateError, failures: u32) -> RetryDecision {
        match error {
            TranslateError::Authentication(_) | TranslateError::InsufficientCredits(_) => {
                RetryDecision::AbortJob
            }
            TranslateError::RateLimit {
                retry_after_secs, ..
            } => {
                if failures >= self.max_attempts {
                    return RetryDecision::AbortBatch;
                }
                let wait = match retry_after_secs {
                    Some(secs) => Duration::from_secs(*secs).min(MAX_BACKOFF),
                    None => exponential(self.rate_limit_backoff, failures),
                };
                RetryDecision::RetryAfter(wait)
            }
            TranslateError::TransientProvider(_) => {
                if failures >= self.max_attempts {
                    RetryDecision::AbortBatch
                } else {
                    RetryDecision::RetryAfter(exponential(self.backoff, failures))
                }
            }
            TranslateError::MalformedResponse { .. } => {
                if failures > self.malformed_retries {
                    RetryDecision::AbortBatch
                } else {
                    RetryDecision::RetryAfter(exponential(self.backoff, failures))
                }
            }
            TranslateError::RequestRejected(_) | TranslateError::Reconciliation { .. } => {
                RetryDecision::AbortBatch
            }
        }
    }

    /// Log a retry in the usual format
    pub fn log_retry(&self, error: &TranslateError, failures: u32, wait: Duration) {
        let limit = match error {
            TranslateError::MalformedResponse { .. } => self.malformed_retries + 1,
            _ => self.max_attempts,
        };
        warn!(
            "{}; retrying in {:.1}s (attempt {}/{})",
            error,
            wait.as_secs_f32(),
            failures + 1,
            limit
        );
    }
}
