/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for the supported LLM providers:
 * - OpenAI: chat completions API (also used for LM Studio and other compatible servers)
 * - Anthropic: messages API
 * - DeepL: machine translation API, without prompts or context
 * - Mock: scripted provider for tests
 *
 * Clients only report `ProviderError`s; mapping them onto retry decisions is
 * the job of `translation::retry`.
 */

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::ProviderError;

pub mod anthropic;
pub mod deepl;
pub mod mock;
pub mod openai;

/// Provider-neutral completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// System prompt
    pub system: String,
    /// User message
    pub user: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on generated tokens, when the API requires one
    pub max_output_tokens: Option<u32>,
    /// Source texts of the batch, in payload order
    pub texts: Vec<String>,
    /// Target language code
    pub target_language: String,
}

/// Provider-neutral completion response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    /// Raw text produced by the model
    pub text: String,
    /// Prompt tokens reported by the provider
    pub prompt_tokens: Option<u64>,
    /// Completion tokens reported by the provider
    pub completion_tokens: Option<u64>,
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the translation engine.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Short provider name for logs and statistics
    fn name(&self) -> &str;

    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<CompletionResponse, ProviderError>` - The raw completion or a provider error
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Whether the provider reads the system prompt, and with it the translation context
    fn supports_context(&self) -> bool {
        true
    }

    /// Most strings the API accepts in one request, if it caps them
    fn max_texts_per_request(&self) -> Option<usize> {
        None
    }
}

/// Build the client for the active provider of `config`
pub fn create_provider(config: &TranslationConfig) -> Result<Arc<dyn Provider>> {
    let endpoint = config.get_endpoint();
    let timeout_secs = config.get_timeout_secs();
    let api_key = config.resolve_api_key().unwrap_or_default();

    let provider: Arc<dyn Provider> = match config.provider {
        TranslationProvider::OpenAI => {
            Arc::new(openai::OpenAI::new(api_key, endpoint, timeout_secs)?)
        }
        TranslationProvider::LMStudio => {
            // LM Studio accepts any key
            let api_key = if api_key.is_empty() { "lm-studio".to_string() } else { api_key };
            Arc::new(openai::OpenAI::new(api_key, endpoint, timeout_secs)?.with_name("lmstudio"))
        }
        TranslationProvider::Anthropic => {
            Arc::new(anthropic::Anthropic::new(api_key, endpoint, timeout_secs)?)
        }
        TranslationProvider::DeepL => Arc::new(deepl::DeepL::new(api_key, endpoint, timeout_secs)?),
    };
    Ok(provider)
}

/// Value of a numeric `retry-after` header, in seconds
pub(crate) fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get("retry-after")?.to_str().ok()?.trim();
    value.parse::<f64>().ok().map(|secs| secs.ceil().max(0.0) as u64)
}

/// Whether an error body describes an exhausted balance or quota
pub(crate) fn mentions_billing(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("credit balance")
        || lower.contains("billing")
        || lower.contains("insufficient_quota")
        || lower.contains("exceeded your current quota")
}

/// Map a non-success HTTP status and its body onto a `ProviderError`
pub(crate) fn error_from_status(
    provider: &str,
    status: u16,
    message: String,
    retry_after_secs: Option<u64>,
) -> ProviderError {
    match status {
        401 | 403 => ProviderError::AuthenticationError(format!("{} ({}): {}", provider, status, message)),
        402 => ProviderError::InsufficientCredits(format!("{}: {}", provider, message)),
        400 | 429 if mentions_billing(&message) => {
            ProviderError::InsufficientCredits(format!("{}: {}", provider, message))
        }
        429 => ProviderError::RateLimitExceeded {
            message: format!("{}: {}", provider, message),
            retry_after_secs,
        },
        _ => ProviderError::ApiError {
            status_code: status,
            message,
        },
    }
}

/// Map a transport failure from reqwest onto a `ProviderError`
pub(crate) fn error_from_transport(provider: &str, error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::ConnectionError(format!("{} request timed out: {}", provider, error))
    } else if error.is_connect() {
        ProviderError::ConnectionError(format!("Failed to connect to {}: {}", provider, error))
    } else {
        ProviderError::RequestFailed(format!("Failed to send request to {}: {}", provider, error))
    }
}
