/*!
 * DeepL translation client.
 *
 * DeepL takes the batch texts directly instead of a prompt, so the system
 * prompt and translation context are never sent. Its reply is handed back
 * as a JSON array in payload order, the same shape the LLM providers return.
 */

use async_trait::async_trait;
use anyhow::{Context, Result};
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;
use super::{
    CompletionRequest, CompletionResponse, Provider, error_from_status, error_from_transport,
    retry_after_secs,
};

/// Most texts DeepL accepts in one request
pub const MAX_TEXTS_PER_REQUEST: usize = 50;

const PRO_ENDPOINT: &str = "https://api.deepl.com";
const FREE_ENDPOINT: &str = "https://api-free.deepl.com";

/// DeepL answers this when the character quota is used up
const QUOTA_EXCEEDED_STATUS: u16 = 456;

/// DeepL client
#[derive(Debug)]
pub struct DeepL {
    client: Client,
    api_key: String,
    endpoint: String,
}

/// Body of a `/v2/translate` request
#[derive(Debug, Serialize)]
pub struct DeepLRequest {
    text: Vec<String>,
    target_lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_type: Option<String>,
}

/// Body of a `/v2/translate` response
#[derive(Debug, Deserialize)]
pub struct DeepLResponse {
    pub translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
pub struct DeepLTranslation {
    pub text: String,
    #[serde(default)]
    pub detected_source_language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeepLErrorBody {
    message: Option<String>,
}

/// DeepL target code for a language code (`pt-br` becomes `PT-BR`)
///
/// Bare `en` and `pt` need a regional variant as a target.
pub fn deepl_target(language: &str) -> String {
    match language.to_lowercase().as_str() {
        "en" => "EN-US".to_string(),
        "pt" => "PT-BR".to_string(),
        _ => language.replace('_', "-").to_uppercase(),
    }
}

/// Drop a trailing dot DeepL added to a source that had none
fn strip_added_dot(source: &str, mut translation: String) -> String {
    if !source.ends_with('.') && translation.ends_with('.') && !translation.ends_with("..") {
        translation.pop();
    }
    translation
}

impl DeepLRequest {
    /// Build the request body for a provider-neutral request
    pub fn from_completion(request: &CompletionRequest) -> Self {
        Self {
            text: request.texts.clone(),
            target_lang: deepl_target(&request.target_language),
            model_type: Some(request.model.clone()).filter(|m| !m.is_empty()),
        }
    }
}

impl DeepL {
    /// Create a new DeepL client
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        })
    }

    fn api_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        // Free-plan keys only work against the free host
        let base = if (base.is_empty() || base == PRO_ENDPOINT) && self.api_key.ends_with(":fx") {
            FREE_ENDPOINT
        } else if base.is_empty() {
            PRO_ENDPOINT
        } else {
            base
        };
        format!("{}/v2/translate", base)
    }

    /// Translations in payload order, with added trailing dots removed
    pub fn collect_translations(texts: &[String], response: DeepLResponse) -> Vec<String> {
        texts
            .iter()
            .zip(response.translations)
            .map(|(source, translation)| strip_added_dot(source, translation.text))
            .collect()
    }
}

#[async_trait]
impl Provider for DeepL {
    fn name(&self) -> &str {
        "deepl"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let body = DeepLRequest::from_completion(request);
        debug!(
            "Sending {} texts to {} (target {})",
            body.text.len(),
            self.api_url(),
            body.target_lang
        );

        let response = self
            .client
            .post(self.api_url())
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| error_from_transport("DeepL", e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_secs(response.headers());
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            let message = serde_json::from_str::<DeepLErrorBody>(&error_text)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or(error_text);
            error!("DeepL API error ({}): {}", status, message);
            if status.as_u16() == QUOTA_EXCEEDED_STATUS {
                return Err(ProviderError::InsufficientCredits(format!(
                    "DeepL character quota exceeded: {}",
                    message
                )));
            }
            return Err(error_from_status("DeepL", status.as_u16(), message, retry_after));
        }

        let deepl_response = response
            .json::<DeepLResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse DeepL API response: {}", e)))?;
        if deepl_response.translations.len() != request.texts.len() {
            // Passed through unchanged; reconciliation rejects the count
            let raw: Vec<String> = deepl_response.translations.into_iter().map(|t| t.text).collect();
            return serde_json::to_string(&raw)
                .map(|text| CompletionResponse { text, ..Default::default() })
                .map_err(|e| ProviderError::ParseError(e.to_string()));
        }

        let translations = Self::collect_translations(&request.texts, deepl_response);
        let text = serde_json::to_string(&translations)
            .map_err(|e| ProviderError::ParseError(format!("Failed to encode DeepL translations: {}", e)))?;
        Ok(CompletionResponse {
            text,
            prompt_tokens: None,
            completion_tokens: None,
        })
    }

    fn supports_context(&self) -> bool {
        false
    }

    fn max_texts_per_request(&self) -> Option<usize> {
        Some(MAX_TEXTS_PER_REQUEST)
    }
}
