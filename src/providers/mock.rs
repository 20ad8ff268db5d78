/*!
 * Mock provider implementations for testing.
 *
 * This module provides a provider that never touches the network:
 * - `MockProvider::working()` - Translates every payload item as `[TRANSLATED] <text>`
 * - `MockProvider::failing(kind)` - Always fails with the given error kind
 * - `MockProvider::intermittent(n)` - Fails every Nth request with a 503
 * - `MockProvider::empty()` - Returns empty text
 *
 * Scripted replies queued with `push_reply` / `push_error` take priority over
 * the behavior. Every request is recorded for later inspection.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, Provider};

/// Failure kinds the mock can simulate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockFailure {
    /// HTTP 401
    Authentication,
    /// Exhausted balance
    InsufficientCredits,
    /// HTTP 429 with an optional `retry-after`
    RateLimit { retry_after_secs: Option<u64> },
    /// HTTP 5xx
    Server { status_code: u16 },
    /// Network failure
    Connection,
    /// HTTP 400 unrelated to billing
    BadRequest,
}

impl MockFailure {
    /// Materialize the provider error
    pub fn to_error(self) -> ProviderError {
        match self {
            Self::Authentication => ProviderError::AuthenticationError("Simulated invalid API key".to_string()),
            Self::InsufficientCredits => ProviderError::InsufficientCredits(
                "Your credit balance is too low to access the API".to_string(),
            ),
            Self::RateLimit { retry_after_secs } => ProviderError::RateLimitExceeded {
                message: "Simulated rate limit".to_string(),
                retry_after_secs,
            },
            Self::Server { status_code } => ProviderError::ApiError {
                status_code,
                message: "Simulated provider failure".to_string(),
            },
            Self::Connection => ProviderError::ConnectionError("Simulated connection reset".to_string()),
            Self::BadRequest => ProviderError::ApiError {
                status_code: 400,
                message: "Simulated invalid request".to_string(),
            },
        }
    }
}

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Raw text returned as the completion
    Text(String),
    /// Error returned instead of a completion
    Error(MockFailure),
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing(MockFailure),
    /// Returns empty response
    Empty,
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior once the script is exhausted
    behavior: MockBehavior,
    /// Replies served first, in order
    script: Arc<Mutex<VecDeque<MockReply>>>,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every request received, in order
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    /// Whether the mock claims to read the system prompt
    context_aware: bool,
    /// Strings-per-request cap it reports
    max_texts: Option<usize>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            script: Arc::new(Mutex::new(VecDeque::new())),
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            context_aware: true,
            max_texts: None,
        }
    }

    /// Behave like a machine-translation API that ignores prompts
    pub fn without_context(mut self) -> Self {
        self.context_aware = false;
        self
    }

    /// Report a cap on strings per request
    pub fn with_max_texts(mut self, max_texts: usize) -> Self {
        self.max_texts = Some(max_texts);
        self
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
        })
    }

    /// Create a failing mock provider that always errors
    pub fn failing(failure: MockFailure) -> Self {
        Self::new(MockBehavior::Failing(failure))
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Queue a raw text reply
    pub fn push_reply(&self, text: impl Into<String>) -> &Self {
        self.script.lock().push_back(MockReply::Text(text.into()));
        self
    }

    /// Queue an error reply
    pub fn push_error(&self, failure: MockFailure) -> &Self {
        self.script.lock().push_back(MockReply::Error(failure));
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copy of every request received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    /// Source texts of the JSON payload in a user message
    pub fn payload_texts(user_message: &str) -> Vec<String> {
        let Some(start) = user_message.find('[') else {
            return Vec::new();
        };
        let items: Vec<serde_json::Value> =
            serde_json::from_str(&user_message[start..]).unwrap_or_default();
        items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(text) => Some(text),
                serde_json::Value::Object(map) => map
                    .get("text")
                    .and_then(|t| t.as_str())
                    .map(str::to_string),
                _ => None,
            })
            .collect()
    }

    /// Generate a well-formed reply translating every payload item
    pub fn generate_batch_response(texts: &[String]) -> String {
        let translated: Vec<String> = texts.iter().map(|t| format!("[TRANSLATED] {}", t)).collect();
        serde_json::to_string(&translated).unwrap_or_else(|_| "[]".to_string())
    }

    fn working_response(request: &CompletionRequest) -> CompletionResponse {
        let texts = Self::payload_texts(&request.user);
        CompletionResponse {
            text: Self::generate_batch_response(&texts),
            prompt_tokens: Some((request.system.len() + request.user.len()) as u64 / 4),
            completion_tokens: Some(texts.iter().map(|t| t.len() as u64).sum::<u64>() / 4),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn supports_context(&self) -> bool {
        self.context_aware
    }

    fn max_texts_per_request(&self) -> Option<usize> {
        self.max_texts
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let scripted = self.script.lock().pop_front();
        if let Some(reply) = scripted {
            return match reply {
                MockReply::Text(text) => Ok(CompletionResponse {
                    text,
                    prompt_tokens: Some(10),
                    completion_tokens: Some(10),
                }),
                MockReply::Error(failure) => Err(failure.to_error()),
            };
        }

        match self.behavior {
            MockBehavior::Working => Ok(Self::working_response(request)),
            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(Self::working_response(request))
                }
            }
            MockBehavior::Failing(failure) => Err(failure.to_error()),
            MockBehavior::Empty => Ok(CompletionResponse::default()),
        }
    }
}
