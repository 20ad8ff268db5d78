/*!
 * Error types for the translatebot application.
 *
 * Three layers, all built with thiserror:
 * - `ProviderError`: raised by provider clients (transport, HTTP status, envelope parsing)
 * - `TranslateError`: the closed taxonomy the translation engine works with
 * - `AppError`: application-level wrapper used by the controller and the binary
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Error message from the API
        message: String,
        /// Value of the `retry-after` header, when the provider sent one
        retry_after_secs: Option<u64>,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The account has no credit left
    #[error("Insufficient credits: {0}")]
    InsufficientCredits(String),
}

/// Closed failure taxonomy of the translation engine.
///
/// Every provider failure is mapped into one of these kinds by
/// `translation::retry::classify`; the response reconciler raises the last two.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslateError {
    /// Invalid or missing credentials. Fatal for the whole job.
    #[error(
        "Authentication failed: {0}\n\
         Please check your API key configuration.\n\
         Set `api_key` for the provider in the config file or the TRANSLATEBOT_API_KEY environment variable."
    )]
    Authentication(String),

    /// The account cannot pay for the request. Fatal for the whole job.
    #[error(
        "Insufficient API credits: {0}\n\
         Your credit balance is too low to access the API.\n\
         Please visit your API provider's billing page to add credits."
    )]
    InsufficientCredits(String),

    /// The provider throttled the request.
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        /// Provider message
        message: String,
        /// Server-suggested wait, in seconds
        retry_after_secs: Option<u64>,
    },

    /// Network failure or provider-side 5xx.
    #[error("Transient provider error: {0}")]
    TransientProvider(String),

    /// Any other client-side rejection (e.g. HTTP 400 that is not a billing issue).
    #[error("API request rejected: {0}")]
    RequestRejected(String),

    /// The reply did not contain a parseable JSON array of strings.
    #[error("Malformed response from provider: {reason} (content preview: {preview})")]
    MalformedResponse {
        /// Why parsing failed
        reason: String,
        /// First characters of the offending content
        preview: String,
    },

    /// The reply parsed but its length differs from the batch size.
    #[error("Reconciliation failed: expected {expected} translations, received {received}")]
    Reconciliation {
        /// Units in the batch
        expected: usize,
        /// Strings in the reply
        received: usize,
    },
}

impl TranslateError {
    /// Whether this error must stop the whole job
    pub fn is_job_fatal(&self) -> bool {
        matches!(self, Self::Authentication(_) | Self::InsufficientCredits(_))
    }

    /// Short machine-friendly name of the error kind, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "authentication",
            Self::InsufficientCredits(_) => "insufficient_credits",
            Self::RateLimit { .. } => "rate_limit",
            Self::TransientProvider(_) => "transient_provider",
            Self::RequestRejected(_) => "request_rejected",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::Reconciliation { .. } => "reconciliation",
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslateError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
