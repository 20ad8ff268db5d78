use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use url::Url;

use crate::language_utils::{language_codes_match, validate_language_code};

/// Application configuration module
/// This module handles loading, validating and saving the JSON configuration
/// file, and resolves per-provider settings for the active provider.

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV_VAR: &str = "TRANSLATEBOT_API_KEY";

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "translatebot.json";

/// Request size limit of the DeepL API
pub const DEEPL_MAX_REQUEST_BYTES: usize = 128 * 1024;

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Language the source strings are written in
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Every configured target language
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Message catalog locations
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Translatable database records
    #[serde(default)]
    pub records: RecordsConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: OpenAI
    #[default]
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
    // @provider: DeepL machine translation
    DeepL,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
            Self::DeepL => "DeepL",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
            Self::DeepL => "deepl".to_string(),
        }
    }

    // @returns: Whether the hosted API needs a key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::LMStudio)
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            "deepl" => Ok(Self::DeepL),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Batch payload budget in bytes; 0 derives it from max_tokens
    #[serde(default)]
    pub max_chars_per_request: usize,

    // @field: Model context size used to derive the batch budget
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        let (model, endpoint) = match provider_type {
            TranslationProvider::OpenAI => (default_openai_model(), default_openai_endpoint()),
            TranslationProvider::Anthropic => {
                (default_anthropic_model(), default_anthropic_endpoint())
            }
            TranslationProvider::LMStudio => {
                (default_lmstudio_model(), default_lmstudio_endpoint())
            }
            TranslationProvider::DeepL => (String::new(), default_deepl_endpoint()),
        };
        let max_chars_per_request = match provider_type {
            TranslationProvider::DeepL => DEEPL_MAX_REQUEST_BYTES,
            _ => 0,
        };
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model,
            api_key: String::new(),
            endpoint,
            max_chars_per_request,
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Attempts per batch for rate-limit and transient failures
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff for transient failures, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Base backoff for rate limits without a `retry-after` hint
    #[serde(default = "default_rate_limit_backoff_ms")]
    pub rate_limit_backoff_ms: u64,

    /// Extra attempts for a batch whose reply could not be parsed
    #[serde(default = "default_malformed_retry_count")]
    pub malformed_retry_count: u32,

    /// Write translations that lost a placeholder
    #[serde(default)]
    pub accept_placeholder_mismatch: bool,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            rate_limit_backoff_ms: default_rate_limit_backoff_ms(),
            malformed_retry_count: default_malformed_retry_count(),
            accept_placeholder_mismatch: false,
        }
    }
}

/// An application directory holding its own `locale/` tree
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CatalogApp {
    /// App name used by `--app`
    pub name: String,
    /// App directory; catalogs live under `<path>/locale`
    pub path: PathBuf,
}

/// Where message catalogs live
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CatalogConfig {
    /// Project-level locale directories
    #[serde(default = "default_locale_paths")]
    pub locale_paths: Vec<PathBuf>,

    /// Application directories
    #[serde(default)]
    pub apps: Vec<CatalogApp>,

    /// Gettext domains to translate
    #[serde(default = "default_domains")]
    pub domains: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            locale_paths: default_locale_paths(),
            apps: Vec::new(),
            domains: default_domains(),
        }
    }
}

/// A model whose fields have per-language columns
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModelConfig {
    /// Model name, e.g. `Article`
    pub name: String,
    /// Application label, e.g. `blog`
    #[serde(default)]
    pub app_label: String,
    /// Backing table; defaults to `<app_label>_<name>` lowercased
    #[serde(default)]
    pub table: String,
    /// Primary key column
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Base names of the translatable fields
    #[serde(default)]
    pub fields: Vec<String>,
}

impl ModelConfig {
    /// `app_label.Name`, or the bare name without an app label
    pub fn label(&self) -> String {
        if self.app_label.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.app_label, self.name)
        }
    }

    /// Table name, derived when not configured
    pub fn table_name(&self) -> String {
        if !self.table.is_empty() {
            return self.table.clone();
        }
        if self.app_label.is_empty() {
            self.name.to_lowercase()
        } else {
            format!("{}_{}", self.app_label, self.name).to_lowercase()
        }
    }
}

/// Database records with translatable fields
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RecordsConfig {
    /// SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Registered models
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_languages() -> Vec<String> {
    vec!["fr".to_string()]
}

fn default_max_tokens() -> usize {
    16_000
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.2
}

fn default_retry_count() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    1000 // doubled on each retry
}

fn default_rate_limit_backoff_ms() -> u64 {
    60_000
}

fn default_malformed_retry_count() -> u32 {
    2
}

fn default_locale_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("locale")]
}

fn default_domains() -> Vec<String> {
    vec!["django".to_string()]
}

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_lmstudio_endpoint() -> String {
    "http://localhost:1234/v1".to_string()
}

fn default_deepl_endpoint() -> String {
    "https://api.deepl.com".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_lmstudio_model() -> String {
    // Placeholder; users should set the model loaded in LM Studio
    "local-model".to_string()
}

impl Config {
    /// Load the configuration from `path`, creating a default file when missing
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            warn!(
                "Config file not found at '{}', creating default config.",
                path.display()
            );
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        validate_language_code(&self.source_language)
            .context("Invalid source_language")?;
        if self.languages.is_empty() {
            return Err(anyhow!("At least one target language must be configured in `languages`"));
        }
        for language in &self.languages {
            validate_language_code(language)
                .with_context(|| format!("Invalid entry in `languages`: {}", language))?;
        }

        let endpoint = self.translation.get_endpoint();
        Url::parse(&endpoint)
            .with_context(|| format!("Invalid provider endpoint URL: {}", endpoint))?;

        if let Some(provider_config) = self.translation.get_active_provider_config() {
            if provider_config.max_chars_per_request == 0 && provider_config.max_tokens == 0 {
                return Err(anyhow!(
                    "Either max_chars_per_request or max_tokens must be greater than zero for provider {}",
                    provider_config.provider_type
                ));
            }
        }

        if self.translation.provider.requires_api_key()
            && self.translation.resolve_api_key().is_none()
        {
            return Err(anyhow!(
                "Translation API key is required for {} provider. Set `api_key` in the config file or the {} environment variable.",
                self.translation.provider.display_name(),
                API_KEY_ENV_VAR
            ));
        }

        for model in &self.records.models {
            if model.name.trim().is_empty() {
                return Err(anyhow!("Every entry in `records.models` needs a name"));
            }
        }

        Ok(())
    }

    /// Source languages used for record fields: all configured languages
    /// except the target, with the project source language first
    pub fn source_languages_for(&self, target_language: &str) -> Vec<String> {
        let mut languages = vec![self.source_language.clone()];
        for language in &self.languages {
            if !languages.contains(language) {
                languages.push(language.clone());
            }
        }
        languages.retain(|l| !language_codes_match(l, target_language));
        languages
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            languages: default_languages(),
            translation: TranslationConfig::default(),
            catalog: CatalogConfig::default(),
            records: RecordsConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Override the model of the active provider, adding its entry if needed
    pub fn set_model(&mut self, model: &str) {
        let provider_str = self.provider.to_lowercase_string();
        match self
            .available_providers
            .iter_mut()
            .find(|p| p.provider_type == provider_str)
        {
            Some(provider_config) => provider_config.model = model.to_string(),
            None => {
                let mut provider_config = ProviderConfig::new(self.provider);
                provider_config.model = model.to_string();
                self.available_providers.push(provider_config);
            }
        }
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }
        ProviderConfig::new(self.provider).model
    }

    /// API key from the config, else from the environment
    pub fn resolve_api_key(&self) -> Option<String> {
        self.get_active_provider_config()
            .map(|p| p.api_key.trim().to_string())
            .filter(|k| !k.is_empty())
            .or_else(|| {
                std::env::var(API_KEY_ENV_VAR)
                    .ok()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
            })
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }
        ProviderConfig::new(self.provider).endpoint
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|t| *t > 0)
            .unwrap_or_else(default_timeout_secs)
    }

    /// Explicit batch budget, if configured
    pub fn get_max_chars_per_request(&self) -> Option<usize> {
        self.get_active_provider_config()
            .map(|p| p.max_chars_per_request)
            .filter(|c| *c > 0)
            .or_else(|| Some(ProviderConfig::new(self.provider).max_chars_per_request).filter(|c| *c > 0))
    }

    /// Model context size for the active provider
    pub fn get_max_tokens(&self) -> usize {
        self.get_active_provider_config()
            .map(|p| p.max_tokens)
            .filter(|t| *t > 0)
            .unwrap_or_else(default_max_tokens)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::OpenAI),
                ProviderConfig::new(TranslationProvider::Anthropic),
                ProviderConfig::new(TranslationProvider::LMStudio),
                ProviderConfig::new(TranslationProvider::DeepL),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}
