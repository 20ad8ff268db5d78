/*!
 * Common test utilities for the translatebot test suite
 */

#![allow(dead_code)]

use anyhow::{Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use translatebot::app_config::{CatalogApp, Config};
use translatebot::catalog::{Catalog, MessageView};
use translatebot::providers::mock::MockProvider;
use translatebot::translation::{EngineSettings, RetryPolicy, TranslationEngine};

/// Initialize logging once for tests that want to see engine output
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file, parent directories included
pub fn create_test_file(dir: &Path, relative_path: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(relative_path);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Catalog with a header, an untranslated entry and a translated one
pub const HI_BYE_CATALOG: &str = r#"msgid ""
msgstr ""
"Project-Id-Version: site 1.0\n"
"POT-Creation-Date: 2024-05-01 12:00+0000\n"
"PO-Revision-Date: 2024-05-02 12:00+0000\n"
"Last-Translator: \n"
"Language-Team: French\n"
"MIME-Version: 1.0\n"
"Content-Type: text/plain; charset=UTF-8\n"
"Content-Transfer-Encoding: 8bit\n"
"Language: fr\n"
"Plural-Forms: nplurals=2; plural=(n > 1);\n"

msgid "Hi"
msgstr ""

msgid "Bye"
msgstr "Au revoir"
"#;

/// Translation of the singular entry `key` in the catalog at `path`
pub fn msgstr(path: &Path, key: &str) -> Result<String> {
    let catalog = Catalog::load(path)?;
    let message = catalog
        .message(key)
        .ok_or_else(|| anyhow!("No entry '{}' in {}", key, path.display()))?;
    Ok(message.msgstr()?.to_string())
}

/// Plural forms of the entry `key` in the catalog at `path`
pub fn msgstr_plural(path: &Path, key: &str) -> Result<Vec<String>> {
    let catalog = Catalog::load(path)?;
    let message = catalog
        .message(key)
        .ok_or_else(|| anyhow!("No entry '{}' in {}", key, path.display()))?;
    Ok(message.msgstr_plural()?.clone())
}

/// Whether the entry `key` of the catalog at `path` is flagged fuzzy
pub fn is_fuzzy(path: &Path, key: &str) -> Result<bool> {
    let catalog = Catalog::load(path)?;
    Ok(catalog.message(key).is_some_and(|m| m.is_fuzzy()))
}

/// Writes `content` as the project catalog of `locale`
pub fn create_catalog(root: &Path, locale: &str, content: &str) -> Result<PathBuf> {
    create_test_file(root, &format!("locale/{}/LC_MESSAGES/django.po", locale), content)
}

/// Writes `content` as the catalog of `locale` inside app `app`
pub fn create_app_catalog(root: &Path, app: &str, locale: &str, content: &str) -> Result<PathBuf> {
    create_test_file(root, &format!("{}/locale/{}/LC_MESSAGES/django.po", app, locale), content)
}

/// Config rooted at `root`, with no backoff so retries run instantly
pub fn test_config(root: &Path, languages: &[&str]) -> Config {
    let mut config = Config::default();
    config.languages = languages.iter().map(|l| l.to_string()).collect();
    config.catalog.locale_paths = vec![root.join("locale")];
    config.translation.common.retry_backoff_ms = 0;
    config.translation.common.rate_limit_backoff_ms = 0;
    config.translation.common.retry_count = 3;
    config.translation.common.malformed_retry_count = 1;
    config
}

/// Cap the batch payload of the active provider, forcing one batch per unit at 1
pub fn limit_batch_chars(config: &mut Config, chars: usize) {
    let active = config.translation.provider.to_lowercase_string();
    for provider in config
        .translation
        .available_providers
        .iter_mut()
        .filter(|p| p.provider_type == active)
    {
        provider.max_chars_per_request = chars;
    }
}

/// Register an app directory under `root`
pub fn add_app(config: &mut Config, root: &Path, name: &str) {
    config.catalog.apps.push(CatalogApp {
        name: name.to_string(),
        path: root.join(name),
    });
}

/// Engine settings without waits
pub fn test_settings() -> EngineSettings {
    EngineSettings {
        model: "mock-model".to_string(),
        temperature: 0.2,
        max_batch_chars: Some(10_000),
        max_tokens: 16_000,
        retry: RetryPolicy::immediate(3, 1),
        accept_placeholder_mismatch: false,
    }
}

/// Engine over a clone of `provider`, sharing its script and counters
pub fn test_engine(provider: &MockProvider) -> TranslationEngine {
    TranslationEngine::new(Arc::new(provider.clone()), test_settings())
}

/// Source texts sent in every request so far
pub fn sent_texts(provider: &MockProvider) -> Vec<Vec<String>> {
    provider
        .requests()
        .iter()
        .map(|r| MockProvider::payload_texts(&r.user))
        .collect()
}
