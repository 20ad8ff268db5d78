/*!
 * Integration tests for application lifecycle
 */

use anyhow::Result;
use std::sync::Arc;
use tokio_test;

use translatebot::app_config::{Config, TranslationProvider};
use translatebot::app_controller::{Controller, RunOptions};
use translatebot::providers::mock::MockProvider;

use crate::common;

const COMPLETE_CATALOG: &str = r#"msgid ""
msgstr ""
"Project-Id-Version: site 1.0\n"
"POT-Creation-Date: 2024-05-01 12:00+0000\n"
"PO-Revision-Date: 2024-05-02 12:00+0000\n"
"Last-Translator: \n"
"Language-Team: German\n"
"MIME-Version: 1.0\n"
"Content-Type: text/plain; charset=UTF-8\n"
"Content-Transfer-Encoding: 8bit\n"
"Language: de\n"
"Plural-Forms: nplurals=2; plural=(n != 1);\n"

msgid "Hi"
msgstr "Hallo"
"#;

/// Test the controller initialization with a configured provider
#[test]
fn test_controller_withConfig_shouldInitializeEngine() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = common::test_config(temp_dir.path(), &["fr"]);
    config.translation.available_providers[0].api_key = "sk-test".to_string();
    config.validate()?;

    let controller = Controller::with_config(config, Some(temp_dir.path()))?;

    assert_eq!(controller.engine().settings().model, "gpt-4o-mini");
    assert_eq!(controller.engine().settings().retry.max_attempts, 3);
    Ok(())
}

/// A local provider needs no key
#[test]
fn test_controller_withLocalProvider_shouldInitializeWithoutKey() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = common::test_config(temp_dir.path(), &["fr"]);
    config.translation.provider = TranslationProvider::LMStudio;
    config.validate()?;

    let controller = Controller::with_config(config, None)?;
    assert_eq!(controller.engine().settings().model, "local-model");
    Ok(())
}

/// Test a full run over every configured language
#[test]
fn test_run_withEveryConfiguredLanguage_shouldTranslateAll() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    let fr_path = common::create_catalog(root, "fr", common::HI_BYE_CATALOG)?;
    let nl_path = common::create_catalog(root, "nl", common::HI_BYE_CATALOG)?;
    let provider = MockProvider::working();
    let controller = Controller::with_provider(common::test_config(root, &["fr", "nl"]), None, Arc::new(provider.clone()))
        .with_context_dirs(vec![root.to_path_buf()]);

    let summary = tokio_test::block_on(async { controller.run(&RunOptions::default()).await })?;

    let languages: Vec<&str> = summary.results.iter().map(|r| r.language.as_str()).collect();
    assert_eq!(languages, vec!["fr", "nl"]);
    assert!(summary.failed_languages().is_empty());
    assert_eq!(provider.request_count(), 2);
    for path in [&fr_path, &nl_path] {
        assert_eq!(common::msgstr(path, "Hi")?, "[TRANSLATED] Hi");
    }

    let usage = tokio_test::block_on(controller.engine().token_usage());
    assert_eq!(usage.requests, 2);
    assert!(usage.total_tokens > 0);
    Ok(())
}

/// A second run finds nothing left to translate
#[test]
fn test_run_twice_shouldNotCallProviderAgain() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    let path = common::create_catalog(root, "fr", common::HI_BYE_CATALOG)?;
    let provider = MockProvider::working();
    let controller = Controller::with_provider(common::test_config(root, &["fr"]), None, Arc::new(provider.clone()))
        .with_context_dirs(vec![root.to_path_buf()]);

    tokio_test::block_on(controller.run(&RunOptions::default()))?;
    let after_first = std::fs::read_to_string(&path)?;
    let summary = tokio_test::block_on(controller.run(&RunOptions::default()))?;

    assert_eq!(provider.request_count(), 1);
    assert_eq!(std::fs::read_to_string(&path)?, after_first);
    let report = summary.results[0].catalogs.as_ref().unwrap();
    assert_eq!(report.selected_units(), 0);
    assert!(report.written.is_empty());
    Ok(())
}

#[test]
fn test_run_withoutLanguages_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path(), &[]);
    let controller = Controller::with_provider(config, None, Arc::new(MockProvider::working()));

    let result = tokio_test::block_on(controller.run(&RunOptions::default()));
    assert!(result.is_err());
    Ok(())
}

/// Test the check command over complete and incomplete catalogs
#[test]
fn test_check_withIncompleteCatalog_shouldReportIssues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_catalog(root, "de", COMPLETE_CATALOG)?;
    let fr_path = common::create_catalog(root, "fr", common::HI_BYE_CATALOG)?;
    let config = common::test_config(root, &["de", "fr"]);

    let report = Controller::check(&config)?;

    assert_eq!(report.catalogs.len(), 2);
    assert!(report.has_issues());
    let (_, fr_stats) = report
        .catalogs
        .iter()
        .find(|(path, _)| *path == fr_path)
        .expect("fr catalog should be checked");
    assert_eq!(fr_stats.total, 2);
    assert_eq!(fr_stats.untranslated, 1);
    assert_eq!(fr_stats.fuzzy, 0);
    Ok(())
}

#[test]
fn test_check_withCompleteCatalogs_shouldPass() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_catalog(root, "de", COMPLETE_CATALOG)?;
    common::create_app_catalog(root, "blog", "de", COMPLETE_CATALOG)?;
    let mut config = common::test_config(root, &["de"]);
    common::add_app(&mut config, root, "blog");

    let report = Controller::check(&config)?;

    assert_eq!(report.catalogs.len(), 2);
    assert!(!report.has_issues());
    Ok(())
}

/// A missing config file is created; an empty language list is rejected
#[test]
fn test_config_loadOrCreate_withoutLanguages_shouldFailValidation() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("translatebot.json");

    let mut config = Config::load_or_create(&path)?;
    assert!(path.exists());
    config.languages.clear();
    assert!(config.validate().is_err());
    Ok(())
}
