/*!
 * Integration tests for catalog translation, from discovery to saved files
 */

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use translatebot::app_config::Config;
use translatebot::app_controller::{Controller, RunOptions};
use translatebot::catalog::Catalog;
use translatebot::providers::mock::{MockFailure, MockProvider};
use translatebot::translation::JobOptions;

use crate::common;

const THREE_NEW_ENTRIES: &str = r#"msgid ""
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

msgid "Open"
msgstr ""

msgid "Close"
msgstr ""

#, fuzzy
msgid "Save %(name)s"
msgstr "Speichern"
"#;

const POLISH_PLURALS: &str = r#"msgid ""
msgstr ""
"Project-Id-Version: site 1.0\n"
"POT-Creation-Date: 2024-05-01 12:00+0000\n"
"PO-Revision-Date: 2024-05-02 12:00+0000\n"
"Last-Translator: \n"
"Language-Team: Polish\n"
"MIME-Version: 1.0\n"
"Content-Type: text/plain; charset=UTF-8\n"
"Content-Transfer-Encoding: 8bit\n"
"Language: pl\n"
"Plural-Forms: nplurals=3; plural=(n==1 ? 0 : n%10>=2 && n%10<=4 ? 1 : 2);\n"

msgid "%(count)s file"
msgid_plural "%(count)s files"
msgstr[0] ""
msgstr[1] ""
msgstr[2] ""
"#;

fn controller(config: Config, root: &Path, provider: &MockProvider) -> Controller {
    Controller::with_provider(config, None, Arc::new(provider.clone())).with_context_dirs(vec![root.to_path_buf()])
}

fn options_for(language: &str) -> RunOptions {
    RunOptions {
        target_languages: vec![language.to_string()],
        ..Default::default()
    }
}

/// Only the untranslated entry is sent, in one batch, and only it changes
#[tokio::test]
async fn test_translate_withOneMissingEntry_shouldFillItAndKeepTheOther() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    let path = common::create_catalog(root, "fr", common::HI_BYE_CATALOG)?;
    let provider = MockProvider::working();
    provider.push_reply(r#"["Salut"]"#);

    let summary = controller(common::test_config(root, &["fr"]), root, &provider)
        .run(&options_for("fr"))
        .await?;

    assert!(summary.failed_languages().is_empty());
    assert_eq!(common::sent_texts(&provider), vec![vec!["Hi".to_string()]]);

    assert_eq!(common::msgstr(&path, "Hi")?, "Salut");
    assert_eq!(common::msgstr(&path, "Bye")?, "Au revoir");

    let report = summary.results[0].catalogs.as_ref().unwrap();
    assert_eq!(report.updated_entries, 1);
    assert_eq!(report.written.len(), 1);
    Ok(())
}

/// Dry run reports what would be sent without calling or writing anything
#[tokio::test]
async fn test_translate_withDryRun_shouldReportPendingUnitsOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    let path = common::create_catalog(root, "de", THREE_NEW_ENTRIES)?;
    let provider = MockProvider::working();

    let mut options = options_for("de");
    options.job.dry_run = true;
    let summary = controller(common::test_config(root, &["de"]), root, &provider)
        .run(&options)
        .await?;

    assert_eq!(provider.request_count(), 0);
    assert_eq!(fs::read_to_string(&path)?, THREE_NEW_ENTRIES);

    let report = summary.results[0].catalogs.as_ref().unwrap();
    assert_eq!(report.selected_units(), 3);
    let sample: Vec<String> = report.sample().into_iter().map(|(_, source)| source).collect();
    assert_eq!(sample, vec!["Open", "Close", "Save %(name)s"]);
    assert!(report.written.is_empty());
    Ok(())
}

/// An authentication failure stops one language without writing, the next still runs
#[tokio::test]
async fn test_translate_withAuthFailure_shouldSkipWritesForThatLanguageOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    let fr_path = common::create_catalog(root, "fr", common::HI_BYE_CATALOG)?;
    let de_path = common::create_catalog(root, "de", common::HI_BYE_CATALOG)?;
    let provider = MockProvider::working();
    provider.push_error(MockFailure::Authentication);

    let summary = controller(common::test_config(root, &["fr", "de"]), root, &provider)
        .run(&RunOptions::default())
        .await?;

    assert_eq!(summary.failed_languages(), vec!["fr"]);
    assert!(summary.results[0].error.as_deref().unwrap().contains("Authentication failed"));
    assert_eq!(provider.request_count(), 2);

    assert_eq!(fs::read_to_string(&fr_path)?, common::HI_BYE_CATALOG);
    assert_eq!(common::msgstr(&de_path, "Hi")?, "[TRANSLATED] Hi");
    Ok(())
}

/// Fuzzy entries are re-translated and lose their flag; placeholders are checked
#[tokio::test]
async fn test_translate_withFuzzyEntry_shouldRetranslateAndClearFlag() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    let path = common::create_catalog(root, "de", THREE_NEW_ENTRIES)?;
    let provider = MockProvider::working();
    provider.push_reply(r#"["Öffnen", "Schließen", "%(name)s speichern"]"#);

    controller(common::test_config(root, &["de"]), root, &provider)
        .run(&options_for("de"))
        .await?;

    assert_eq!(common::msgstr(&path, "Save %(name)s")?, "%(name)s speichern");
    assert!(!common::is_fuzzy(&path, "Save %(name)s")?);
    assert!(!Catalog::load(&path)?.stats().has_issues());
    Ok(())
}

/// A translation that drops a placeholder is discarded by default
#[tokio::test]
async fn test_translate_withLostPlaceholder_shouldLeaveEntryUntouched() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    let path = common::create_catalog(root, "de", THREE_NEW_ENTRIES)?;
    let provider = MockProvider::working();
    provider.push_reply(r#"["Öffnen", "Schließen", "Speichern"]"#);

    controller(common::test_config(root, &["de"]), root, &provider)
        .run(&options_for("de"))
        .await?;

    assert_eq!(common::msgstr(&path, "Open")?, "Öffnen");
    assert_eq!(common::msgstr(&path, "Save %(name)s")?, "Speichern");
    assert!(common::is_fuzzy(&path, "Save %(name)s")?);
    Ok(())
}

/// Plural entries get every form the language declares
#[tokio::test]
async fn test_translate_withPluralEntry_shouldFillEveryForm() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    let path = common::create_catalog(root, "pl", POLISH_PLURALS)?;
    let provider = MockProvider::working();

    controller(common::test_config(root, &["pl"]), root, &provider)
        .run(&options_for("pl"))
        .await?;

    assert_eq!(
        common::sent_texts(&provider),
        vec![vec!["%(count)s file".to_string(), "%(count)s files".to_string()]]
    );
    let forms = common::msgstr_plural(&path, "%(count)s file")?;
    assert_eq!(forms.len(), 3);
    assert_eq!(forms[0], "[TRANSLATED] %(count)s file");
    assert_eq!(forms[1], "[TRANSLATED] %(count)s files");
    assert_eq!(forms[2], "[TRANSLATED] %(count)s files");
    Ok(())
}

/// The same string in two catalogs sharing a context is sent once and written to both
#[tokio::test]
async fn test_translate_withSharedString_shouldSendItOnce() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    let project = common::create_catalog(root, "fr", common::HI_BYE_CATALOG)?;
    let app = common::create_app_catalog(root, "blog", "fr", common::HI_BYE_CATALOG)?;
    let mut config = common::test_config(root, &["fr"]);
    common::add_app(&mut config, root, "blog");
    let provider = MockProvider::working();

    let summary = controller(config, root, &provider).run(&options_for("fr")).await?;

    assert_eq!(common::sent_texts(&provider), vec![vec!["Hi".to_string()]]);
    for path in [&project, &app] {
        assert_eq!(common::msgstr(path, "Hi")?, "[TRANSLATED] Hi");
    }
    let report = summary.results[0].catalogs.as_ref().unwrap();
    assert_eq!(report.updated_entries, 2);
    assert_eq!(report.written.len(), 2);
    Ok(())
}

/// Project and app context files reach the system prompt of their catalogs
#[tokio::test]
async fn test_translate_withContextFiles_shouldSendThemPerGroup() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_catalog(root, "fr", common::HI_BYE_CATALOG)?;
    common::create_app_catalog(root, "shop", "fr", common::HI_BYE_CATALOG)?;
    common::create_test_file(root, "TRANSLATING.md", "Use the informal 'tu'.\n")?;
    common::create_test_file(root, "shop/TRANSLATING.md", "A 'cart' is a 'panier'.")?;
    let mut config = common::test_config(root, &["fr"]);
    common::add_app(&mut config, root, "shop");
    let provider = MockProvider::working();

    controller(config, root, &provider).run(&options_for("fr")).await?;

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].system.contains("Use the informal 'tu'."));
    assert!(!requests[0].system.contains("panier"));
    assert!(requests[1].system.contains("Use the informal 'tu'."));
    assert!(requests[1].system.contains("## App-Specific Context"));
    assert!(requests[1].system.contains("A 'cart' is a 'panier'."));
    Ok(())
}

/// Restricting to one app leaves the project catalog alone
#[tokio::test]
async fn test_translate_withAppFilter_shouldOnlyTouchThatApp() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    let project = common::create_catalog(root, "fr", common::HI_BYE_CATALOG)?;
    let app = common::create_app_catalog(root, "blog", "fr", common::HI_BYE_CATALOG)?;
    let mut config = common::test_config(root, &["fr"]);
    common::add_app(&mut config, root, "blog");
    let provider = MockProvider::working();

    let mut options = options_for("fr");
    options.apps = vec!["Blog".to_string()];
    controller(config, root, &provider).run(&options).await?;

    assert_eq!(fs::read_to_string(&project)?, common::HI_BYE_CATALOG);
    assert_eq!(common::msgstr(&app, "Hi")?, "[TRANSLATED] Hi");
    Ok(())
}

/// Overwrite re-sends translated entries too
#[tokio::test]
async fn test_translate_withOverwrite_shouldReplaceExistingTranslations() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    let path = common::create_catalog(root, "fr", common::HI_BYE_CATALOG)?;
    let provider = MockProvider::working();

    let mut options = options_for("fr");
    options.job = JobOptions {
        overwrite: true,
        ..Default::default()
    };
    controller(common::test_config(root, &["fr"]), root, &provider).run(&options).await?;

    assert_eq!(
        common::sent_texts(&provider),
        vec![vec!["Hi".to_string(), "Bye".to_string()]]
    );
    assert_eq!(common::msgstr(&path, "Bye")?, "[TRANSLATED] Bye");
    Ok(())
}

/// An unparseable reply fails the batch, not the language
#[tokio::test]
async fn test_translate_withPersistentGarbage_shouldLeaveCatalogUnchanged() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    let path = common::create_catalog(root, "fr", common::HI_BYE_CATALOG)?;
    let provider = MockProvider::working();
    provider.push_reply("Sorry, I can't do that.");
    provider.push_reply("Still no JSON here.");

    let summary = controller(common::test_config(root, &["fr"]), root, &provider)
        .run(&options_for("fr"))
        .await?;

    assert!(summary.failed_languages().is_empty());
    assert_eq!(provider.request_count(), 2);
    let report = summary.results[0].catalogs.as_ref().unwrap();
    assert_eq!(report.failed_units(), 1);
    assert!(report.written.is_empty());
    assert_eq!(fs::read_to_string(&path)?, common::HI_BYE_CATALOG);
    Ok(())
}

/// A language without catalogs fails with the checked locations
#[tokio::test]
async fn test_translate_withoutCatalogs_shouldFailThatLanguage() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    let provider = MockProvider::working();

    let summary = controller(common::test_config(root, &["pt-br"]), root, &provider)
        .run(&options_for("pt-br"))
        .await?;

    let error = summary.results[0].error.as_deref().unwrap();
    assert!(error.contains("No translation files found for language 'pt-br' (locale 'pt_BR')"));
    assert!(error.contains("pt_BR/LC_MESSAGES/django.po"));
    assert_eq!(provider.request_count(), 0);
    Ok(())
}

/// An authentication failure after a successful batch still writes nothing
#[tokio::test]
async fn test_translate_withAuthFailureOnSecondBatch_shouldLeaveFileUntouched() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    let path = common::create_catalog(root, "de", THREE_NEW_ENTRIES)?;
    let mut config = common::test_config(root, &["de"]);
    common::limit_batch_chars(&mut config, 1);
    let provider = MockProvider::working();
    provider.push_reply(r#"["Öffnen"]"#);
    provider.push_error(MockFailure::Authentication);

    let summary = controller(config, root, &provider).run(&options_for("de")).await?;

    assert_eq!(summary.failed_languages(), vec!["de"]);
    assert_eq!(provider.request_count(), 2);
    assert_eq!(fs::read_to_string(&path)?, THREE_NEW_ENTRIES);
    Ok(())
}

/// A reply of the wrong length fails its batch only; earlier batches are written
#[tokio::test]
async fn test_translate_withMisalignedSecondBatch_shouldWriteFirstBatchOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    let path = common::create_catalog(root, "de", THREE_NEW_ENTRIES)?;
    let mut config = common::test_config(root, &["de"]);
    common::limit_batch_chars(&mut config, 1);
    let provider = MockProvider::working();
    provider.push_reply(r#"["Öffnen"]"#);
    provider.push_reply(r#"["Schließen", "Zusätzlich"]"#);
    provider.push_reply(r#"["%(name)s speichern"]"#);

    let summary = controller(config, root, &provider).run(&options_for("de")).await?;

    assert!(summary.failed_languages().is_empty());
    assert_eq!(provider.request_count(), 3);
    let report = summary.results[0].catalogs.as_ref().unwrap();
    assert_eq!(report.failed_units(), 1);
    assert_eq!(report.updated_entries, 2);

    assert_eq!(common::msgstr(&path, "Open")?, "Öffnen");
    assert_eq!(common::msgstr(&path, "Close")?, "");
    assert_eq!(common::msgstr(&path, "Save %(name)s")?, "%(name)s speichern");
    Ok(())
}
