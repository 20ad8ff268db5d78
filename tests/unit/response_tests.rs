/*!
 * Tests for reply parsing and reconciliation
 */

use translatebot::errors::TranslateError;
use translatebot::providers::mock::MockProvider;
use translatebot::translation::response::{parse_string_array, reconcile};
use translatebot::translation::{Batch, OutcomeStatus, TranslationUnit};

fn batch_of(texts: &[&str]) -> Batch {
    let units = texts
        .iter()
        .enumerate()
        .map(|(i, text)| TranslationUnit::new(format!("k{}", i + 1), *text, "", false))
        .collect();
    Batch::new(units).unwrap()
}

#[test]
fn test_parse_string_array_withPlainJson_shouldReturnStrings() {
    let parsed = parse_string_array(r#"["Bonjour", "Au revoir"]"#).unwrap();
    assert_eq!(parsed, vec!["Bonjour", "Au revoir"]);
}

#[test]
fn test_parse_string_array_withEscapesAndBrackets_shouldKeepContent() {
    let raw = r#"Translations: ["Il a dit \"[oui]\"", "Ligne 1\nLigne 2"] -- done"#;
    let parsed = parse_string_array(raw).unwrap();
    assert_eq!(parsed[0], "Il a dit \"[oui]\"");
    assert_eq!(parsed[1], "Ligne 1\nLigne 2");
}

#[test]
fn test_parse_string_array_withUppercaseFence_shouldStripIt() {
    let raw = "```JSON\n[\"Hallo\"]\n```";
    assert_eq!(parse_string_array(raw).unwrap(), vec!["Hallo"]);
}

#[test]
fn test_parse_string_array_withRefusal_shouldCarryPreview() {
    let raw = "I'm sorry, I can't help with that.";
    match parse_string_array(raw) {
        Err(TranslateError::MalformedResponse { preview, .. }) => assert_eq!(preview, raw),
        other => panic!("expected malformed response, got {:?}", other),
    }
}

#[test]
fn test_parse_string_array_withLongGarbage_shouldTruncatePreview() {
    let raw = "x".repeat(1_000);
    match parse_string_array(&raw) {
        Err(TranslateError::MalformedResponse { preview, .. }) => {
            assert!(preview.len() < raw.len());
            assert!(preview.ends_with("..."));
        }
        other => panic!("expected malformed response, got {:?}", other),
    }
}

/// Reconciliation is positional and keeps the unit order
#[test]
fn test_reconcile_withMockReply_shouldMapByPosition() {
    let batch = batch_of(&["Save", "Cancel", "Delete %(count)d items"]);
    let reply = MockProvider::generate_batch_response(&[
        "Save".to_string(),
        "Cancel".to_string(),
        "Delete %(count)d items".to_string(),
    ]);

    let outcomes = reconcile(&batch, &reply).unwrap();

    assert_eq!(outcomes.len(), 3);
    for (outcome, key) in outcomes.iter().zip(["k1", "k2", "k3"]) {
        assert_eq!(outcome.unit_key, key);
        assert_eq!(outcome.status, OutcomeStatus::Ok);
    }
    assert_eq!(
        outcomes[2].translated_text.as_deref(),
        Some("[TRANSLATED] Delete %(count)d items")
    );
}

#[test]
fn test_reconcile_withLongReply_shouldRejectWholeBatch() {
    let batch = batch_of(&["One"]);
    assert_eq!(
        reconcile(&batch, r#"["Un", "Deux"]"#),
        Err(TranslateError::Reconciliation {
            expected: 1,
            received: 2
        })
    );
}

#[test]
fn test_reconcile_withLostMarkup_shouldFlagOnlyThatUnit() {
    let batch = batch_of(&["<b>Bold</b> move", "Plain", "Hi {name}"]);
    let outcomes = reconcile(&batch, r#"["Audacieux", "Simple", "Salut {name}"]"#).unwrap();

    assert_eq!(outcomes[0].status, OutcomeStatus::PlaceholderMismatch);
    assert_eq!(outcomes[1].status, OutcomeStatus::Ok);
    assert_eq!(outcomes[2].status, OutcomeStatus::Ok);
    assert!(!outcomes[0].is_accepted(false));
    assert!(outcomes[0].is_accepted(true));
}
