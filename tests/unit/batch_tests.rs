/*!
 * Tests for batch building
 */

use translatebot::translation::{Batch, BatchBuilder, TranslationUnit};

fn numbered_units(count: usize) -> Vec<TranslationUnit> {
    (0..count)
        .map(|i| {
            let text = format!("Entry {} says {}", i, "ab".repeat(i % 5 + 1));
            TranslationUnit::new(format!("unit-{}", i), text, "", false)
        })
        .collect()
}

fn flatten_keys(batches: &[Batch]) -> Vec<String> {
    batches
        .iter()
        .flat_map(|b| b.units().iter().map(|u| u.key.clone()))
        .collect()
}

/// Batches partition the input and keep its order
#[test]
fn test_build_withManyUnits_shouldPartitionInOrder() {
    let input = numbered_units(40);
    let expected: Vec<String> = input.iter().map(|u| u.key.clone()).collect();

    let batches = BatchBuilder::new(150).build(input);

    assert!(batches.len() > 1);
    assert_eq!(flatten_keys(&batches), expected);
    for batch in &batches {
        assert!(!batch.is_empty());
        assert!(batch.serialized_size() <= 150);
    }
}

/// A unit whose payload alone exceeds the budget is sent on its own, intact
#[test]
fn test_build_withUnitOverBudget_shouldSendItAlone() {
    let huge = "Lorem ipsum dolor sit amet. ".repeat(20);
    let input = vec![
        TranslationUnit::new("a", "Short", "", false),
        TranslationUnit::new("b", huge.clone(), "", false),
        TranslationUnit::new("c", "Also short", "", false),
    ];

    let batches = BatchBuilder::new(60).build(input);

    let oversized: Vec<&Batch> = batches.iter().filter(|b| b.serialized_size() > 60).collect();
    assert_eq!(oversized.len(), 1);
    assert_eq!(oversized[0].len(), 1);
    assert_eq!(oversized[0].units()[0].source_text, huge);
    assert_eq!(flatten_keys(&batches), vec!["a", "b", "c"]);
}

/// A comment switches the payload to objects, which must still fit
#[test]
fn test_build_withCommentedUnits_shouldMeasureObjectEncoding() {
    let input: Vec<TranslationUnit> = (0..12)
        .map(|i| {
            TranslationUnit::new(format!("k{}", i), format!("May {}", i), "", false)
                .with_comment(Some("calendar month".to_string()))
        })
        .collect();

    let batches = BatchBuilder::new(120).build(input);

    assert!(batches.len() > 1);
    for batch in &batches {
        assert!(batch.has_comments());
        assert!(batch.payload_json().starts_with("[{\"text\""));
        assert!(batch.serialized_size() <= 120);
    }
}

#[test]
fn test_build_withExactBudget_shouldFitSingleBatch() {
    let input = numbered_units(3);
    let exact = Batch::new(input.clone()).unwrap().serialized_size();

    assert_eq!(BatchBuilder::new(exact).build(input.clone()).len(), 1);
    assert_eq!(BatchBuilder::new(exact - 1).build(input).len(), 2);
}

#[test]
fn test_fromTokenLimit_withLargerContext_shouldAllowBiggerBatches() {
    let small = BatchBuilder::from_token_limit(4_000, 2_000);
    let large = BatchBuilder::from_token_limit(128_000, 2_000);
    assert!(large.max_batch_chars() > small.max_batch_chars());
    assert!(BatchBuilder::new(0).max_batch_chars() >= 1);
}
