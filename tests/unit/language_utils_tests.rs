/*!
 * Tests for language utility functions
 */

use translatebot::language_utils::{
    LanguageCodeType, display_name, field_suffix, get_language_name, language_codes_match, to_locale,
    validate_language_code,
};

/// Test validation of language codes
#[test]
fn test_validate_language_code_withValidCodes_shouldReturnCorrectType() {
    // ISO 639-1 tests
    assert_eq!(validate_language_code("en").unwrap(), LanguageCodeType::Part1);
    assert_eq!(validate_language_code("fr").unwrap(), LanguageCodeType::Part1);
    assert_eq!(validate_language_code("nl").unwrap(), LanguageCodeType::Part1);

    // ISO 639-3 tests
    assert_eq!(validate_language_code("deu").unwrap(), LanguageCodeType::Part3);
    assert_eq!(validate_language_code("fra").unwrap(), LanguageCodeType::Part3);

    // Regional and script variants
    assert_eq!(validate_language_code("pt-br").unwrap(), LanguageCodeType::Part1);
    assert_eq!(validate_language_code("zh_Hans").unwrap(), LanguageCodeType::Part1);

    // Whitespace and case tests
    assert_eq!(validate_language_code(" EN ").unwrap(), LanguageCodeType::Part1);
}

#[test]
fn test_validate_language_code_withInvalidCodes_shouldFail() {
    assert!(validate_language_code("xyz").is_err());
    assert!(validate_language_code("123").is_err());
    assert!(validate_language_code("e").is_err());
    assert!(validate_language_code("").is_err());
    assert!(validate_language_code("pt-").is_err());
    assert!(validate_language_code("pt-b r").is_err());
}

/// Test matching of different language code formats
#[test]
fn test_language_codes_match_withEquivalentCodes_shouldReturnTrue() {
    assert!(language_codes_match("en", "eng"));
    assert!(language_codes_match("FR", "fr"));
    assert!(language_codes_match("pt-br", "pt_BR"));
    assert!(language_codes_match("zh-hans", "zh_Hans"));
}

#[test]
fn test_language_codes_match_withDifferentVariants_shouldReturnFalse() {
    assert!(!language_codes_match("pt", "pt-br"));
    assert!(!language_codes_match("pt-br", "pt-pt"));
    assert!(!language_codes_match("en", "fr"));
}

#[test]
fn test_get_language_name_shouldUsePrimaryTag() {
    assert_eq!(get_language_name("fr").unwrap(), "French");
    assert_eq!(get_language_name("de").unwrap(), "German");
    assert_eq!(get_language_name("pt-br").unwrap(), "Portuguese");
    assert!(get_language_name("xx").is_err());
}

#[test]
fn test_display_name_withUnknownCode_shouldFallBackToCode() {
    assert_eq!(display_name("nl"), "Dutch (nl)");
    assert_eq!(display_name("pt-br"), "Portuguese (pt-br)");
    assert_eq!(display_name("xx-yy"), "xx-yy");
}

/// Locale directories follow gettext naming
#[test]
fn test_to_locale_shouldMatchGettextDirectoryNames() {
    assert_eq!(to_locale("fr"), "fr");
    assert_eq!(to_locale("FR"), "fr");
    assert_eq!(to_locale("pt-br"), "pt_BR");
    assert_eq!(to_locale("zh-hans"), "zh_Hans");
    assert_eq!(to_locale("sr-latn-x"), "sr_Latn-x");
}

#[test]
fn test_field_suffix_shouldBeColumnSafe() {
    assert_eq!(field_suffix("fr"), "fr");
    assert_eq!(field_suffix("pt-BR"), "pt_br");
    assert_eq!(field_suffix(" zh-hans "), "zh_hans");
}
