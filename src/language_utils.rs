use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for language code handling
///
/// Codes are ISO 639-1 (2-letter) or ISO 639-3 (3-letter) primary tags,
/// optionally followed by a region or script subtag (`pt-br`, `zh-hans`).
/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-3 (3-letter) code
    Part3,
}

/// Split a code into its lowercase primary tag and optional subtag.
/// Both `-` and `_` are accepted as separators.
fn split_code(code: &str) -> (String, Option<String>) {
    let normalized = code.trim().replace('_', "-");
    match normalized.split_once('-') {
        Some((primary, rest)) => (primary.to_lowercase(), Some(rest.to_string())),
        None => (normalized.to_lowercase(), None),
    }
}

fn lookup(primary: &str) -> Option<Language> {
    match primary.len() {
        2 => Language::from_639_1(primary),
        3 => Language::from_639_3(primary),
        _ => None,
    }
}

/// Validate a language code such as `fr`, `deu`, `pt-br` or `zh_Hans`
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let (primary, subtag) = split_code(code);

    if let Some(subtag) = &subtag {
        let valid_subtag = !subtag.is_empty()
            && subtag
                .split('-')
                .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()));
        if !valid_subtag {
            return Err(anyhow!("Invalid language code: {}", code));
        }
    }

    match lookup(&primary) {
        Some(_) if primary.len() == 2 => Ok(LanguageCodeType::Part1),
        Some(_) => Ok(LanguageCodeType::Part3),
        None => Err(anyhow!("Invalid language code: {}", code)),
    }
}

/// Get the English name of the primary language of a code
pub fn get_language_name(code: &str) -> Result<String> {
    let (primary, _) = split_code(code);
    let lang = lookup(&primary)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", code))?;

    Ok(lang.to_name().to_string())
}

/// Human label used in prompts: `French (fr)`, or just the code when unknown
pub fn display_name(code: &str) -> String {
    match get_language_name(code) {
        Ok(name) => format!("{} ({})", name, code),
        Err(_) => code.to_string(),
    }
}

/// Convert a language code to a gettext locale directory name.
///
/// `pt-br` becomes `pt_BR`, `zh-hans` becomes `zh_Hans`, `sr-latn-x`
/// becomes `sr_Latn-x`. Codes without a subtag are lowercased.
pub fn to_locale(code: &str) -> String {
    let trimmed = code.trim();
    let Some((lang, rest)) = trimmed.split_once('-') else {
        return trimmed.to_lowercase();
    };
    let lang = lang.to_lowercase();
    let (region, tail) = match rest.split_once('-') {
        Some((region, tail)) => (region, Some(tail.to_lowercase())),
        None => (rest, None),
    };

    let mut region = if region.len() > 2 {
        let lower = region.to_lowercase();
        let mut chars = lower.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    } else {
        region.to_uppercase()
    };
    if let Some(tail) = tail {
        region.push('-');
        region.push_str(&tail);
    }

    format!("{}_{}", lang, region)
}

/// Suffix of a language-specific record field: `pt-br` becomes `pt_br`
pub fn field_suffix(code: &str) -> String {
    code.trim().to_lowercase().replace('-', "_")
}

/// Check if two language codes name the same language variant
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    let (primary1, sub1) = split_code(code1);
    let (primary2, sub2) = split_code(code2);

    let same_primary = match (lookup(&primary1), lookup(&primary2)) {
        (Some(a), Some(b)) => a == b,
        _ => primary1 == primary2,
    };

    same_primary
        && sub1.map(|s| s.to_lowercase()) == sub2.map(|s| s.to_lowercase())
}
