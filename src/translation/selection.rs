/*!
 * Selection of the units that need a provider call.
 *
 * A unit with a current, non-stale translation is skipped unless the job
 * runs with `overwrite`.
 */

use super::unit::{JobOptions, TranslationUnit};

/// Whether `unit` needs translation under `options`
pub fn needs_translation(unit: &TranslationUnit, options: &JobOptions) -> bool {
    options.overwrite || unit.existing_target_text.is_empty() || unit.is_stale
}

/// Keep the units that need translation, preserving order
pub fn select_units(units: Vec<TranslationUnit>, options: &JobOptions) -> Vec<TranslationUnit> {
    units
        .into_iter()
        .filter(|unit| needs_translation(unit, options))
        .collect()
}
