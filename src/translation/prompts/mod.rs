/*!
 * Prompt construction for batch translation.
 *
 * This module provides:
 * - The system prompt template with its output contract
 * - Optional maintainer context appended to the system prompt
 * - The user message: preamble plus JSON payload
 */

pub mod templates;

// Re-export main types
pub use templates::{PromptTemplate, TranslationPrompt, TranslationPromptBuilder};
