/*!
 * Prompt templates for catalog and record translation.
 *
 * The system prompt states the output contract (a JSON array of the same
 * length and order, placeholders and markup untouched). The user message is
 * a short preamble followed by the JSON payload of the batch.
 */

use crate::language_utils::display_name;
use crate::translation::unit::Batch;

/// System prompt template for string translation.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template text
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for localization strings.
    pub const LOCALIZATION_TRANSLATOR: &'static str = "You are a professional software localization translator.\n\
Important rules:\n\
- The input is a JSON array of strings (or objects with 'text' and optional 'comment' fields). \
The output MUST be a JSON array of translated strings.\n\
- CRITICAL: The output array MUST have EXACTLY the same number of elements as the input array. \
Each input string at index N must have its translation at index N in the output. \
Never skip, merge, or omit any strings.\n\
- When an input element has a 'comment' field, use it as context to disambiguate the meaning, \
but do NOT include the comment in the output.\n\
- Preserve all placeholders like %(name)s, {name}, {0}, %s exactly as-is, byte for byte.\n\
- Preserve HTML tags exactly as they are.\n\
- Preserve line breaks (\\n) in the text.\n\
- Do not change the order of the strings.\n\
- Return ONLY the JSON array of translated strings, nothing else.\n\
- Do NOT wrap the JSON in markdown code blocks. Return raw JSON only.";

    /// Heading of the maintainer-provided context section.
    pub const CONTEXT_HEADING: &'static str = "## Project Context\n\
The following context has been provided by the project maintainers \
to help you produce accurate translations:\n\n";

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default localization translator template.
    pub fn localization_translator() -> Self {
        Self::new(Self::LOCALIZATION_TRANSLATOR)
    }

    /// Render the template, appending the context section when non-blank.
    pub fn render(&self, context: Option<&str>) -> String {
        match context.map(str::trim).filter(|c| !c.is_empty()) {
            Some(context) => format!("{}\n\n{}{}", self.template, Self::CONTEXT_HEADING, context),
            None => self.template.clone(),
        }
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::localization_translator()
    }
}

/// Rendered prompt pair for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationPrompt {
    /// System message
    pub system: String,
    /// User message
    pub user: String,
}

/// Builder for constructing translation prompts.
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder {
    template: PromptTemplate,
    target_language: String,
    context: Option<String>,
}

impl TranslationPromptBuilder {
    /// Create a new prompt builder for a target language code.
    pub fn new(target_language: &str) -> Self {
        Self {
            template: PromptTemplate::default(),
            target_language: target_language.to_string(),
            context: None,
        }
    }

    /// Target language code
    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    /// Set the project context (style guide, glossary).
    pub fn with_context(mut self, context: Option<&str>) -> Self {
        self.context = context.map(str::to_string);
        self
    }

    /// Build the system prompt.
    pub fn build_system_prompt(&self) -> String {
        self.template.render(self.context.as_deref())
    }

    /// Preamble naming the unit count and the target language.
    pub fn preamble(&self, count: usize) -> String {
        let language = display_name(&self.target_language);
        format!(
            "Translate the following {count} strings to {language}. \
             Return a JSON array with exactly {count} translated strings:\n"
        )
    }

    /// Build the user message for a batch.
    pub fn build_user_prompt(&self, batch: &Batch) -> String {
        let mut prompt = self.preamble(batch.len());
        prompt.push_str(&batch.payload_json());
        prompt
    }

    /// Build both prompts for a batch.
    pub fn build(&self, batch: &Batch) -> TranslationPrompt {
        TranslationPrompt {
            system: self.build_system_prompt(),
            user: self.build_user_prompt(batch),
        }
    }

    /// Characters taken by the prompt outside the payload, for budget estimates.
    pub fn overhead_chars(&self) -> usize {
        self.build_system_prompt().len() + self.preamble(0).len()
    }
}
