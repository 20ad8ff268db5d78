/*!
 * Translation engine for message catalogs and record fields.
 *
 * This module contains the source-agnostic core. It is split into several
 * submodules, leaf first:
 *
 * - `unit`: translation units, batches, outcomes and job options
 * - `selection`: which units need a provider call
 * - `batch`: size-bounded, order-preserving batch building
 * - `prompts`: system prompt and user message construction
 * - `response`: reply extraction and positional reconciliation
 * - `retry`: provider error classification and retry policy
 * - `core`: the sequential engine tying the above together
 */

// Re-export main types for easier usage
pub use self::batch::BatchBuilder;
pub use self::core::{BatchFailure, EngineSettings, JobReport, TokenUsageStats, TranslationEngine};
pub use self::prompts::{PromptTemplate, TranslationPromptBuilder};
pub use self::retry::{RetryDecision, RetryPolicy, call_provider, classify};
pub use self::unit::{
    Batch, JobOptions, OutcomeStatus, TranslationOutcome, TranslationUnit, extract_placeholders,
};

// Submodules
pub mod batch;
pub mod core;
pub mod prompts;
pub mod response;
pub mod retry;
pub mod selection;
pub mod unit;
