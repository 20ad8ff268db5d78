/*!
 * Batch building.
 *
 * Selected units are grouped greedily into batches whose serialized payload
 * stays within a character budget and, when the provider caps it, a unit
 * count. Order is preserved across and within
 * batches, and a unit larger than the budget still gets a batch of its own.
 */

use log::debug;

use super::unit::{Batch, PayloadItem, TranslationUnit};

/// Characters per token used to turn a token limit into a character budget
pub const CHARS_PER_TOKEN: usize = 4;

/// Expected reply size relative to the input (translations run a bit longer)
pub const OUTPUT_RATIO: f64 = 1.3;

/// Greedy size-bounded batch builder
#[derive(Debug, Clone, Copy)]
pub struct BatchBuilder {
    /// Maximum serialized payload size of a batch, in bytes
    max_batch_chars: usize,
    /// Maximum number of units per batch, when the provider caps it
    max_units: Option<usize>,
}

/// Running size of the batch under construction.
///
/// Both plain and object encodings are tracked because a single commented
/// unit switches the whole payload to objects.
#[derive(Debug, Default)]
struct RunningSize {
    count: usize,
    plain: usize,
    annotated: usize,
    has_comment: bool,
}

impl RunningSize {
    fn with(&self, unit: &TranslationUnit) -> Self {
        Self {
            count: self.count + 1,
            plain: self.plain + item_len(&unit.payload_item(false)),
            annotated: self.annotated + item_len(&unit.payload_item(true)),
            has_comment: self.has_comment || unit.comment.is_some(),
        }
    }

    /// Size of `[item,item,...]`
    fn total(&self) -> usize {
        if self.count == 0 {
            return 2;
        }
        let items = if self.has_comment { self.annotated } else { self.plain };
        2 + items + (self.count - 1)
    }
}

fn item_len(item: &PayloadItem<'_>) -> usize {
    serde_json::to_string(item).map(|s| s.len()).unwrap_or(0)
}

impl BatchBuilder {
    /// Create a builder with an explicit character budget
    pub fn new(max_batch_chars: usize) -> Self {
        Self {
            max_batch_chars: max_batch_chars.max(1),
            max_units: None,
        }
    }

    /// Also cap the number of units per batch
    pub fn with_max_units(mut self, max_units: Option<usize>) -> Self {
        self.max_units = max_units.map(|n| n.max(1));
        self
    }

    /// Derive the budget from a model token limit.
    ///
    /// `reserved_chars` covers the system prompt and preamble; the remainder
    /// is split between the request payload and the expected reply.
    pub fn from_token_limit(max_tokens: usize, reserved_chars: usize) -> Self {
        let total_chars = max_tokens.saturating_mul(CHARS_PER_TOKEN);
        let available = total_chars.saturating_sub(reserved_chars);
        let payload_chars = (available as f64 / (1.0 + OUTPUT_RATIO)).floor() as usize;
        Self::new(payload_chars)
    }

    /// Character budget of this builder
    pub fn max_batch_chars(&self) -> usize {
        self.max_batch_chars
    }

    /// Split `units` into ordered batches within the budget
    pub fn build(&self, units: Vec<TranslationUnit>) -> Vec<Batch> {
        let mut batches = Vec::new();
        let mut current: Vec<TranslationUnit> = Vec::new();
        let mut size = RunningSize::default();

        for unit in units {
            let candidate = size.with(&unit);
            let full = self.max_units.is_some_and(|max| current.len() >= max);
            if !current.is_empty() && (full || candidate.total() > self.max_batch_chars) {
                batches.extend(Batch::new(std::mem::take(&mut current)));
                size = RunningSize::default().with(&unit);
            } else {
                size = candidate;
            }
            if current.is_empty() && size.total() > self.max_batch_chars {
                debug!(
                    "Unit '{}' alone exceeds the batch budget ({} > {} chars)",
                    unit.key,
                    size.total(),
                    self.max_batch_chars
                );
            }
            current.push(unit);
        }
        batches.extend(Batch::new(current));

        debug!(
            "Built {} batch(es) with a budget of {} chars",
            batches.len(),
            self.max_batch_chars
        );
        batches
    }
}
