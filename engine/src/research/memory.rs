//! Memory Injector
//!
//! Formats the caller-selected memory contexts into one text block that is
//! threaded into every pass prompt and into the synthesis prompt.

use super::types::MemoryContext;

/// Characters of a stored answer carried into the memory block
pub const MEMORY_ANSWER_CHARS: usize = 600;

pub const TRUNCATION_MARKER: &str = "...[truncated]";

const MEMORY_BANNER_START: &str = "=== PRIOR RESEARCH MEMORY (context from earlier sessions) ===";
const MEMORY_BANNER_END: &str = "=== END PRIOR RESEARCH MEMORY ===";

/// The first `max_chars` characters of `text` followed by the truncation
/// marker, which is appended even when nothing was cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let head: String = text.chars().take(max_chars).collect();
    format!("{}{}", head, TRUNCATION_MARKER)
}

pub struct MemoryInjector;

impl MemoryInjector {
    /// Build the memory block for `contexts`, in the given order.
    ///
    /// Returns an empty string when nothing is selected.
    pub fn build(contexts: &[MemoryContext]) -> String {
        if contexts.is_empty() {
            return String::new();
        }

        let mut block = String::new();
        block.push_str(MEMORY_BANNER_START);
        block.push('\n');

        for (i, ctx) in contexts.iter().enumerate() {
            block.push_str(&format!(
                "\n[Memory {}]\nPrevious query: {}\nPrevious findings: {}\n",
                i + 1,
                ctx.query,
                excerpt(&ctx.answer, MEMORY_ANSWER_CHARS)
            ));
        }

        block.push('\n');
        block.push_str(MEMORY_BANNER_END);
        block
    }
}
