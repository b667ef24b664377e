//! Pass Executor
//!
//! Builds the prompt for one analysis pass and performs its single
//! generation call. Each pass sees the query, the memory block and an
//! excerpt of every earlier pass, so pass `i` strictly depends on passes
//! `0..i`.

use super::memory::excerpt;
use super::types::{PassRecord, ResearchRequest};
use crate::llm::{self, GenerationRequest, TextGenerator};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Characters of each earlier pass carried into a later pass prompt
pub const PRIOR_PASS_CHARS: usize = 500;

/// Pass labels in execution order. Passes beyond the list reuse the last one.
pub const PASS_LABELS: [&str; 8] = [
    "INITIAL ANALYSIS",
    "DEEP INVESTIGATION",
    "CRITICAL EVALUATION",
    "EVIDENCE SYNTHESIS",
    "ALTERNATIVE PERSPECTIVES",
    "GAP ANALYSIS",
    "CROSS-VALIDATION",
    "FINAL REFINEMENT",
];

/// Label for pass `index` (0-based)
pub fn pass_label(index: usize) -> &'static str {
    PASS_LABELS[index.min(PASS_LABELS.len() - 1)]
}

pub struct PassExecutor {
    generator: Arc<dyn TextGenerator>,
}

impl PassExecutor {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub fn system_prompt(index: usize, total: usize) -> String {
        format!(
            "You are a meticulous research analyst performing pass {} of {} of a \
             multi-pass deep research process. Current pass: {}.\n\
             Produce structured, rigorous markdown: use headings, cite the evidence \
             behind each claim, separate established facts from speculation, and \
             state uncertainty explicitly.",
            index + 1,
            total,
            pass_label(index)
        )
    }

    pub fn user_prompt(
        index: usize,
        request: &ResearchRequest,
        memory_block: &str,
        prior_outputs: &[PassRecord],
    ) -> String {
        let mut prompt = format!("RESEARCH QUERY:\n{}\n", request.query);

        if !memory_block.is_empty() {
            prompt.push('\n');
            prompt.push_str(memory_block);
            prompt.push('\n');
        }

        if !prior_outputs.is_empty() {
            prompt.push_str("\n=== PREVIOUS PASSES ===\n");
            for record in prior_outputs {
                prompt.push_str(&format!(
                    "\n[Pass {}: {}]\n{}\n",
                    record.index + 1,
                    record.label,
                    excerpt(&record.output, PRIOR_PASS_CHARS)
                ));
            }
            prompt.push_str("\n=== END PREVIOUS PASSES ===\n");
        }

        prompt.push_str(&format!(
            "\nExecute the {} pass thoroughly. Build on the previous passes where \
             they exist rather than repeating them.",
            pass_label(index)
        ));
        prompt
    }

    /// Run pass `index` of `total`. Generation errors, cancellation included,
    /// are returned as-is.
    pub async fn execute(
        &self,
        index: usize,
        total: usize,
        request: &ResearchRequest,
        memory_block: &str,
        prior_outputs: &[PassRecord],
        cancel: &CancellationToken,
    ) -> llm::Result<PassRecord> {
        let generation = GenerationRequest::new(
            request.model.clone(),
            Self::system_prompt(index, total),
            Self::user_prompt(index, request, memory_block, prior_outputs),
            request.max_tokens,
            request.temperature,
        );

        debug!(
            "Pass {}/{} prompt: {} chars",
            index + 1,
            total,
            generation.user_prompt.len()
        );

        let output = self
            .generator
            .generate(&request.provider, &generation, cancel)
            .await?;

        Ok(PassRecord {
            index,
            label: pass_label(index),
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::memory::TRUNCATION_MARKER;
    use crate::research::types::DepthTier;

    fn request() -> ResearchRequest {
        ResearchRequest::new("How do B-trees stay balanced?", "ollama", "", DepthTier::Deep, 512, 0.3)
            .unwrap()
    }

    #[test]
    fn test_label_reuses_last_beyond_list() {
        assert_eq!(pass_label(0), "INITIAL ANALYSIS");
        assert_eq!(pass_label(7), "FINAL REFINEMENT");
        assert_eq!(pass_label(12), "FINAL REFINEMENT");
    }

    #[test]
    fn test_system_prompt_names_pass_and_label() {
        let prompt = PassExecutor::system_prompt(1, 5);
        assert!(prompt.contains("pass 2 of 5"));
        assert!(prompt.contains("DEEP INVESTIGATION"));
        assert!(prompt.contains("markdown"));
    }

    #[test]
    fn test_first_pass_has_no_previous_block() {
        let prompt = PassExecutor::user_prompt(0, &request(), "", &[]);
        assert!(prompt.contains("How do B-trees stay balanced?"));
        assert!(!prompt.contains("PREVIOUS PASSES"));
        assert!(prompt.contains("Execute the INITIAL ANALYSIS pass"));
    }

    #[test]
    fn test_prior_passes_truncated_in_order() {
        let prior = vec![
            PassRecord {
                index: 0,
                label: pass_label(0),
                output: format!("{}ZZZ", "x".repeat(PRIOR_PASS_CHARS)),
            },
            PassRecord {
                index: 1,
                label: pass_label(1),
                output: "second pass findings".to_string(),
            },
        ];

        let prompt = PassExecutor::user_prompt(2, &request(), "MEMORY", &prior);

        let first = prompt
            .find(&format!("{}{}", "x".repeat(PRIOR_PASS_CHARS), TRUNCATION_MARKER))
            .unwrap();
        let second = prompt.find("second pass findings").unwrap();
        assert!(first < second);
        assert!(!prompt.contains("ZZZ"));
        assert!(prompt.contains("MEMORY"));
        assert!(prompt.contains("CRITICAL EVALUATION"));
    }
}
