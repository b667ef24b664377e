//! Synthesizer
//!
//! Merges the completed pass outputs into one definitive report with a
//! fixed section structure.

use super::types::{PassRecord, ResearchRequest};
use crate::llm::{self, GenerationRequest, TextGenerator};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Report sections the synthesis asks for, in order
pub const REPORT_SECTIONS: [&str; 5] = [
    "Executive Summary",
    "Detailed Analysis",
    "Key Findings",
    "Limitations",
    "Conclusions",
];

pub struct Synthesizer {
    generator: Arc<dyn TextGenerator>,
}

impl Synthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Whether a run with `total` configured passes and `completed` finished
    /// passes gets a synthesis call. Cancellation is checked by the caller.
    pub fn should_run(total: usize, completed: usize) -> bool {
        total > 1 && completed > 1
    }

    pub fn system_prompt() -> String {
        let sections = REPORT_SECTIONS
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}. ## {}", i + 1, s))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are a senior research editor. Merge the analysis passes below into \
             one definitive research report. Resolve contradictions, drop repetition \
             and keep every well-supported finding.\n\
             Structure the report exactly as:\n{}",
            sections
        )
    }

    pub fn user_prompt(request: &ResearchRequest, memory_block: &str, passes: &[PassRecord]) -> String {
        let mut prompt = format!("RESEARCH QUERY:\n{}\n", request.query);

        if !memory_block.is_empty() {
            prompt.push('\n');
            prompt.push_str(memory_block);
            prompt.push('\n');
        }

        for record in passes {
            prompt.push_str(&format!(
                "\n===== PASS {}: {} =====\n{}\n",
                record.index + 1,
                record.label,
                record.output
            ));
        }

        prompt.push_str("\nWrite the final synthesized report now.");
        prompt
    }

    pub async fn synthesize(
        &self,
        request: &ResearchRequest,
        memory_block: &str,
        passes: &[PassRecord],
        cancel: &CancellationToken,
    ) -> llm::Result<String> {
        let generation = GenerationRequest::new(
            request.model.clone(),
            Self::system_prompt(),
            Self::user_prompt(request, memory_block, passes),
            request.max_tokens,
            request.temperature,
        );

        self.generator
            .generate(&request.provider, &generation, cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::pass::pass_label;
    use crate::research::types::DepthTier;

    #[test]
    fn test_should_run() {
        assert!(!Synthesizer::should_run(1, 1));
        assert!(!Synthesizer::should_run(5, 1));
        assert!(!Synthesizer::should_run(3, 0));
        assert!(Synthesizer::should_run(3, 2));
        assert!(Synthesizer::should_run(8, 8));
    }

    #[test]
    fn test_system_prompt_section_order() {
        let prompt = Synthesizer::system_prompt();
        let positions: Vec<usize> = REPORT_SECTIONS
            .iter()
            .map(|s| prompt.find(s).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_user_prompt_includes_every_full_pass() {
        let request =
            ResearchRequest::new("Q", "ollama", "", DepthTier::Standard, 256, 0.5).unwrap();
        let long = "y".repeat(2000);
        let passes = vec![
            PassRecord { index: 0, label: pass_label(0), output: long.clone() },
            PassRecord { index: 1, label: pass_label(1), output: "two".to_string() },
        ];

        let prompt = Synthesizer::user_prompt(&request, "MEM", &passes);
        assert!(prompt.contains(&long));
        assert!(prompt.contains("===== PASS 1: INITIAL ANALYSIS ====="));
        assert!(prompt.contains("===== PASS 2: DEEP INVESTIGATION ====="));
        assert!(prompt.contains("MEM"));
    }
}
