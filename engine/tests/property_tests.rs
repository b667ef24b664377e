use proptest::prelude::*;

use deepdive_engine::research::confidence::{score, MAX_CONFIDENCE, MIN_CONFIDENCE};
use deepdive_engine::research::memory::MEMORY_ANSWER_CHARS;
use deepdive_engine::research::pass::{PassExecutor, PRIOR_PASS_CHARS};
use deepdive_engine::research::{DepthTier, MemoryContext, MemoryInjector, PassRecord, ResearchRequest, PASS_LABELS};

proptest! {
    #[test]
    fn unknown_tier_names_yield_three_passes(name in "[a-z]{1,12}") {
        prop_assume!(!["quick", "standard", "deep", "exhaustive"].contains(&name.as_str()));
        prop_assert_eq!(DepthTier::parse(&name).pass_count(), 3);
    }

    #[test]
    fn tier_parse_ignores_case(upper in any::<bool>(), tier in 0usize..4) {
        let tier = DepthTier::ALL[tier];
        let name = if upper { tier.as_str().to_uppercase() } else { tier.as_str().to_string() };
        prop_assert_eq!(DepthTier::parse(&name), tier);
    }

    #[test]
    fn score_bounded_for_any_input(
        answer in "(?s).{0,3000}",
        passes in 0usize..100,
        docs in 0usize..100,
        memory in any::<bool>(),
    ) {
        let s = score(&answer, passes, docs, memory);
        prop_assert!(s >= MIN_CONFIDENCE && s <= MAX_CONFIDENCE);
    }

    #[test]
    fn memory_block_carries_query_and_answer_prefix(
        queries in prop::collection::vec("[a-zA-Z ?]{1,80}", 1..=5),
        answer in "[a-z ]{0,1200}",
    ) {
        let contexts: Vec<MemoryContext> = queries
            .iter()
            .map(|q| MemoryContext::new(q.clone(), answer.clone(), "ollama", "m"))
            .collect();

        let block = MemoryInjector::build(&contexts);
        let prefix: String = answer.chars().take(MEMORY_ANSWER_CHARS).collect();
        for q in &queries {
            prop_assert!(block.contains(q.as_str()));
        }
        prop_assert!(block.contains(&prefix));
    }

    #[test]
    fn pass_prompt_contains_prior_excerpts_in_order(
        outputs in prop::collection::vec("[a-z]{1,800}", 1..8),
    ) {
        let request = ResearchRequest::new("query", "ollama", "", DepthTier::Exhaustive, 100, 0.5).unwrap();
        let prior: Vec<PassRecord> = outputs
            .iter()
            .enumerate()
            .map(|(index, output)| PassRecord {
                index,
                label: PASS_LABELS[index],
                output: output.clone(),
            })
            .collect();

        let prompt = PassExecutor::user_prompt(prior.len(), &request, "", &prior);

        let mut cursor = 0;
        for record in &prior {
            let header = format!("[Pass {}: {}]\n", record.index + 1, record.label);
            let excerpt: String = record.output.chars().take(PRIOR_PASS_CHARS).collect();
            let expected = format!("{}{}", header, excerpt);
            let found = prompt[cursor..].find(&expected);
            prop_assert!(found.is_some());
            cursor += found.unwrap_or(0) + expected.len();
        }
    }
}
