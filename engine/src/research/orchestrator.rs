//! Research Orchestrator
//!
//! The pass-pipeline state machine:
//!
//! ```text
//! INIT -> RUNNING_PASS(0..N) -> [SYNTHESIZING] -> SCORING -> DONE
//!              |                     |
//!              +----> ABORTED <------+      (cancellation)
//!              +----> FAILED  <------+      (generation error)
//! ```
//!
//! Passes run strictly one after another; the only suspension points are the
//! awaited generation calls. Cancellation is polled before every pass and
//! forwarded into each in-flight call. An aborted run records no further
//! events and never produces a result; a failed run records exactly one
//! `ERROR` event.

use super::bus::ThoughtBus;
use super::confidence;
use super::memory::MemoryInjector;
use super::pass::{pass_label, PassExecutor};
use super::synthesizer::Synthesizer;
use super::thought_log::{ThoughtKind, ThoughtLog};
use super::types::{MemoryContext, PassRecord, ResearchRequest, ResearchResult};
use crate::llm::{LLMError, TextGenerator};
use crate::secrets::scrub_secrets;
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(ResearchResult),
    /// Stopped by the user
    Aborted,
    /// Generation failed; carries the error message
    Failed(String),
}

impl RunOutcome {
    pub fn result(&self) -> Option<&ResearchResult> {
        match self {
            RunOutcome::Completed(result) => Some(result),
            _ => None,
        }
    }

    pub fn into_result(self) -> Option<ResearchResult> {
        match self {
            RunOutcome::Completed(result) => Some(result),
            _ => None,
        }
    }
}

/// Outcome of one run together with its thought log
#[derive(Debug)]
pub struct ResearchRun {
    pub outcome: RunOutcome,
    pub log: ThoughtLog,
}

/// Non-completion exits of the pass pipeline
enum Halt {
    Aborted,
    Failed(String),
}

impl From<LLMError> for Halt {
    fn from(err: LLMError) -> Self {
        if err.is_cancellation() {
            Halt::Aborted
        } else {
            Halt::Failed(scrub_secrets(&err.to_string()))
        }
    }
}

pub struct ResearchOrchestrator {
    executor: PassExecutor,
    synthesizer: Synthesizer,
    bus: ThoughtBus,
}

impl ResearchOrchestrator {
    pub fn new(generator: Arc<dyn TextGenerator>, bus: ThoughtBus) -> Self {
        Self {
            executor: PassExecutor::new(Arc::clone(&generator)),
            synthesizer: Synthesizer::new(generator),
            bus,
        }
    }

    /// Execute one research run.
    ///
    /// `memories` is the caller-selected memory set; its size is bounded by
    /// the selection surface, not here.
    pub async fn run(
        &self,
        request: &ResearchRequest,
        memories: &[MemoryContext],
        cancel: CancellationToken,
    ) -> ResearchRun {
        let mut log = ThoughtLog::new();

        let outcome = match self.pipeline(request, memories, &cancel, &mut log).await {
            Ok(result) => RunOutcome::Completed(result),
            Err(Halt::Aborted) => {
                info!(
                    "Research aborted by user after {:.1}s",
                    log.elapsed().as_secs_f64()
                );
                RunOutcome::Aborted
            }
            Err(Halt::Failed(message)) => {
                error!("Research failed: {}", message);
                log.record(&self.bus, ThoughtKind::Error, message.clone())
                    .await;
                RunOutcome::Failed(message)
            }
        };

        ResearchRun { outcome, log }
    }

    async fn pipeline(
        &self,
        request: &ResearchRequest,
        memories: &[MemoryContext],
        cancel: &CancellationToken,
        log: &mut ThoughtLog,
    ) -> Result<ResearchResult, Halt> {
        // INIT
        let total = request.depth.pass_count();
        let memory_block = MemoryInjector::build(memories);
        let has_memory = !memory_block.is_empty();

        info!(
            "Starting {} research ({} passes) with {}",
            request.depth, total, request.provider
        );
        log.record(
            &self.bus,
            ThoughtKind::Initialize,
            format!(
                "Depth {} -> {} pass{} via {}",
                request.depth,
                total,
                if total == 1 { "" } else { "es" },
                request.provider
            ),
        )
        .await;

        if has_memory {
            log.record(
                &self.bus,
                ThoughtKind::MemoryRetrieval,
                format!("Injecting {} prior research context(s)", memories.len()),
            )
            .await;
        }

        // RUNNING_PASS(i)
        let mut passes: Vec<PassRecord> = Vec::with_capacity(total);
        for index in 0..total {
            if cancel.is_cancelled() {
                return Err(Halt::Aborted);
            }

            log.record(
                &self.bus,
                ThoughtKind::PassStart,
                format!("Pass {}/{}: {}", index + 1, total, pass_label(index)),
            )
            .await;

            let record = self
                .executor
                .execute(index, total, request, &memory_block, &passes, cancel)
                .await?;

            log.record(
                &self.bus,
                ThoughtKind::PassComplete,
                format!(
                    "{} complete ({} words)",
                    record.label,
                    record.output.split_whitespace().count()
                ),
            )
            .await;
            passes.push(record);
        }

        // A cancel that lands after the last pass returned still aborts.
        if cancel.is_cancelled() {
            return Err(Halt::Aborted);
        }

        // SYNTHESIZING
        let answer = if Synthesizer::should_run(total, passes.len()) {
            log.record(
                &self.bus,
                ThoughtKind::Synthesis,
                format!("Merging {} passes into final report", passes.len()),
            )
            .await;

            self.synthesizer
                .synthesize(request, &memory_block, &passes, cancel)
                .await?
        } else {
            passes
                .last()
                .map(|record| record.output.clone())
                .unwrap_or_default()
        };

        if cancel.is_cancelled() {
            return Err(Halt::Aborted);
        }
        if answer.trim().is_empty() {
            return Err(Halt::Failed(format!(
                "{} returned an empty answer",
                request.provider
            )));
        }

        // SCORING
        let confidence = confidence::score(&answer, passes.len(), 0, has_memory);
        log.record(
            &self.bus,
            ThoughtKind::Complete,
            format!(
                "Finished in {:.1}s, confidence {}%",
                log.elapsed().as_secs_f64(),
                confidence
            ),
        )
        .await;

        // DONE
        Ok(ResearchResult {
            id: uuid::Uuid::new_v4().to_string(),
            query: request.query.clone(),
            answer,
            confidence,
            provider: request.provider.clone(),
            model: request.model.clone(),
            depth: request.depth,
            timestamp: Utc::now(),
        })
    }
}
