//! Research session
//!
//! The caller layer around the orchestrator. A session owns the cancellation
//! token of its active run, the current memory selection and the persistence
//! hand-off. At most one run is active per session.

use super::orchestrator::{ResearchOrchestrator, ResearchRun, RunOutcome};
use super::types::{MemoryContext, ResearchRequest, ResearchResult};
use crate::db::ResearchStore;
use sdk::errors::EngineError;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct ResearchSession {
    session_id: String,
    orchestrator: ResearchOrchestrator,
    store: Option<Arc<dyn ResearchStore>>,
    max_active_memories: usize,
    active_run: Mutex<Option<CancellationToken>>,
    selected: Mutex<Vec<MemoryContext>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clears the active-run slot when a run ends, even if its future is dropped.
struct ActiveRunGuard<'a> {
    slot: &'a Mutex<Option<CancellationToken>>,
}

impl Drop for ActiveRunGuard<'_> {
    fn drop(&mut self) {
        lock(self.slot).take();
    }
}

impl ResearchSession {
    pub fn new(
        session_id: impl Into<String>,
        orchestrator: ResearchOrchestrator,
        store: Option<Arc<dyn ResearchStore>>,
        max_active_memories: usize,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            orchestrator,
            store,
            max_active_memories,
            active_run: Mutex::new(None),
            selected: Mutex::new(Vec::new()),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Run `request` with the current memory selection.
    ///
    /// A completed result is saved to the store; a save failure is logged
    /// and the result is still returned.
    ///
    /// # Errors
    /// `EngineError::RunInProgress` if this session already has an active run.
    pub async fn start(&self, request: &ResearchRequest) -> Result<ResearchRun, EngineError> {
        let token = {
            let mut slot = lock(&self.active_run);
            if slot.is_some() {
                return Err(EngineError::RunInProgress);
            }
            let token = CancellationToken::new();
            *slot = Some(token.clone());
            token
        };
        let _guard = ActiveRunGuard {
            slot: &self.active_run,
        };

        let memories = self.active_memories();
        let run = self.orchestrator.run(request, &memories, token).await;

        if let RunOutcome::Completed(result) = &run.outcome {
            self.persist(result).await;
        }

        Ok(run)
    }

    async fn persist(&self, result: &ResearchResult) {
        let Some(store) = &self.store else {
            return;
        };
        match store.save_result(&self.session_id, result).await {
            Ok(()) => debug!("Saved research result {}", result.id),
            Err(e) => warn!("Failed to save research result {}: {:#}", result.id, e),
        }
    }

    /// Request cooperative cancellation of the active run. No-op when idle;
    /// calling it repeatedly is harmless.
    pub fn cancel(&self) {
        if let Some(token) = lock(&self.active_run).as_ref() {
            if !token.is_cancelled() {
                info!("Cancelling active research run");
                token.cancel();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.active_run).is_some()
    }

    /// Add a memory context to the selection. Selecting an already selected
    /// id is a no-op.
    ///
    /// # Errors
    /// `EngineError::MemorySelectionFull` when the bound is reached.
    pub fn select_memory(&self, ctx: MemoryContext) -> Result<(), EngineError> {
        let mut selected = lock(&self.selected);
        if selected.iter().any(|m| m.id == ctx.id) {
            return Ok(());
        }
        if selected.len() >= self.max_active_memories {
            return Err(EngineError::MemorySelectionFull(self.max_active_memories));
        }
        selected.push(ctx);
        Ok(())
    }

    /// Remove a memory context from the selection. Returns whether it was selected.
    pub fn deselect_memory(&self, id: &str) -> bool {
        let mut selected = lock(&self.selected);
        let before = selected.len();
        selected.retain(|m| m.id != id);
        selected.len() != before
    }

    pub fn clear_selection(&self) {
        lock(&self.selected).clear();
    }

    /// Current memory selection, in selection order
    pub fn active_memories(&self) -> Vec<MemoryContext> {
        lock(&self.selected).clone()
    }

    /// Store a completed result as a memory context of this session.
    pub async fn remember(&self, result: &ResearchResult) -> anyhow::Result<MemoryContext> {
        let ctx = MemoryContext::from_result(result);
        if let Some(store) = &self.store {
            store.save_memory(&self.session_id, &ctx).await?;
        }
        Ok(ctx)
    }
}
