//! Research store
//!
//! The persistence capability the research session hands completed runs to.
//! Every operation is independent of the engine: a failure here is logged by
//! the caller and never invalidates a produced result.

use super::memory::MemoryRepository;
use super::results::ResultRepository;
use crate::research::{MemoryContext, ResearchResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;

#[async_trait]
pub trait ResearchStore: Send + Sync {
    async fn save_result(&self, session_id: &str, result: &ResearchResult) -> Result<()>;

    /// Most recent first
    async fn load_results(&self, session_id: &str, limit: usize) -> Result<Vec<ResearchResult>>;

    async fn get_result(&self, id: &str) -> Result<Option<ResearchResult>>;

    async fn delete_result(&self, id: &str) -> Result<bool>;

    async fn save_memory(&self, session_id: &str, ctx: &MemoryContext) -> Result<()>;

    /// Most recent first
    async fn load_memory(&self, session_id: &str) -> Result<Vec<MemoryContext>>;

    async fn delete_memory(&self, id: &str) -> Result<bool>;

    async fn clear_memory(&self, session_id: &str) -> Result<u64>;
}

/// SQLite-backed [`ResearchStore`]
pub struct SqliteStore {
    results: ResultRepository,
    memory: MemoryRepository,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            results: ResultRepository::new(pool.clone()),
            memory: MemoryRepository::new(pool),
        }
    }
}

#[async_trait]
impl ResearchStore for SqliteStore {
    async fn save_result(&self, session_id: &str, result: &ResearchResult) -> Result<()> {
        self.results.save(session_id, result).await
    }

    async fn load_results(&self, session_id: &str, limit: usize) -> Result<Vec<ResearchResult>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.results.list(session_id, limit).await
    }

    async fn get_result(&self, id: &str) -> Result<Option<ResearchResult>> {
        self.results.get(id).await
    }

    async fn delete_result(&self, id: &str) -> Result<bool> {
        self.results.delete(id).await
    }

    async fn save_memory(&self, session_id: &str, ctx: &MemoryContext) -> Result<()> {
        self.memory.save(session_id, ctx).await
    }

    async fn load_memory(&self, session_id: &str) -> Result<Vec<MemoryContext>> {
        self.memory.list(session_id).await
    }

    async fn delete_memory(&self, id: &str) -> Result<bool> {
        self.memory.delete(id).await
    }

    async fn clear_memory(&self, session_id: &str) -> Result<u64> {
        self.memory.clear(session_id).await
    }
}
