//! Memory context persistence
//!
//! Stored query/answer pairs that can be re-injected into later research
//! runs of the same session.

use super::results::from_millis;
use crate::research::MemoryContext;
use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Repository for the `memory_contexts` table
pub struct MemoryRepository {
    pool: SqlitePool,
}

fn row_to_memory(r: &SqliteRow) -> Result<MemoryContext> {
    Ok(MemoryContext {
        id: r.get("id"),
        query: r.get("query"),
        answer: r.get("answer"),
        provider: r.get("provider"),
        model: r.get("model"),
        created_at: from_millis(r.get("created_at"))?,
    })
}

impl MemoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, session_id: &str, ctx: &MemoryContext) -> Result<()> {
        sqlx::query(
            "INSERT INTO memory_contexts \
             (id, session_id, query, answer, provider, model, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&ctx.id)
        .bind(session_id)
        .bind(&ctx.query)
        .bind(&ctx.answer)
        .bind(&ctx.provider)
        .bind(&ctx.model)
        .bind(ctx.created_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .context("Failed to save memory context")?;

        Ok(())
    }

    /// Memory contexts of one session, most recent first
    pub async fn list(&self, session_id: &str) -> Result<Vec<MemoryContext>> {
        let rows = sqlx::query(
            "SELECT id, query, answer, provider, model, created_at \
             FROM memory_contexts WHERE session_id = ? \
             ORDER BY created_at DESC, rowid DESC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load memory contexts")?;

        rows.iter().map(row_to_memory).collect()
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let done = sqlx::query("DELETE FROM memory_contexts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete memory context")?;

        Ok(done.rows_affected() > 0)
    }

    /// Remove every memory context of one session. Returns the number removed.
    pub async fn clear(&self, session_id: &str) -> Result<u64> {
        let done = sqlx::query("DELETE FROM memory_contexts WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .context("Failed to clear memory contexts")?;

        Ok(done.rows_affected())
    }
}
