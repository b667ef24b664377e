//! Research result persistence
//!
//! History of completed research runs, scoped by session id and listed
//! most-recent-first.

use crate::research::{DepthTier, ResearchResult};
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Repository for the `research_results` table
pub struct ResultRepository {
    pool: SqlitePool,
}

pub(crate) fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .with_context(|| format!("Invalid stored timestamp: {}", ms))
}

fn row_to_result(r: &SqliteRow) -> Result<ResearchResult> {
    let confidence: i64 = r.get("confidence");
    Ok(ResearchResult {
        id: r.get("id"),
        query: r.get("query"),
        answer: r.get("answer"),
        confidence: u8::try_from(confidence).context("Stored confidence out of range")?,
        provider: r.get("provider"),
        model: r.get("model"),
        depth: DepthTier::parse(&r.get::<String, _>("depth")),
        timestamp: from_millis(r.get("created_at"))?,
    })
}

impl ResultRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, session_id: &str, result: &ResearchResult) -> Result<()> {
        sqlx::query(
            "INSERT INTO research_results \
             (id, session_id, query, answer, confidence, provider, model, depth, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&result.id)
        .bind(session_id)
        .bind(&result.query)
        .bind(&result.answer)
        .bind(result.confidence as i64)
        .bind(&result.provider)
        .bind(&result.model)
        .bind(result.depth.as_str())
        .bind(result.timestamp.timestamp_millis())
        .execute(&self.pool)
        .await
        .context("Failed to save research result")?;

        Ok(())
    }

    /// Results of one session, most recent first
    pub async fn list(&self, session_id: &str, limit: i64) -> Result<Vec<ResearchResult>> {
        let rows = sqlx::query(
            "SELECT id, query, answer, confidence, provider, model, depth, created_at \
             FROM research_results WHERE session_id = ? \
             ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load research history")?;

        rows.iter().map(row_to_result).collect()
    }

    pub async fn get(&self, id: &str) -> Result<Option<ResearchResult>> {
        let row = sqlx::query(
            "SELECT id, query, answer, confidence, provider, model, depth, created_at \
             FROM research_results WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch research result")?;

        row.as_ref().map(row_to_result).transpose()
    }

    /// Delete a result. Returns false if no row matched.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let done = sqlx::query("DELETE FROM research_results WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete research result")?;

        Ok(done.rows_affected() > 0)
    }
}
