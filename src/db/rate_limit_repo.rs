// src/db/rate_limit_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{common::error::AppError, services::rate_limit::RateLimitStore};

/// Contadores de janela na tabela `rate_limits` (chave + início da janela).
#[derive(Clone)]
pub struct PgRateLimitStore {
    pool: PgPool,
}

impl PgRateLimitStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateLimitStore for PgRateLimitStore {
    async fn hit(
        &self,
        key: &str,
        window_start: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<u32, AppError> {
        let (hits,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO rate_limits (key, window_start, hits, expires_at)
            VALUES ($1, $2, 1, $3)
            ON CONFLICT (key, window_start) DO UPDATE SET hits = rate_limits.hits + 1
            RETURNING hits
            "#,
        )
        .bind(key)
        .bind(window_start)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(hits.max(0) as u32)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM rate_limits WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
