// src/db/dashboard_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::ticket::{Priority, TicketKind, TicketStatus},
};

// Cada contador é uma leitura filtrada independente; a composição fica no serviço.
#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // A. Total em aberto
    pub async fn count_open<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tickets WHERE status = ANY($1)")
            .bind(TicketStatus::OPEN_SET.to_vec())
            .fetch_one(executor)
            .await?;
        Ok(total)
    }

    // B. Em aberto e com prazo vencido
    pub async fn count_at_risk<'e, E>(&self, executor: E, now: DateTime<Utc>) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM tickets
            WHERE status = ANY($1)
              AND resolution_due_at IS NOT NULL
              AND resolution_due_at < $2
            "#,
        )
        .bind(TicketStatus::OPEN_SET.to_vec())
        .bind(now)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }

    // C. Resolvidos desde `since` (meia-noite local)
    pub async fn count_resolved_since<'e, E>(
        &self,
        executor: E,
        since: DateTime<Utc>,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM tickets WHERE resolved_at >= $1")
                .bind(since)
                .fetch_one(executor)
                .await?;
        Ok(total)
    }

    // D. Problemas críticos em aberto
    pub async fn count_critical_problems<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM tickets
            WHERE status = ANY($1) AND priority = $2 AND kind = $3
            "#,
        )
        .bind(TicketStatus::OPEN_SET.to_vec())
        .bind(Priority::Critical)
        .bind(TicketKind::Problem)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }
}
