// src/db/sla_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_db_error, error::AppError},
    models::sla::SlaPolicy,
};

const POLICY_COLUMNS: &str =
    "id, name, response_hours, resolution_hours, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct SlaPolicyRepository {
    pool: PgPool,
}

impl SlaPolicyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        name: &str,
        response_hours: i32,
        resolution_hours: i32,
        is_active: bool,
    ) -> Result<SlaPolicy, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO sla_policies (name, response_hours, resolution_hours, is_active)
            VALUES ($1, $2, $3, $4)
            RETURNING {POLICY_COLUMNS}
            "#
        );
        sqlx::query_as::<_, SlaPolicy>(&sql)
            .bind(name)
            .bind(response_hours)
            .bind(resolution_hours)
            .bind(is_active)
            .fetch_one(executor)
            .await
            .map_err(|e| map_db_error(e, &format!("SLA '{}'", name)))
    }

    pub async fn list<'e, E>(&self, executor: E) -> Result<Vec<SlaPolicy>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {POLICY_COLUMNS} FROM sla_policies ORDER BY name ASC");
        Ok(sqlx::query_as::<_, SlaPolicy>(&sql).fetch_all(executor).await?)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<SlaPolicy>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {POLICY_COLUMNS} FROM sla_policies WHERE id = $1");
        Ok(sqlx::query_as::<_, SlaPolicy>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: &str,
        response_hours: i32,
        resolution_hours: i32,
        is_active: bool,
    ) -> Result<Option<SlaPolicy>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE sla_policies SET
                name = $2, response_hours = $3, resolution_hours = $4, is_active = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {POLICY_COLUMNS}
            "#
        );
        sqlx::query_as::<_, SlaPolicy>(&sql)
            .bind(id)
            .bind(name)
            .bind(response_hours)
            .bind(resolution_hours)
            .bind(is_active)
            .fetch_optional(executor)
            .await
            .map_err(|e| map_db_error(e, &format!("SLA '{}'", name)))
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM sla_policies WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| map_db_error(e, "SLA em uso"))?;
        Ok(result.rows_affected() > 0)
    }
}
