// src/db/category_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_db_error, error::AppError},
    models::{category::Category, ticket::TicketKind},
};

const CATEGORY_COLUMNS: &str =
    "id, name, description, kind, client_id, sla_policy_id, group_id, is_active, created_at, updated_at";

/// Entrada de criação/edição (edição substitui todos os campos).
#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
    pub kind: Option<TicketKind>,
    pub client_id: Option<Uuid>,
    pub sla_policy_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

impl CategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create<'e, E>(&self, executor: E, input: &CategoryInput) -> Result<Category, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO categories (name, description, kind, client_id, sla_policy_id, group_id, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CATEGORY_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.kind)
            .bind(input.client_id)
            .bind(input.sla_policy_id)
            .bind(input.group_id)
            .bind(input.is_active)
            .fetch_one(executor)
            .await
            .map_err(|e| map_db_error(e, &format!("Categoria '{}'", input.name)))
    }

    pub async fn list<'e, E>(&self, executor: E, only_active: bool) -> Result<Vec<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE (is_active OR NOT $1) ORDER BY name ASC"
        );
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(only_active)
            .fetch_all(executor)
            .await?)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1");
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        input: &CategoryInput,
    ) -> Result<Option<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE categories SET
                name = $2, description = $3, kind = $4, client_id = $5,
                sla_policy_id = $6, group_id = $7, is_active = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.kind)
            .bind(input.client_id)
            .bind(input.sla_policy_id)
            .bind(input.group_id)
            .bind(input.is_active)
            .fetch_optional(executor)
            .await
            .map_err(|e| map_db_error(e, &format!("Categoria '{}'", input.name)))
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| map_db_error(e, "Categoria em uso"))?;
        Ok(result.rows_affected() > 0)
    }
}
