// src/db/directory_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_db_error, error::AppError},
    models::directory::{Client, Group},
};

const CLIENT_COLUMNS: &str = "id, name, document, email, phone, is_active, created_at, updated_at";
const GROUP_COLUMNS: &str = "id, name, description, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct ClientInput {
    pub name: String,
    pub document: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
}

// Clientes e grupos de atendimento: cadastros simples do administrador.
#[derive(Clone)]
pub struct DirectoryRepository {
    pool: PgPool,
}

impl DirectoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CLIENTES
    // =========================================================================

    pub async fn create_client<'e, E>(&self, executor: E, input: &ClientInput) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO clients (name, document, email, phone, is_active) VALUES ($1, $2, $3, $4, $5) RETURNING {CLIENT_COLUMNS}"
        );
        sqlx::query_as::<_, Client>(&sql)
            .bind(&input.name)
            .bind(&input.document)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(input.is_active)
            .fetch_one(executor)
            .await
            .map_err(|e| map_db_error(e, &format!("Cliente '{}'", input.name)))
    }

    pub async fn list_clients<'e, E>(&self, executor: E) -> Result<Vec<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY name ASC");
        Ok(sqlx::query_as::<_, Client>(&sql).fetch_all(executor).await?)
    }

    pub async fn update_client<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        input: &ClientInput,
    ) -> Result<Option<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE clients SET name = $2, document = $3, email = $4, phone = $5, is_active = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {CLIENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .bind(&input.name)
            .bind(&input.document)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(input.is_active)
            .fetch_optional(executor)
            .await
            .map_err(|e| map_db_error(e, &format!("Cliente '{}'", input.name)))
    }

    pub async fn delete_client<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| map_db_error(e, "Cliente em uso"))?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  GRUPOS
    // =========================================================================

    pub async fn create_group<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
    ) -> Result<Group, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO groups (name, description) VALUES ($1, $2) RETURNING {GROUP_COLUMNS}"
        );
        sqlx::query_as::<_, Group>(&sql)
            .bind(name)
            .bind(description)
            .fetch_one(executor)
            .await
            .map_err(|e| map_db_error(e, &format!("Grupo '{}'", name)))
    }

    pub async fn list_groups<'e, E>(&self, executor: E) -> Result<Vec<Group>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM groups ORDER BY name ASC");
        Ok(sqlx::query_as::<_, Group>(&sql).fetch_all(executor).await?)
    }

    pub async fn find_group<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Group>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM groups WHERE id = $1");
        Ok(sqlx::query_as::<_, Group>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?)
    }

    pub async fn update_group<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Option<Group>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "UPDATE groups SET name = $2, description = $3, updated_at = NOW() WHERE id = $1 RETURNING {GROUP_COLUMNS}"
        );
        sqlx::query_as::<_, Group>(&sql)
            .bind(id)
            .bind(name)
            .bind(description)
            .fetch_optional(executor)
            .await
            .map_err(|e| map_db_error(e, &format!("Grupo '{}'", name)))
    }

    pub async fn delete_group<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| map_db_error(e, "Grupo em uso"))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_group_members<'e, E>(&self, executor: E, group_id: Uuid) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM group_members WHERE group_id = $1 ORDER BY user_id",
        )
        .bind(group_id)
        .fetch_all(executor)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Substitui a lista de membros (chamar dentro de uma transação).
    pub async fn clear_group_members<'e, E>(&self, executor: E, group_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM group_members WHERE group_id = $1")
            .bind(group_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn add_group_members<'e, E>(
        &self,
        executor: E,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Inserção em massa usando UNNEST
        sqlx::query(
            r#"
            INSERT INTO group_members (group_id, user_id)
            SELECT $1, unnest($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(user_ids)
        .execute(executor)
        .await
        .map_err(|e| map_db_error(e, "Usuário inexistente"))?;
        Ok(())
    }
}
