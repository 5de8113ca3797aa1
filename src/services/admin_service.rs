// src/services/admin_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        sanitize::{sanitize_optional, sanitize_text, MAX_TEXT_CHARS, MAX_TITLE_CHARS},
    },
    db::{directory_repo::ClientInput, DirectoryRepository, UserRepository},
    models::{
        auth::{User, UserRole},
        directory::{Client, Group, GroupDetail},
    },
};

// Administração de usuários, grupos de atendimento e clientes.
#[derive(Clone)]
pub struct AdminService {
    users: UserRepository,
    directory: DirectoryRepository,
}

impl AdminService {
    pub fn new(users: UserRepository, directory: DirectoryRepository) -> Self {
        Self { users, directory }
    }

    // =========================================================================
    //  USUÁRIOS
    // =========================================================================

    pub async fn list_users<'e, E>(&self, executor: E) -> Result<Vec<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.users.list(executor).await
    }

    /// `acting_user` não pode rebaixar nem desativar a si mesmo.
    pub async fn update_user<'e, E>(
        &self,
        executor: E,
        acting_user: &User,
        id: Uuid,
        name: &str,
        role: UserRole,
        client_id: Option<Uuid>,
        is_active: bool,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if acting_user.id == id && (role != acting_user.role || !is_active) {
            return Err(AppError::Forbidden);
        }
        let name = sanitize_text(name, MAX_TITLE_CHARS);
        if name.is_empty() {
            return Err(AppError::InvalidField { field: "name", code: "required" });
        }

        let user = self
            .users
            .update_profile(executor, id, &name, role, client_id, is_active)
            .await?
            .ok_or(AppError::UserNotFound)?;
        tracing::info!("Usuário {} atualizado por {} (papel {:?})", user.id, acting_user.id, user.role);
        Ok(user)
    }

    pub async fn delete_user<'e, E>(&self, executor: E, acting_user: &User, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if acting_user.id == id {
            return Err(AppError::Forbidden);
        }
        if !self.users.delete(executor, id).await? {
            return Err(AppError::UserNotFound);
        }
        Ok(())
    }

    // =========================================================================
    //  GRUPOS
    // =========================================================================

    pub async fn create_group<'a, A>(
        &self,
        conn: A,
        name: &str,
        description: Option<&str>,
        member_ids: &[Uuid],
    ) -> Result<GroupDetail, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let (name, description) = clean_group(name, description)?;

        let mut tx = conn.begin().await?;
        let group = self.directory.create_group(&mut *tx, &name, description.as_deref()).await?;
        if !member_ids.is_empty() {
            self.directory.add_group_members(&mut *tx, group.id, member_ids).await?;
        }
        let member_ids = self.directory.list_group_members(&mut *tx, group.id).await?;
        tx.commit().await?;

        Ok(GroupDetail { group, member_ids })
    }

    pub async fn list_groups<'e, E>(&self, executor: E) -> Result<Vec<Group>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.directory.list_groups(executor).await
    }

    pub async fn get_group<'a, A>(&self, conn: A, id: Uuid) -> Result<GroupDetail, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = conn.acquire().await?;
        let group = self
            .directory
            .find_group(&mut *conn, id)
            .await?
            .ok_or(AppError::NotFound("Grupo"))?;
        let member_ids = self.directory.list_group_members(&mut *conn, id).await?;
        Ok(GroupDetail { group, member_ids })
    }

    /// Atualiza o grupo e substitui a lista de membros na mesma transação.
    pub async fn update_group<'a, A>(
        &self,
        conn: A,
        id: Uuid,
        name: &str,
        description: Option<&str>,
        member_ids: &[Uuid],
    ) -> Result<GroupDetail, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let (name, description) = clean_group(name, description)?;

        let mut tx = conn.begin().await?;
        let group = self
            .directory
            .update_group(&mut *tx, id, &name, description.as_deref())
            .await?
            .ok_or(AppError::NotFound("Grupo"))?;

        self.directory.clear_group_members(&mut *tx, id).await?;
        if !member_ids.is_empty() {
            self.directory.add_group_members(&mut *tx, id, member_ids).await?;
        }
        let member_ids = self.directory.list_group_members(&mut *tx, id).await?;
        tx.commit().await?;

        Ok(GroupDetail { group, member_ids })
    }

    pub async fn delete_group<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if !self.directory.delete_group(executor, id).await? {
            return Err(AppError::NotFound("Grupo"));
        }
        Ok(())
    }

    // =========================================================================
    //  CLIENTES
    // =========================================================================

    pub async fn create_client<'e, E>(&self, executor: E, input: ClientInput) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let input = clean_client(input)?;
        self.directory.create_client(executor, &input).await
    }

    pub async fn list_clients<'e, E>(&self, executor: E) -> Result<Vec<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.directory.list_clients(executor).await
    }

    pub async fn update_client<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        input: ClientInput,
    ) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let input = clean_client(input)?;
        self.directory
            .update_client(executor, id, &input)
            .await?
            .ok_or(AppError::NotFound("Cliente"))
    }

    pub async fn delete_client<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if !self.directory.delete_client(executor, id).await? {
            return Err(AppError::NotFound("Cliente"));
        }
        Ok(())
    }
}

fn clean_group(name: &str, description: Option<&str>) -> Result<(String, Option<String>), AppError> {
    let name = sanitize_text(name, MAX_TITLE_CHARS);
    if name.is_empty() {
        return Err(AppError::InvalidField { field: "name", code: "required" });
    }
    Ok((name, sanitize_optional(description, MAX_TEXT_CHARS)))
}

fn clean_client(input: ClientInput) -> Result<ClientInput, AppError> {
    let name = sanitize_text(&input.name, MAX_TITLE_CHARS);
    if name.is_empty() {
        return Err(AppError::InvalidField { field: "name", code: "required" });
    }
    Ok(ClientInput {
        name,
        document: sanitize_optional(input.document.as_deref(), 32),
        email: sanitize_optional(input.email.as_deref(), 254).map(|e| e.to_lowercase()),
        phone: sanitize_optional(input.phone.as_deref(), 32),
        is_active: input.is_active,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_client_normalizes_fields() {
        let cleaned = clean_client(ClientInput {
            name: " ACME ".into(),
            document: Some("".into()),
            email: Some(" TI@Acme.com ".into()),
            phone: None,
            is_active: true,
        })
        .unwrap();

        assert_eq!(cleaned.name, "ACME");
        assert_eq!(cleaned.document, None);
        assert_eq!(cleaned.email.as_deref(), Some("ti@acme.com"));
    }

    #[test]
    fn test_clean_group_requires_name() {
        assert!(clean_group(" ", None).is_err());
        let (name, description) = clean_group("N1", Some("  Primeiro nível ")).unwrap();
        assert_eq!(name, "N1");
        assert_eq!(description.as_deref(), Some("Primeiro nível"));
    }
}
