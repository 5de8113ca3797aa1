// src/services/category_service.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        sanitize::{sanitize_optional, sanitize_text, MAX_TEXT_CHARS, MAX_TITLE_CHARS},
    },
    db::{category_repo::CategoryInput, CategoryRepository},
    models::{category::Category, ticket::TicketDraft},
};

/// Valores que uma categoria propaga para o chamado.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TicketDefaults {
    pub client_id: Option<Uuid>,
    pub sla_policy_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
}

impl TicketDefaults {
    /// Preenche só o que o chamador deixou vazio.
    pub fn fill(&self, draft: &mut TicketDraft) {
        if draft.client_id.is_none() {
            draft.client_id = self.client_id;
        }
        if draft.sla_policy_id.is_none() {
            draft.sla_policy_id = self.sla_policy_id;
        }
        if draft.group_id.is_none() {
            draft.group_id = self.group_id;
        }
    }
}

pub fn derive_defaults_from_category(category: &Category) -> TicketDefaults {
    TicketDefaults {
        client_id: category.client_id,
        sla_policy_id: category.sla_policy_id,
        group_id: category.group_id,
    }
}

#[derive(Clone)]
pub struct CategoryService {
    repo: CategoryRepository,
}

impl CategoryService {
    pub fn new(repo: CategoryRepository) -> Self {
        Self { repo }
    }

    fn clean(mut input: CategoryInput) -> Result<CategoryInput, AppError> {
        input.name = sanitize_text(&input.name, MAX_TITLE_CHARS);
        if input.name.is_empty() {
            return Err(AppError::InvalidField { field: "name", code: "required" });
        }
        input.description = sanitize_optional(input.description.as_deref(), MAX_TEXT_CHARS);
        Ok(input)
    }

    pub async fn create<'e, E>(&self, executor: E, input: CategoryInput) -> Result<Category, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let input = Self::clean(input)?;
        let category = self.repo.create(executor, &input).await?;
        tracing::info!("Categoria criada: {} ({})", category.name, category.id);
        Ok(category)
    }

    pub async fn list<'e, E>(&self, executor: E, only_active: bool) -> Result<Vec<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list(executor, only_active).await
    }

    pub async fn get<'e, E>(&self, executor: E, id: Uuid) -> Result<Category, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .find_by_id(executor, id)
            .await?
            .ok_or(AppError::NotFound("Categoria"))
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        input: CategoryInput,
    ) -> Result<Category, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let input = Self::clean(input)?;
        self.repo
            .update(executor, id, &input)
            .await?
            .ok_or(AppError::NotFound("Categoria"))
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if !self.repo.delete(executor, id).await? {
            return Err(AppError::NotFound("Categoria"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn category(client: Option<Uuid>, sla: Option<Uuid>, group: Option<Uuid>) -> Category {
        Category {
            id: Uuid::new_v4(),
            name: "Rede".into(),
            description: None,
            kind: None,
            client_id: client,
            sla_policy_id: sla,
            group_id: group,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_defaults_fill_empty_fields() {
        let (c, s, g) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let defaults = derive_defaults_from_category(&category(Some(c), Some(s), Some(g)));

        let mut draft = TicketDraft::default();
        defaults.fill(&mut draft);

        assert_eq!(draft.client_id, Some(c));
        assert_eq!(draft.sla_policy_id, Some(s));
        assert_eq!(draft.group_id, Some(g));
    }

    #[test]
    fn test_defaults_never_override_caller_values() {
        let chosen_group = Uuid::new_v4();
        let defaults =
            derive_defaults_from_category(&category(Some(Uuid::new_v4()), None, Some(Uuid::new_v4())));

        let mut draft = TicketDraft { group_id: Some(chosen_group), ..Default::default() };
        defaults.fill(&mut draft);

        assert_eq!(draft.group_id, Some(chosen_group));
        assert!(draft.client_id.is_some());
        assert_eq!(draft.sla_policy_id, None);
    }

    #[test]
    fn test_clean_rejects_blank_name() {
        let input = CategoryInput {
            name: "   ".into(),
            description: Some("  ".into()),
            kind: None,
            client_id: None,
            sla_policy_id: None,
            group_id: None,
            is_active: true,
        };
        assert!(matches!(
            CategoryService::clean(input),
            Err(AppError::InvalidField { field: "name", .. })
        ));
    }
}
