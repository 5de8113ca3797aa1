// src/services/ticket_service.rs

use chrono::{DateTime, Utc};
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        sanitize::{sanitize_optional, sanitize_text, MAX_TEXT_CHARS, MAX_TITLE_CHARS},
    },
    db::{
        ticket_repo::{Classification, NewTicket, TicketUpdate},
        CategoryRepository, SlaPolicyRepository, TicketRepository,
    },
    models::{
        auth::User,
        category::Category,
        sla::SlaPolicy,
        ticket::{
            Level, LifecycleStamps, Priority, Ticket, TicketAttachment, TicketComment,
            TicketDraft, TicketFilter, TicketKind, TicketStatus, TicketView,
        },
    },
    services::{
        category_service::derive_defaults_from_category,
        uploads::{validate_upload, UploadKind},
    },
    sla::{compute_deadlines, Deadlines, SlaEvaluator},
};

/// Arquivo recebido via multipart, ainda não validado.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Clone)]
pub struct TicketService {
    repo: TicketRepository,
    categories: CategoryRepository,
    policies: SlaPolicyRepository,
    evaluator: SlaEvaluator,
}

impl TicketService {
    pub fn new(
        repo: TicketRepository,
        categories: CategoryRepository,
        policies: SlaPolicyRepository,
        evaluator: SlaEvaluator,
    ) -> Self {
        Self { repo, categories, policies, evaluator }
    }

    /// Campos calculados na leitura; o SLA nunca é persistido.
    pub fn view(&self, ticket: Ticket, now: DateTime<Utc>) -> TicketView {
        TicketView {
            display_number: ticket.kind.display_number(ticket.number),
            status_label: ticket.status.label(ticket.kind).to_string(),
            sla_status: self.evaluator.classify(&ticket, now),
            ticket,
        }
    }

    // =========================================================================
    //  1. CRIAÇÃO
    // =========================================================================

    /// Cria o chamado: padrões da categoria, prioridade pela matriz quando
    /// não informada e prazos a partir da política de SLA resolvida.
    pub async fn create<'a, A>(
        &self,
        conn: A,
        mut draft: TicketDraft,
        now: DateTime<Utc>,
    ) -> Result<TicketView, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let title = sanitize_text(&draft.title, MAX_TITLE_CHARS);
        if title.is_empty() {
            return Err(AppError::InvalidField { field: "title", code: "required" });
        }
        let description = sanitize_optional(draft.description.as_deref(), MAX_TEXT_CHARS);

        let mut tx = conn.begin().await?;

        let category = match draft.category_id {
            Some(id) => Some(self.load_category(&mut *tx, id).await?),
            None => None,
        };
        let kind = resolve_kind(draft.kind, category.as_ref())?;
        if let Some(category) = &category {
            derive_defaults_from_category(category).fill(&mut draft);
        }

        let policy = match draft.sla_policy_id {
            Some(id) => Some(
                self.policies
                    .find_by_id(&mut *tx, id)
                    .await?
                    .ok_or(AppError::NotFound("Política de SLA"))?,
            ),
            None => None,
        };

        let urgency = draft.urgency.unwrap_or(Level::Medium);
        let impact = draft.impact.unwrap_or(Level::Medium);
        let new = NewTicket {
            kind,
            title,
            description,
            urgency,
            impact,
            priority: draft.priority.unwrap_or_else(|| Priority::from_matrix(urgency, impact)),
            opened_at: now,
            deadlines: compute_deadlines(now, policy.as_ref()),
            category_id: draft.category_id,
            sla_policy_id: draft.sla_policy_id,
            requester_id: draft.requester_id,
            client_id: draft.client_id,
            group_id: draft.group_id,
            assignee_id: draft.assignee_id,
        };

        let ticket = self.repo.create(&mut *tx, &new).await?;
        tx.commit().await?;

        tracing::info!(
            "Chamado {} criado (prioridade {:?}, prazo {:?})",
            ticket.kind.display_number(ticket.number),
            ticket.priority,
            ticket.resolution_due_at
        );
        Ok(self.view(ticket, now))
    }

    /// Abertura pelo portal: o solicitante é sempre o próprio usuário e
    /// atribuição/SLA ficam por conta da categoria.
    pub async fn create_for_requester<'a, A>(
        &self,
        conn: A,
        requester: &User,
        draft: TicketDraft,
        now: DateTime<Utc>,
    ) -> Result<TicketView, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let draft = TicketDraft {
            requester_id: Some(requester.id),
            client_id: requester.client_id,
            priority: None,
            sla_policy_id: None,
            group_id: None,
            assignee_id: None,
            ..draft
        };
        self.create(conn, draft, now).await
    }

    // =========================================================================
    //  2. LEITURA
    // =========================================================================

    pub async fn list<'e, E>(
        &self,
        executor: E,
        filter: &TicketFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<TicketView>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if let (Some(from), Some(to)) = (filter.due_from, filter.due_to) {
            if from >= to {
                return Err(AppError::InvalidField { field: "dueTo", code: "invalid_date_range" });
            }
        }

        let tickets = self.repo.list(executor, filter).await?;
        Ok(tickets.into_iter().map(|t| self.view(t, now)).collect())
    }

    pub async fn get<'e, E>(&self, executor: E, id: Uuid, now: DateTime<Utc>) -> Result<TicketView, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ticket = self
            .repo
            .find_by_id(executor, id)
            .await?
            .ok_or(AppError::NotFound("Chamado"))?;
        Ok(self.view(ticket, now))
    }

    pub async fn list_for_requester<'e, E>(
        &self,
        executor: E,
        requester: &User,
        filter: TicketFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<TicketView>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let filter = scope_to_requester(filter, requester.id);
        self.list(executor, &filter, now).await
    }

    /// Chamado de outro solicitante responde como inexistente.
    pub async fn get_for_requester<'e, E>(
        &self,
        executor: E,
        requester: &User,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<TicketView, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let view = self.get(executor, id, now).await?;
        if view.ticket.requester_id != Some(requester.id) {
            return Err(AppError::NotFound("Chamado"));
        }
        Ok(view)
    }

    // =========================================================================
    //  3. ALTERAÇÕES
    // =========================================================================

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        mut update: TicketUpdate,
        now: DateTime<Utc>,
    ) -> Result<TicketView, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        update.title = sanitize_text(&update.title, MAX_TITLE_CHARS);
        if update.title.is_empty() {
            return Err(AppError::InvalidField { field: "title", code: "required" });
        }
        update.description = sanitize_optional(update.description.as_deref(), MAX_TEXT_CHARS);

        let ticket = self
            .repo
            .update_fields(executor, id, &update)
            .await?
            .ok_or(AppError::NotFound("Chamado"))?;
        Ok(self.view(ticket, now))
    }

    /// Muda o status respeitando o ciclo de vida. Prazos não mudam.
    pub async fn transition<'a, A>(
        &self,
        conn: A,
        id: Uuid,
        next: TicketStatus,
        now: DateTime<Utc>,
    ) -> Result<TicketView, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut tx = conn.begin().await?;

        let current = self
            .repo
            .find_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Chamado"))?;

        if !current.status.can_transition_to(next) {
            return Err(AppError::InvalidStatusTransition { from: current.status, to: next });
        }

        let stamps = LifecycleStamps {
            resolved_at: current.resolved_at,
            closed_at: current.closed_at,
        }
        .apply(next, now);

        let ticket = self.repo.update_status(&mut *tx, id, next, stamps).await?;
        tx.commit().await?;

        tracing::info!(
            "Chamado {}: {:?} -> {:?}",
            ticket.kind.display_number(ticket.number),
            current.status,
            next
        );
        Ok(self.view(ticket, now))
    }

    /// Troca a categoria. O SLA da nova categoria substitui o atual e os
    /// prazos são recalculados a partir da abertura; cliente e grupo só são
    /// preenchidos se estiverem vazios.
    pub async fn reassign_category<'a, A>(
        &self,
        conn: A,
        id: Uuid,
        category_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<TicketView, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut tx = conn.begin().await?;

        let current = self
            .repo
            .find_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Chamado"))?;

        let mut draft = TicketDraft {
            client_id: current.client_id,
            group_id: current.group_id,
            ..Default::default()
        };
        if let Some(category_id) = category_id {
            let category = self.load_category(&mut *tx, category_id).await?;
            resolve_kind(Some(current.kind), Some(&category))?;
            derive_defaults_from_category(&category).fill(&mut draft);
        }
        let sla_policy_id = draft.sla_policy_id.or(current.sla_policy_id);

        let policy = match sla_policy_id {
            Some(policy_id) => self.policies.find_by_id(&mut *tx, policy_id).await?,
            None => None,
        };

        let classification = Classification {
            category_id,
            sla_policy_id,
            client_id: draft.client_id,
            group_id: draft.group_id,
            deadlines: reclassified_deadlines(&current, policy.as_ref()),
        };
        let ticket = self.repo.update_classification(&mut *tx, id, &classification).await?;
        tx.commit().await?;

        Ok(self.view(ticket, now))
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if !self.repo.delete(executor, id).await? {
            return Err(AppError::NotFound("Chamado"));
        }
        tracing::info!("Chamado {} excluído", id);
        Ok(())
    }

    // =========================================================================
    //  4. COMENTÁRIOS E ANEXOS
    // =========================================================================

    pub async fn add_comment<'a, A>(
        &self,
        conn: A,
        ticket_id: Uuid,
        author_id: Uuid,
        body: &str,
        is_internal: bool,
    ) -> Result<TicketComment, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let body = sanitize_text(body, MAX_TEXT_CHARS);
        if body.is_empty() {
            return Err(AppError::InvalidField { field: "body", code: "required" });
        }

        let mut conn = conn.acquire().await?;
        self.ensure_exists(&mut *conn, ticket_id).await?;
        self.repo
            .add_comment(&mut *conn, ticket_id, author_id, &body, is_internal)
            .await
    }

    pub async fn list_comments<'a, A>(
        &self,
        conn: A,
        ticket_id: Uuid,
        include_internal: bool,
    ) -> Result<Vec<TicketComment>, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = conn.acquire().await?;
        self.ensure_exists(&mut *conn, ticket_id).await?;
        self.repo.list_comments(&mut *conn, ticket_id, include_internal).await
    }

    pub async fn add_attachment<'a, A>(
        &self,
        conn: A,
        ticket_id: Uuid,
        uploaded_by: Uuid,
        file: UploadedFile,
    ) -> Result<TicketAttachment, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        validate_upload(UploadKind::Attachment, &file.content_type, file.data.len())?;
        let file_name = attachment_name(&file.file_name);

        let mut conn = conn.acquire().await?;
        self.ensure_exists(&mut *conn, ticket_id).await?;
        let attachment = self
            .repo
            .add_attachment(&mut *conn, ticket_id, uploaded_by, &file_name, &file.content_type, &file.data)
            .await?;

        tracing::info!("Anexo '{}' ({} bytes) no chamado {}", file_name, file.data.len(), ticket_id);
        Ok(attachment)
    }

    /// Imagem do chat: guarda o arquivo e cria o comentário que o referencia.
    pub async fn add_comment_image<'a, A>(
        &self,
        conn: A,
        ticket_id: Uuid,
        author_id: Uuid,
        file: UploadedFile,
        is_internal: bool,
    ) -> Result<TicketComment, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        validate_upload(UploadKind::CommentImage, &file.content_type, file.data.len())?;
        let file_name = attachment_name(&file.file_name);

        let mut tx = conn.begin().await?;
        self.ensure_exists(&mut *tx, ticket_id).await?;
        let attachment = self
            .repo
            .add_attachment(&mut *tx, ticket_id, author_id, &file_name, &file.content_type, &file.data)
            .await?;
        let body = format!("[imagem:{}] {}", attachment.id, file_name);
        let comment = self
            .repo
            .add_comment(&mut *tx, ticket_id, author_id, &body, is_internal)
            .await?;
        tx.commit().await?;

        Ok(comment)
    }

    pub async fn list_attachments<'a, A>(
        &self,
        conn: A,
        ticket_id: Uuid,
    ) -> Result<Vec<TicketAttachment>, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = conn.acquire().await?;
        self.ensure_exists(&mut *conn, ticket_id).await?;
        self.repo.list_attachments(&mut *conn, ticket_id).await
    }

    // =========================================================================
    //  AUXILIARES
    // =========================================================================

    async fn load_category<'e, E>(&self, executor: E, id: Uuid) -> Result<Category, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let category = self
            .categories
            .find_by_id(executor, id)
            .await?
            .ok_or(AppError::NotFound("Categoria"))?;
        if !category.is_active {
            return Err(AppError::InvalidField { field: "categoryId", code: "not_found" });
        }
        Ok(category)
    }

    async fn ensure_exists<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .find_by_id(executor, id)
            .await?
            .map(|_| ())
            .ok_or(AppError::NotFound("Chamado"))
    }
}

/// Tipo final do chamado. Uma categoria restrita a um tipo define o tipo
/// quando ele não foi informado e rejeita os demais.
fn resolve_kind(requested: Option<TicketKind>, category: Option<&Category>) -> Result<TicketKind, AppError> {
    match (requested, category.and_then(|c| c.kind)) {
        (Some(kind), Some(allowed)) if kind != allowed => Err(AppError::InvalidField {
            field: "categoryId",
            code: "category_kind_mismatch",
        }),
        (Some(kind), _) => Ok(kind),
        (None, Some(allowed)) => Ok(allowed),
        (None, None) => Ok(TicketKind::Incident),
    }
}

// Sem diretórios nem caracteres de controle no nome salvo
fn attachment_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let name = sanitize_text(base, 255);
    if name.is_empty() {
        "arquivo".to_string()
    } else {
        name
    }
}

// Sem política ativa (excluída ou desativada) os prazos atuais ficam como estão
fn reclassified_deadlines(current: &Ticket, policy: Option<&SlaPolicy>) -> Deadlines {
    match policy {
        Some(p) if p.is_active => compute_deadlines(current.opened_at, Some(p)),
        _ => Deadlines {
            response_due_at: current.response_due_at,
            resolution_due_at: current.resolution_due_at,
        },
    }
}

/// O solicitante só filtra os próprios chamados, nunca por equipe.
fn scope_to_requester(mut filter: TicketFilter, requester_id: Uuid) -> TicketFilter {
    filter.requester_id = Some(requester_id);
    filter.assignee_id = None;
    filter.group_id = None;
    filter
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use sqlx::postgres::PgPoolOptions;

    use crate::models::sla::SlaStatus;

    fn category(kind: Option<TicketKind>) -> Category {
        Category {
            id: Uuid::new_v4(),
            name: "Rede".into(),
            description: None,
            kind,
            client_id: None,
            sla_policy_id: None,
            group_id: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ticket(kind: TicketKind, status: TicketStatus, due: Option<DateTime<Utc>>) -> Ticket {
        let opened = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        Ticket {
            id: Uuid::new_v4(),
            number: 42,
            kind,
            title: "Sem rede".into(),
            description: None,
            urgency: Level::High,
            impact: Level::Medium,
            priority: Priority::High,
            status,
            opened_at: opened,
            response_due_at: None,
            resolution_due_at: due,
            resolved_at: None,
            closed_at: None,
            category_id: None,
            sla_policy_id: None,
            requester_id: None,
            client_id: None,
            group_id: None,
            assignee_id: None,
            created_at: opened,
            updated_at: opened,
        }
    }

    // Serviço sem banco: só os métodos puros são exercitados
    fn service() -> TicketService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/servicedesk_test")
            .unwrap();
        TicketService::new(
            TicketRepository::new(pool.clone()),
            CategoryRepository::new(pool.clone()),
            SlaPolicyRepository::new(pool),
            SlaEvaluator::default(),
        )
    }

    #[test]
    fn test_resolve_kind_defaults_to_incident() {
        assert_eq!(resolve_kind(None, None).unwrap(), TicketKind::Incident);
        assert_eq!(resolve_kind(Some(TicketKind::Change), None).unwrap(), TicketKind::Change);
    }

    #[test]
    fn test_resolve_kind_follows_category_restriction() {
        let problems_only = category(Some(TicketKind::Problem));
        assert_eq!(resolve_kind(None, Some(&problems_only)).unwrap(), TicketKind::Problem);
        assert!(matches!(
            resolve_kind(Some(TicketKind::Incident), Some(&problems_only)),
            Err(AppError::InvalidField { code: "category_kind_mismatch", .. })
        ));
        assert_eq!(
            resolve_kind(Some(TicketKind::Request), Some(&category(None))).unwrap(),
            TicketKind::Request
        );
    }

    #[test]
    fn test_attachment_name_strips_paths() {
        assert_eq!(attachment_name("C:\\fotos\\tela.png"), "tela.png");
        assert_eq!(attachment_name("../../etc/passwd"), "passwd");
        assert_eq!(attachment_name("  "), "arquivo");
    }

    #[tokio::test]
    async fn test_view_computes_display_fields_and_live_sla() {
        let svc = service();
        let now = Utc.with_ymd_and_hms(2024, 6, 2, 8, 0, 0).unwrap();

        let late = svc.view(
            ticket(TicketKind::Incident, TicketStatus::InProgress, Some(now - Duration::hours(1))),
            now,
        );
        assert_eq!(late.display_number, "INC0000042");
        assert_eq!(late.status_label, "Em andamento");
        assert_eq!(late.sla_status, SlaStatus::Breached);

        let no_due = svc.view(ticket(TicketKind::Change, TicketStatus::Pending, None), now);
        assert_eq!(no_due.display_number, "CHG0000042");
        assert_eq!(no_due.status_label, "Aguardando aprovação");
        assert_eq!(no_due.sla_status, SlaStatus::NoSla);
    }

    fn policy(is_active: bool) -> SlaPolicy {
        let now = Utc::now();
        SlaPolicy {
            id: Uuid::new_v4(),
            name: "Crítico".into(),
            response_hours: 1,
            resolution_hours: 4,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_reclassification_recomputes_from_opening_with_active_policy() {
        let current = ticket(TicketKind::Incident, TicketStatus::Open, None);
        let deadlines = reclassified_deadlines(&current, Some(&policy(true)));
        assert_eq!(deadlines.response_due_at, Some(current.opened_at + Duration::hours(1)));
        assert_eq!(deadlines.resolution_due_at, Some(current.opened_at + Duration::hours(4)));
    }

    #[test]
    fn test_reclassification_keeps_deadlines_without_active_policy() {
        let due = Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap();
        let mut current = ticket(TicketKind::Incident, TicketStatus::Open, Some(due));
        current.response_due_at = Some(due - Duration::hours(20));

        for resolved in [None, Some(policy(false))] {
            let deadlines = reclassified_deadlines(&current, resolved.as_ref());
            assert_eq!(deadlines.resolution_due_at, Some(due));
            assert_eq!(deadlines.response_due_at, Some(due - Duration::hours(20)));
        }
    }

    #[test]
    fn test_requester_scope_overrides_team_filters() {
        let requester = Uuid::new_v4();
        let filter = TicketFilter {
            kind: Some(TicketKind::Request),
            statuses: vec![TicketStatus::Open],
            assignee_id: Some(Uuid::new_v4()),
            group_id: Some(Uuid::new_v4()),
            requester_id: Some(Uuid::new_v4()),
            ..Default::default()
        };

        let scoped = scope_to_requester(filter, requester);
        assert_eq!(scoped.requester_id, Some(requester));
        assert_eq!(scoped.assignee_id, None);
        assert_eq!(scoped.group_id, None);
        assert_eq!(scoped.kind, Some(TicketKind::Request));
        assert_eq!(scoped.statuses, vec![TicketStatus::Open]);
    }
}
