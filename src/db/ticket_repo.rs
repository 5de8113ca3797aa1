// src/db/ticket_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_db_error, error::AppError},
    models::{
        sla::{SlaRecord, SlaRiskRow},
        ticket::{
            Level, LifecycleStamps, Priority, Ticket, TicketAttachment, TicketComment,
            TicketFilter, TicketKind, TicketStatus,
        },
    },
    sla::Deadlines,
};

const TICKET_COLUMNS: &str = r#"
    id, number, kind, title, description,
    urgency, impact, priority, status,
    opened_at, response_due_at, resolution_due_at, resolved_at, closed_at,
    category_id, sla_policy_id, requester_id, client_id, group_id, assignee_id,
    created_at, updated_at
"#;

/// Linha pronta para inserção (prioridade e prazos já resolvidos).
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub kind: TicketKind,
    pub title: String,
    pub description: Option<String>,
    pub urgency: Level,
    pub impact: Level,
    pub priority: Priority,
    pub opened_at: DateTime<Utc>,
    pub deadlines: Deadlines,
    pub category_id: Option<Uuid>,
    pub sla_policy_id: Option<Uuid>,
    pub requester_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
}

/// Campos editáveis diretamente (substituição completa).
#[derive(Debug, Clone)]
pub struct TicketUpdate {
    pub title: String,
    pub description: Option<String>,
    pub urgency: Level,
    pub impact: Level,
    pub priority: Priority,
    pub client_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
}

/// Campos que mudam juntos na troca de categoria.
#[derive(Debug, Clone)]
pub struct Classification {
    pub category_id: Option<Uuid>,
    pub sla_policy_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub deadlines: Deadlines,
}

#[derive(Clone)]
pub struct TicketRepository {
    pool: PgPool,
}

impl TicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CHAMADOS
    // =========================================================================

    /// Insere o chamado e reserva o próximo número do tipo na mesma instrução.
    pub async fn create<'e, E>(&self, executor: E, new: &NewTicket) -> Result<Ticket, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            WITH seq AS (
                INSERT INTO ticket_counters (kind, last_number)
                VALUES ($1, 1)
                ON CONFLICT (kind) DO UPDATE SET last_number = ticket_counters.last_number + 1
                RETURNING last_number
            )
            INSERT INTO tickets (
                kind, number, title, description, urgency, impact, priority, status,
                opened_at, response_due_at, resolution_due_at,
                category_id, sla_policy_id, requester_id, client_id, group_id, assignee_id
            )
            SELECT $1, seq.last_number, $2, $3, $4, $5, $6, 'open'::ticket_status,
                   $7, $8, $9, $10, $11, $12, $13, $14, $15
            FROM seq
            RETURNING {TICKET_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Ticket>(&sql)
            .bind(new.kind)
            .bind(&new.title)
            .bind(&new.description)
            .bind(new.urgency)
            .bind(new.impact)
            .bind(new.priority)
            .bind(new.opened_at)
            .bind(new.deadlines.response_due_at)
            .bind(new.deadlines.resolution_due_at)
            .bind(new.category_id)
            .bind(new.sla_policy_id)
            .bind(new.requester_id)
            .bind(new.client_id)
            .bind(new.group_id)
            .bind(new.assignee_id)
            .fetch_one(executor)
            .await
            .map_err(|e| map_db_error(e, "ticket"))
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Ticket>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1");
        Ok(sqlx::query_as::<_, Ticket>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?)
    }

    /// Mesma leitura, travando a linha até o fim da transação.
    pub async fn find_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Ticket>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1 FOR UPDATE");
        Ok(sqlx::query_as::<_, Ticket>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?)
    }

    /// Listagem com filtros opcionais (tipo, status, faixa de prazo, responsável...).
    pub async fn list<'e, E>(&self, executor: E, filter: &TicketFilter) -> Result<Vec<Ticket>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = list_query(filter);
        Ok(qb.build_query_as::<Ticket>().fetch_all(executor).await?)
    }

    pub async fn update_fields<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        update: &TicketUpdate,
    ) -> Result<Option<Ticket>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE tickets SET
                title = $2, description = $3, urgency = $4, impact = $5, priority = $6,
                client_id = $7, group_id = $8, assignee_id = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Ticket>(&sql)
            .bind(id)
            .bind(&update.title)
            .bind(&update.description)
            .bind(update.urgency)
            .bind(update.impact)
            .bind(update.priority)
            .bind(update.client_id)
            .bind(update.group_id)
            .bind(update.assignee_id)
            .fetch_optional(executor)
            .await
            .map_err(|e| map_db_error(e, "ticket"))
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: TicketStatus,
        stamps: LifecycleStamps,
    ) -> Result<Ticket, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE tickets SET status = $2, resolved_at = $3, closed_at = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Ticket>(&sql)
            .bind(id)
            .bind(status)
            .bind(stamps.resolved_at)
            .bind(stamps.closed_at)
            .fetch_one(executor)
            .await?)
    }

    pub async fn update_classification<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        classification: &Classification,
    ) -> Result<Ticket, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE tickets SET
                category_id = $2, sla_policy_id = $3, client_id = $4, group_id = $5,
                response_due_at = $6, resolution_due_at = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Ticket>(&sql)
            .bind(id)
            .bind(classification.category_id)
            .bind(classification.sla_policy_id)
            .bind(classification.client_id)
            .bind(classification.group_id)
            .bind(classification.deadlines.response_due_at)
            .bind(classification.deadlines.resolution_due_at)
            .fetch_one(executor)
            .await
            .map_err(|e| map_db_error(e, "ticket"))
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  LEITURAS DE SLA
    // =========================================================================

    /// Registros com prazo de resolução em [from, to), com os campos do avaliador.
    pub async fn list_sla_records<'e, E>(
        &self,
        executor: E,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<SlaRecord>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = sla_records_query(from, to);
        Ok(qb.build_query_as::<SlaRecord>().fetch_all(executor).await?)
    }

    /// Em aberto com prazo de resolução antes de `horizon`, do mais urgente
    /// para o menos urgente.
    pub async fn list_at_risk<'e, E>(
        &self,
        executor: E,
        horizon: DateTime<Utc>,
    ) -> Result<Vec<SlaRiskRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        Ok(sqlx::query_as::<_, SlaRiskRow>(
            r#"
            SELECT id, number, kind, title, priority, status, resolution_due_at, assignee_id, group_id
            FROM tickets
            WHERE status = ANY($1)
              AND resolution_due_at IS NOT NULL
              AND resolution_due_at < $2
            ORDER BY resolution_due_at ASC
            LIMIT 200
            "#,
        )
        .bind(TicketStatus::OPEN_SET.to_vec())
        .bind(horizon)
        .fetch_all(executor)
        .await?)
    }

    // =========================================================================
    //  COMENTÁRIOS (chat do chamado)
    // =========================================================================

    pub async fn add_comment<'e, E>(
        &self,
        executor: E,
        ticket_id: Uuid,
        author_id: Uuid,
        body: &str,
        is_internal: bool,
    ) -> Result<TicketComment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, TicketComment>(
            r#"
            INSERT INTO ticket_comments (ticket_id, author_id, body, is_internal)
            VALUES ($1, $2, $3, $4)
            RETURNING id, ticket_id, author_id, body, is_internal, created_at
            "#,
        )
        .bind(ticket_id)
        .bind(author_id)
        .bind(body)
        .bind(is_internal)
        .fetch_one(executor)
        .await
        .map_err(|e| map_db_error(e, "ticket_comment"))
    }

    pub async fn list_comments<'e, E>(
        &self,
        executor: E,
        ticket_id: Uuid,
        include_internal: bool,
    ) -> Result<Vec<TicketComment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        Ok(sqlx::query_as::<_, TicketComment>(
            r#"
            SELECT id, ticket_id, author_id, body, is_internal, created_at
            FROM ticket_comments
            WHERE ticket_id = $1 AND (is_internal = FALSE OR $2)
            ORDER BY created_at ASC
            "#,
        )
        .bind(ticket_id)
        .bind(include_internal)
        .fetch_all(executor)
        .await?)
    }

    // =========================================================================
    //  ANEXOS
    // =========================================================================

    pub async fn add_attachment<'e, E>(
        &self,
        executor: E,
        ticket_id: Uuid,
        uploaded_by: Uuid,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<TicketAttachment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, TicketAttachment>(
            r#"
            INSERT INTO ticket_attachments (ticket_id, uploaded_by, file_name, content_type, size_bytes, data)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, ticket_id, uploaded_by, file_name, content_type, size_bytes, created_at
            "#,
        )
        .bind(ticket_id)
        .bind(uploaded_by)
        .bind(file_name)
        .bind(content_type)
        .bind(data.len() as i64)
        .bind(data)
        .fetch_one(executor)
        .await
        .map_err(|e| map_db_error(e, "ticket_attachment"))
    }

    pub async fn list_attachments<'e, E>(
        &self,
        executor: E,
        ticket_id: Uuid,
    ) -> Result<Vec<TicketAttachment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        Ok(sqlx::query_as::<_, TicketAttachment>(
            r#"
            SELECT id, ticket_id, uploaded_by, file_name, content_type, size_bytes, created_at
            FROM ticket_attachments
            WHERE ticket_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(executor)
        .await?)
    }
}

// Sem prazo o registro só entra quando não há limites (vira `without_sla`)
fn sla_records_query(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT kind, status, resolution_due_at, resolved_at, closed_at FROM tickets WHERE TRUE",
    );
    if let Some(from) = from {
        qb.push(" AND resolution_due_at >= ").push_bind(from);
    }
    if let Some(to) = to {
        qb.push(" AND resolution_due_at < ").push_bind(to);
    }
    qb
}

fn list_query(filter: &TicketFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<'static, Postgres> =
        QueryBuilder::new(format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE TRUE"));

    if let Some(kind) = filter.kind {
        // Linhas legadas guardam o sinônimo de solicitação
        if kind == TicketKind::Request {
            qb.push(" AND kind IN ('request', 'service_request', 'solicitacao')");
        } else {
            qb.push(" AND kind = ").push_bind(kind);
        }
    }
    if !filter.statuses.is_empty() {
        qb.push(" AND status = ANY(").push_bind(filter.statuses.clone()).push(")");
    }
    if let Some(from) = filter.due_from {
        qb.push(" AND resolution_due_at >= ").push_bind(from);
    }
    if let Some(to) = filter.due_to {
        qb.push(" AND resolution_due_at < ").push_bind(to);
    }
    if let Some(assignee) = filter.assignee_id {
        qb.push(" AND assignee_id = ").push_bind(assignee);
    }
    if let Some(group) = filter.group_id {
        qb.push(" AND group_id = ").push_bind(group);
    }
    if let Some(requester) = filter.requester_id {
        qb.push(" AND requester_id = ").push_bind(requester);
    }
    qb.push(" ORDER BY opened_at DESC LIMIT 500");
    qb
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sla_window_selects_by_resolution_due_date() {
        let from = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();

        let qb = sla_records_query(Some(from), Some(to));
        let sql = qb.sql();
        assert!(sql.contains("resolution_due_at >= $1"));
        assert!(sql.contains("resolution_due_at < $2"));
        assert!(!sql.contains("opened_at"));
    }

    #[test]
    fn test_sla_window_without_bounds_keeps_records_without_due_date() {
        let qb = sla_records_query(None, None);
        assert!(!qb.sql().contains("resolution_due_at >="));
        assert!(!qb.sql().contains("resolution_due_at <"));
        assert!(!qb.sql().contains("IS NOT NULL"));
    }

    #[test]
    fn test_list_query_filters_by_requester() {
        let filter = TicketFilter { requester_id: Some(Uuid::new_v4()), ..Default::default() };
        let qb = list_query(&filter);
        assert!(qb.sql().contains("AND requester_id = $1"));
        assert!(qb.sql().ends_with("ORDER BY opened_at DESC LIMIT 500"));
    }
}
