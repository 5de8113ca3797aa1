// src/services/sla_service.rs

use chrono::{DateTime, Duration, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        sanitize::{sanitize_text, MAX_TITLE_CHARS},
    },
    db::{SlaPolicyRepository, TicketRepository},
    models::sla::{SlaPerformanceRow, SlaPolicy, SlaRiskEntry, SlaRiskRow},
    sla::{aggregate, minutes_remaining, SlaEvaluator},
};

pub const DEFAULT_RISK_HOURS: i64 = 4;
// Uma janela maior que 30 dias deixa de ser "risco"
const MAX_RISK_HOURS: i64 = 24 * 30;

#[derive(Clone)]
pub struct SlaService {
    policies: SlaPolicyRepository,
    tickets: TicketRepository,
    evaluator: SlaEvaluator,
}

impl SlaService {
    pub fn new(policies: SlaPolicyRepository, tickets: TicketRepository, evaluator: SlaEvaluator) -> Self {
        Self { policies, tickets, evaluator }
    }

    // =========================================================================
    //  1. POLÍTICAS (configuração)
    // =========================================================================

    pub async fn create_policy<'e, E>(
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
        let name = validate_policy(name, response_hours, resolution_hours)?;
        let policy = self
            .policies
            .create(executor, &name, response_hours, resolution_hours, is_active)
            .await?;
        tracing::info!(
            "Política de SLA '{}' criada ({}h resposta / {}h resolução)",
            policy.name,
            policy.response_hours,
            policy.resolution_hours
        );
        Ok(policy)
    }

    pub async fn list_policies<'e, E>(&self, executor: E) -> Result<Vec<SlaPolicy>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.policies.list(executor).await
    }

    pub async fn get_policy<'e, E>(&self, executor: E, id: Uuid) -> Result<SlaPolicy, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.policies
            .find_by_id(executor, id)
            .await?
            .ok_or(AppError::NotFound("Política de SLA"))
    }

    /// Alterar a política não recalcula prazos de chamados já abertos.
    pub async fn update_policy<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: &str,
        response_hours: i32,
        resolution_hours: i32,
        is_active: bool,
    ) -> Result<SlaPolicy, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let name = validate_policy(name, response_hours, resolution_hours)?;
        self.policies
            .update(executor, id, &name, response_hours, resolution_hours, is_active)
            .await?
            .ok_or(AppError::NotFound("Política de SLA"))
    }

    pub async fn delete_policy<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if !self.policies.delete(executor, id).await? {
            return Err(AppError::NotFound("Política de SLA"));
        }
        Ok(())
    }

    // =========================================================================
    //  2. RELATÓRIOS
    // =========================================================================

    /// Desempenho por tipo + linha geral, para chamados abertos em [from, to).
    pub async fn performance<'e, E>(
        &self,
        executor: E,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Vec<SlaPerformanceRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if let (Some(from), Some(to)) = (from, to) {
            if from >= to {
                return Err(AppError::InvalidField { field: "to", code: "invalid_date_range" });
            }
        }

        let records = self.tickets.list_sla_records(executor, from, to).await?;
        tracing::debug!("Calculando desempenho de SLA sobre {} registros", records.len());
        Ok(aggregate(&records, &self.evaluator, now))
    }

    /// Em aberto com prazo vencido ou vencendo nas próximas `hours` horas.
    pub async fn risk<'e, E>(
        &self,
        executor: E,
        hours: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Vec<SlaRiskEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let hours = hours.unwrap_or(DEFAULT_RISK_HOURS);
        if !(1..=MAX_RISK_HOURS).contains(&hours) {
            return Err(AppError::InvalidField { field: "hours", code: "invalid_range" });
        }

        let rows = self.tickets.list_at_risk(executor, now + Duration::hours(hours)).await?;
        Ok(rows.into_iter().filter_map(|row| self.risk_entry(row, now)).collect())
    }

    fn risk_entry(&self, row: SlaRiskRow, now: DateTime<Utc>) -> Option<SlaRiskEntry> {
        let due = row.resolution_due_at?;
        Some(SlaRiskEntry {
            display_number: row.kind.display_number(row.number),
            sla_status: self.evaluator.classify(&row, now),
            minutes_remaining: minutes_remaining(due, now),
            ticket: row,
        })
    }
}

fn validate_policy(name: &str, response_hours: i32, resolution_hours: i32) -> Result<String, AppError> {
    let name = sanitize_text(name, MAX_TITLE_CHARS);
    if name.is_empty() {
        return Err(AppError::InvalidField { field: "name", code: "required" });
    }
    if response_hours < 1 {
        return Err(AppError::InvalidField { field: "responseHours", code: "invalid_range" });
    }
    // Resolver antes de responder não faz sentido
    if resolution_hours < response_hours {
        return Err(AppError::InvalidField { field: "resolutionHours", code: "invalid_range" });
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sqlx::postgres::PgPoolOptions;

    use crate::models::{
        sla::SlaStatus,
        ticket::{Priority, TicketKind, TicketStatus},
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn row(due: Option<DateTime<Utc>>) -> SlaRiskRow {
        SlaRiskRow {
            id: Uuid::new_v4(),
            number: 7,
            kind: TicketKind::Problem,
            title: "Lentidão no ERP".into(),
            priority: Priority::Critical,
            status: TicketStatus::Open,
            resolution_due_at: due,
            assignee_id: None,
            group_id: None,
        }
    }

    fn service() -> SlaService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/servicedesk_test")
            .unwrap();
        SlaService::new(
            SlaPolicyRepository::new(pool.clone()),
            TicketRepository::new(pool),
            SlaEvaluator::default(),
        )
    }

    #[test]
    fn test_validate_policy() {
        assert_eq!(validate_policy("  Padrão ", 4, 24).unwrap(), "Padrão");
        assert!(matches!(
            validate_policy("", 4, 24),
            Err(AppError::InvalidField { field: "name", .. })
        ));
        assert!(matches!(
            validate_policy("X", 0, 24),
            Err(AppError::InvalidField { field: "responseHours", .. })
        ));
        assert!(matches!(
            validate_policy("X", 8, 4),
            Err(AppError::InvalidField { field: "resolutionHours", .. })
        ));
    }

    #[tokio::test]
    async fn test_risk_entry_annotates_row() {
        let svc = service();

        let overdue = svc.risk_entry(row(Some(now() - Duration::minutes(30))), now()).unwrap();
        assert_eq!(overdue.display_number, "PRB0000007");
        assert_eq!(overdue.sla_status, SlaStatus::Breached);
        assert_eq!(overdue.minutes_remaining, -30);

        let soon = svc.risk_entry(row(Some(now() + Duration::hours(2))), now()).unwrap();
        assert_eq!(soon.sla_status, SlaStatus::OnTime);
        assert_eq!(soon.minutes_remaining, 120);

        assert!(svc.risk_entry(row(None), now()).is_none());
    }

    #[tokio::test]
    async fn test_risk_rejects_window_out_of_range() {
        let svc = service();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/servicedesk_test")
            .unwrap();

        // A validação acontece antes de qualquer consulta
        assert!(matches!(
            svc.risk(&pool, Some(0), now()).await,
            Err(AppError::InvalidField { field: "hours", .. })
        ));
        assert!(matches!(
            svc.risk(&pool, Some(MAX_RISK_HOURS + 1), now()).await,
            Err(AppError::InvalidField { field: "hours", .. })
        ));
    }

    #[tokio::test]
    async fn test_performance_rejects_inverted_range() {
        let svc = service();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/servicedesk_test")
            .unwrap();

        let result = svc.performance(&pool, Some(now()), Some(now() - Duration::days(1)), now()).await;
        assert!(matches!(result, Err(AppError::InvalidField { code: "invalid_date_range", .. })));
    }
}
