// src/models/dashboard.rs

use serde::Serialize;
use utoipa::ToSchema;

// Cards do topo do painel. Cada contador vem de uma leitura independente.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// Chamados em aberto (open, in_progress, pending)
    pub open_total: i64,
    /// Em aberto com prazo de resolução vencido
    pub at_risk: i64,
    /// Resolvidos desde a meia-noite local
    pub resolved_today: i64,
    /// Problemas em aberto com prioridade crítica
    pub critical_problems: i64,
}
