// src/models/sla.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::ticket::{Priority, TicketKind, TicketStatus};

// ---
// 1. Política de SLA (configuração)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlaPolicy {
    pub id: Uuid,
    #[schema(example = "Padrão - 8x5")]
    pub name: String,
    #[schema(example = 4)]
    pub response_hours: i32,
    #[schema(example = 24)]
    pub resolution_hours: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 2. Classificação de SLA de um registro
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SlaStatus {
    /// Sem prazo de resolução ("sem_sla")
    NoSla,
    OnTime,
    Breached,
    /// Terminal sem data de resolução nem de fechamento (política `unknown`)
    Unknown,
}

/// O que fazer com um chamado terminal sem `resolved_at` nem `closed_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingResolutionPolicy {
    /// Compara "agora" com o prazo (comportamento legado).
    #[default]
    AssumeNow,
    /// Classifica como `unknown`.
    Unknown,
}

impl std::str::FromStr for MissingResolutionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assume_now" | "now" => Ok(MissingResolutionPolicy::AssumeNow),
            "unknown" => Ok(MissingResolutionPolicy::Unknown),
            other => Err(format!("política de resolução ausente inválida: '{}'", other)),
        }
    }
}

/// Apenas os campos que o avaliador lê.
#[derive(Debug, Clone, FromRow)]
pub struct SlaRecord {
    pub kind: TicketKind,
    pub status: TicketStatus,
    pub resolution_due_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

// ---
// 3. Saídas do relatório
// ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlaPerformanceRow {
    /// "overall" ou a chave do tipo
    #[schema(example = "incident")]
    pub key: String,
    #[schema(example = "Incidentes")]
    pub label: String,
    pub total: u32,
    pub on_time: u32,
    pub breached: u32,
    pub unknown: u32,
    pub without_sla: u32,
    #[schema(example = 93)]
    pub percentage: u32,
    #[schema(example = 95)]
    pub target: u32,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlaRiskRow {
    pub id: Uuid,
    pub number: i64,
    pub kind: TicketKind,
    pub title: String,
    pub priority: Priority,
    pub status: TicketStatus,
    pub resolution_due_at: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlaRiskEntry {
    #[serde(flatten)]
    pub ticket: SlaRiskRow,
    #[schema(example = "INC0000042")]
    pub display_number: String,
    pub sla_status: SlaStatus,
    /// Negativo quando o prazo já passou
    #[schema(example = 95)]
    pub minutes_remaining: i64,
}
