// src/models/category.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::ticket::TicketKind;

// Categoria de atendimento. Além de classificar, carrega os padrões
// (cliente, SLA, grupo) que são propagados para o chamado.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    #[schema(example = "Rede / Wi-Fi")]
    pub name: String,
    pub description: Option<String>,

    // Restringe a categoria a um tipo de chamado (None = todos)
    pub kind: Option<TicketKind>,

    pub client_id: Option<Uuid>,
    pub sla_policy_id: Option<Uuid>,
    pub group_id: Option<Uuid>,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
