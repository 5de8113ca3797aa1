// src/models/ticket.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{
    encode::IsNull,
    error::BoxDynError,
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
    Decode, Encode, FromRow, Postgres, Type,
};
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// 1. Tipo do chamado (discriminador da tabela única `tickets`)
// ---
// Incidente, solicitação, problema e mudança compartilham o mesmo formato.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    Incident,
    // Bases antigas gravavam "service_request"/"solicitacao"
    #[serde(alias = "service_request", alias = "solicitacao")]
    Request,
    Problem,
    Change,
}

impl TicketKind {
    pub const ALL: [TicketKind; 4] = [
        TicketKind::Incident,
        TicketKind::Request,
        TicketKind::Problem,
        TicketKind::Change,
    ];

    pub fn key(self) -> &'static str {
        match self {
            TicketKind::Incident => "incident",
            TicketKind::Request => "request",
            TicketKind::Problem => "problem",
            TicketKind::Change => "change",
        }
    }

    /// Aceita a chave canônica e o sinônimo legado de solicitação.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "incident" => Some(TicketKind::Incident),
            "request" | "service_request" | "solicitacao" => Some(TicketKind::Request),
            "problem" => Some(TicketKind::Problem),
            "change" => Some(TicketKind::Change),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TicketKind::Incident => "Incidentes",
            TicketKind::Request => "Solicitações",
            TicketKind::Problem => "Problemas",
            TicketKind::Change => "Mudanças",
        }
    }

    pub fn number_prefix(self) -> &'static str {
        match self {
            TicketKind::Incident => "INC",
            TicketKind::Request => "REQ",
            TicketKind::Problem => "PRB",
            TicketKind::Change => "CHG",
        }
    }

    /// Ex: (Incident, 42) -> "INC0000042"
    pub fn display_number(self, number: i64) -> String {
        format!("{}{:07}", self.number_prefix(), number)
    }
}

impl fmt::Display for TicketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TicketKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TicketKind::from_key(s).ok_or_else(|| format!("tipo de chamado desconhecido: '{}'", s))
    }
}

// A coluna `kind` é TEXT (não um ENUM do Postgres) para que linhas legadas
// com o sinônimo de solicitação continuem legíveis.
impl Type<Postgres> for TicketKind {
    fn type_info() -> PgTypeInfo {
        <&str as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <&str as Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for TicketKind {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let key = <&str as Decode<Postgres>>::decode(value)?;
        Ok(key.parse::<TicketKind>()?)
    }
}

impl<'q> Encode<'q, Postgres> for TicketKind {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <&str as Encode<Postgres>>::encode(self.key(), buf)
    }
}

// ---
// 2. Classificação (urgência, impacto, prioridade)
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "ticket_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "ticket_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Matriz urgência x impacto usada quando a prioridade não é informada.
    pub fn from_matrix(urgency: Level, impact: Level) -> Self {
        match (urgency, impact) {
            (Level::High, Level::High) => Priority::Critical,
            (Level::High, Level::Medium) | (Level::Medium, Level::High) => Priority::High,
            (Level::Medium, Level::Medium)
            | (Level::High, Level::Low)
            | (Level::Low, Level::High) => Priority::Medium,
            _ => Priority::Low,
        }
    }
}

// ---
// 3. Ciclo de vida
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Pending,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub const OPEN_SET: [TicketStatus; 3] =
        [TicketStatus::Open, TicketStatus::InProgress, TicketStatus::Pending];

    pub fn is_terminal(self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }

    /// Fechado é final. Resolvido pode ser fechado ou reaberto.
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        if self == next {
            return false;
        }
        match self {
            TicketStatus::Closed => false,
            TicketStatus::Resolved => matches!(
                next,
                TicketStatus::Closed | TicketStatus::Open | TicketStatus::InProgress
            ),
            _ => true,
        }
    }

    /// O rótulo de exibição varia um pouco por família de chamado.
    pub fn label(self, kind: TicketKind) -> &'static str {
        match (self, kind) {
            (TicketStatus::Open, TicketKind::Change) => "Registrada",
            (TicketStatus::Open, _) => "Aberto",
            (TicketStatus::InProgress, TicketKind::Change) => "Em implementação",
            (TicketStatus::InProgress, TicketKind::Problem) => "Em análise",
            (TicketStatus::InProgress, _) => "Em andamento",
            (TicketStatus::Pending, TicketKind::Change) => "Aguardando aprovação",
            (TicketStatus::Pending, TicketKind::Request) => "Aguardando solicitante",
            (TicketStatus::Pending, _) => "Pendente",
            (TicketStatus::Resolved, TicketKind::Change) => "Implementada",
            (TicketStatus::Resolved, _) => "Resolvido",
            (TicketStatus::Closed, TicketKind::Change) => "Encerrada",
            (TicketStatus::Closed, _) => "Fechado",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(TicketStatus::Open),
            "in_progress" => Ok(TicketStatus::InProgress),
            "pending" => Ok(TicketStatus::Pending),
            "resolved" => Ok(TicketStatus::Resolved),
            "closed" => Ok(TicketStatus::Closed),
            other => Err(format!("status desconhecido: '{}'", other)),
        }
    }
}

/// Carimbos de tempo resultantes de uma transição de status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleStamps {
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl LifecycleStamps {
    /// Aplica a transição `next` sobre os carimbos atuais.
    /// Reabrir limpa resolução e fechamento; o prazo de SLA não é tocado.
    pub fn apply(self, next: TicketStatus, now: DateTime<Utc>) -> Self {
        match next {
            TicketStatus::Resolved => Self {
                resolved_at: self.resolved_at.or(Some(now)),
                closed_at: None,
            },
            TicketStatus::Closed => Self {
                resolved_at: self.resolved_at,
                closed_at: Some(now),
            },
            _ => Self { resolved_at: None, closed_at: None },
        }
    }
}

// ---
// 4. O chamado
// ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    #[schema(example = 42)]
    pub number: i64,
    pub kind: TicketKind,

    #[schema(example = "Impressora do 3º andar sem rede")]
    pub title: String,
    pub description: Option<String>,

    pub urgency: Level,
    pub impact: Level,
    pub priority: Priority,
    pub status: TicketStatus,

    // data_abertura / data_limite_resposta / data_limite_resolucao
    pub opened_at: DateTime<Utc>,
    pub response_due_at: Option<DateTime<Utc>>,
    pub resolution_due_at: Option<DateTime<Utc>>,
    // data_resolucao / data_fechamento
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,

    pub category_id: Option<Uuid>,
    pub sla_policy_id: Option<Uuid>,
    pub requester_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Chamado + campos calculados a cada leitura (nunca persistidos).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: Ticket,
    #[schema(example = "INC0000042")]
    pub display_number: String,
    #[schema(example = "Em andamento")]
    pub status_label: String,
    pub sla_status: crate::models::sla::SlaStatus,
}

/// Dados de criação já validados e sanitizados (entrada do repositório).
#[derive(Debug, Clone, Default)]
pub struct TicketDraft {
    pub kind: Option<TicketKind>,
    pub title: String,
    pub description: Option<String>,
    pub urgency: Option<Level>,
    pub impact: Option<Level>,
    pub priority: Option<Priority>,
    pub category_id: Option<Uuid>,
    pub sla_policy_id: Option<Uuid>,
    pub requester_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
}

/// Filtros aceitos na listagem.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub kind: Option<TicketKind>,
    pub statuses: Vec<TicketStatus>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_to: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub requester_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketComment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

// O conteúdo binário não sai na listagem
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketAttachment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub uploaded_by: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_kind_folds_legacy_request_key() {
        assert_eq!(TicketKind::from_key("service_request"), Some(TicketKind::Request));
        assert_eq!(TicketKind::from_key("Solicitacao"), Some(TicketKind::Request));
        assert_eq!(TicketKind::from_key("request"), Some(TicketKind::Request));
        assert_eq!(TicketKind::from_key("bug"), None);
    }

    #[test]
    fn test_kind_serde_accepts_alias() {
        let kind: TicketKind = serde_json::from_str("\"service_request\"").unwrap();
        assert_eq!(kind, TicketKind::Request);
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"request\"");
    }

    #[test]
    fn test_display_number() {
        assert_eq!(TicketKind::Incident.display_number(42), "INC0000042");
        assert_eq!(TicketKind::Change.display_number(1234567), "CHG1234567");
    }

    #[test]
    fn test_priority_matrix() {
        assert_eq!(Priority::from_matrix(Level::High, Level::High), Priority::Critical);
        assert_eq!(Priority::from_matrix(Level::High, Level::Medium), Priority::High);
        assert_eq!(Priority::from_matrix(Level::Medium, Level::High), Priority::High);
        assert_eq!(Priority::from_matrix(Level::Medium, Level::Medium), Priority::Medium);
        assert_eq!(Priority::from_matrix(Level::Low, Level::High), Priority::Medium);
        assert_eq!(Priority::from_matrix(Level::Low, Level::Medium), Priority::Low);
        assert_eq!(Priority::from_matrix(Level::Low, Level::Low), Priority::Low);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("in_progress".parse::<TicketStatus>().unwrap(), TicketStatus::InProgress);
        assert_eq!(" Closed ".parse::<TicketStatus>().unwrap(), TicketStatus::Closed);
        assert!("cancelled".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn test_closed_is_final() {
        for next in [TicketStatus::Open, TicketStatus::InProgress, TicketStatus::Resolved] {
            assert!(!TicketStatus::Closed.can_transition_to(next));
        }
    }

    #[test]
    fn test_resolved_can_close_or_reopen() {
        assert!(TicketStatus::Resolved.can_transition_to(TicketStatus::Closed));
        assert!(TicketStatus::Resolved.can_transition_to(TicketStatus::Open));
        assert!(!TicketStatus::Resolved.can_transition_to(TicketStatus::Pending));
        assert!(!TicketStatus::Open.can_transition_to(TicketStatus::Open));
        assert!(TicketStatus::Pending.can_transition_to(TicketStatus::Resolved));
    }

    #[test]
    fn test_resolve_stamps_once() {
        let first = LifecycleStamps { resolved_at: None, closed_at: None }
            .apply(TicketStatus::Resolved, at(10));
        assert_eq!(first.resolved_at, Some(at(10)));

        let closed = first.apply(TicketStatus::Closed, at(12));
        assert_eq!(closed.resolved_at, Some(at(10)));
        assert_eq!(closed.closed_at, Some(at(12)));
    }

    #[test]
    fn test_reopen_clears_stamps() {
        let stamps = LifecycleStamps { resolved_at: Some(at(10)), closed_at: None };
        let reopened = stamps.apply(TicketStatus::Open, at(11));
        assert_eq!(reopened, LifecycleStamps { resolved_at: None, closed_at: None });
    }

    #[test]
    fn test_status_label_varies_by_kind() {
        assert_eq!(TicketStatus::Pending.label(TicketKind::Change), "Aguardando aprovação");
        assert_eq!(TicketStatus::Pending.label(TicketKind::Incident), "Pendente");
        assert_eq!(TicketStatus::InProgress.label(TicketKind::Request), "Em andamento");
    }
}
