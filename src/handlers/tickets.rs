// src/handlers/tickets.rs

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    db::ticket_repo::TicketUpdate,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{AdminOnly, RequireRole, StaffOnly},
    },
    models::ticket::{
        Level, Priority, TicketAttachment, TicketComment, TicketDraft, TicketFilter, TicketKind,
        TicketStatus, TicketView,
    },
    services::{
        ticket_service::UploadedFile,
        uploads::UploadKind,
    },
};

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketPayload {
    /// Padrão: o tipo da categoria, ou `incident`
    pub kind: Option<TicketKind>,
    #[validate(length(min = 1, max = 200, message = "required"))]
    #[schema(example = "Impressora do 3º andar sem rede")]
    pub title: String,
    pub description: Option<String>,
    pub urgency: Option<Level>,
    pub impact: Option<Level>,
    /// Quando ausente, vem da matriz urgência x impacto
    pub priority: Option<Priority>,
    pub category_id: Option<Uuid>,
    pub sla_policy_id: Option<Uuid>,
    pub requester_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTicketPayload {
    #[validate(length(min = 1, max = 200, message = "required"))]
    pub title: String,
    pub description: Option<String>,
    pub urgency: Level,
    pub impact: Level,
    pub priority: Option<Priority>,
    pub client_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionPayload {
    pub status: TicketStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReassignCategoryPayload {
    /// `null` remove a categoria
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentPayload {
    #[validate(length(min = 1, max = 10000, message = "required"))]
    pub body: String,
    #[serde(default)]
    pub is_internal: bool,
}

/// Formulário multipart com o arquivo no campo `file`.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Só para imagem de comentário
    #[schema(rename = "isInternal")]
    pub is_internal: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TicketListQuery {
    pub kind: Option<TicketKind>,
    /// Lista separada por vírgulas (ex: `open,in_progress`)
    pub status: Option<String>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_to: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
}

impl TicketListQuery {
    pub fn into_filter(self) -> Result<TicketFilter, AppError> {
        Ok(TicketFilter {
            kind: self.kind,
            statuses: parse_statuses(self.status.as_deref())?,
            due_from: self.due_from,
            due_to: self.due_to,
            assignee_id: self.assignee_id,
            group_id: self.group_id,
            requester_id: None,
        })
    }
}

pub fn parse_statuses(raw: Option<&str>) -> Result<Vec<TicketStatus>, AppError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<TicketStatus>()
                .map_err(|_| AppError::InvalidField { field: "status", code: "invalid_range" })
        })
        .collect()
}

/// Lê o primeiro campo `file` do multipart e os campos de texto simples.
pub async fn read_upload(
    mut multipart: Multipart,
    kind: UploadKind,
) -> Result<(UploadedFile, Option<bool>), AppError> {
    let mut file = None;
    let mut is_internal = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                return Err(AppError::FileTooLarge { max_bytes: kind.max_bytes() });
            }
            Err(e) => {
                tracing::warn!("Multipart inválido: {}", e);
                return Err(AppError::EmptyFile);
            }
        };

        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") if file.is_none() => {
                let file_name = field.file_name().unwrap_or("arquivo").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(|e| {
                    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                        AppError::FileTooLarge { max_bytes: kind.max_bytes() }
                    } else {
                        AppError::EmptyFile
                    }
                })?;
                file = Some(UploadedFile { file_name, content_type, data: data.to_vec() });
            }
            Some("isInternal") => {
                let text = field.text().await.map_err(|_| AppError::EmptyFile)?;
                is_internal = Some(text.trim() == "true");
            }
            _ => {}
        }
    }

    file.map(|f| (f, is_internal)).ok_or(AppError::EmptyFile)
}

// ---
// Handlers: chamados (equipe de atendimento)
// ---

#[utoipa::path(
    post,
    path = "/api/tickets",
    tag = "Tickets",
    request_body = CreateTicketPayload,
    responses(
        (status = 201, description = "Chamado criado", body = TicketView),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Apenas equipe de atendimento"),
        (status = 404, description = "Categoria ou política de SLA inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<StaffOnly>,
    Json(payload): Json<CreateTicketPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let draft = TicketDraft {
        kind: payload.kind,
        title: payload.title,
        description: payload.description,
        urgency: payload.urgency,
        impact: payload.impact,
        priority: payload.priority,
        category_id: payload.category_id,
        sla_policy_id: payload.sla_policy_id,
        // Aberto pela equipe em nome de alguém, ou pelo próprio agente
        requester_id: payload.requester_id.or(Some(user.0.id)),
        client_id: payload.client_id,
        group_id: payload.group_id,
        assignee_id: payload.assignee_id,
    };

    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let ticket = app_state
        .ticket_service
        .create(&mut *rls_conn, draft, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(ticket)))
}

#[utoipa::path(
    get,
    path = "/api/tickets",
    tag = "Tickets",
    params(TicketListQuery),
    responses(
        (status = 200, description = "Chamados com SLA calculado na leitura", body = Vec<TicketView>),
        (status = 400, description = "Filtro inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_tickets(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<StaffOnly>,
    Query(query): Query<TicketListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query
        .into_filter()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let tickets = app_state
        .ticket_service
        .list(&mut *rls_conn, &filter, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(tickets)))
}

#[utoipa::path(
    get,
    path = "/api/tickets/{id}",
    tag = "Tickets",
    params(("id" = Uuid, Path, description = "ID do chamado")),
    responses(
        (status = 200, description = "Chamado", body = TicketView),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<StaffOnly>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let ticket = app_state
        .ticket_service
        .get(&mut *rls_conn, id, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ticket)))
}

#[utoipa::path(
    put,
    path = "/api/tickets/{id}",
    tag = "Tickets",
    params(("id" = Uuid, Path, description = "ID do chamado")),
    request_body = UpdateTicketPayload,
    responses(
        (status = 200, description = "Chamado atualizado", body = TicketView),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<StaffOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTicketPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let update = TicketUpdate {
        priority: payload
            .priority
            .unwrap_or_else(|| Priority::from_matrix(payload.urgency, payload.impact)),
        title: payload.title,
        description: payload.description,
        urgency: payload.urgency,
        impact: payload.impact,
        client_id: payload.client_id,
        group_id: payload.group_id,
        assignee_id: payload.assignee_id,
    };

    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let ticket = app_state
        .ticket_service
        .update(&mut *rls_conn, id, update, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ticket)))
}

#[utoipa::path(
    post,
    path = "/api/tickets/{id}/status",
    tag = "Tickets",
    params(("id" = Uuid, Path, description = "ID do chamado")),
    request_body = TransitionPayload,
    responses(
        (status = 200, description = "Status alterado", body = TicketView),
        (status = 409, description = "Transição não permitida")
    ),
    security(("api_jwt" = []))
)]
pub async fn transition_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<StaffOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let ticket = app_state
        .ticket_service
        .transition(&mut *rls_conn, id, payload.status, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ticket)))
}

#[utoipa::path(
    post,
    path = "/api/tickets/{id}/category",
    tag = "Tickets",
    params(("id" = Uuid, Path, description = "ID do chamado")),
    request_body = ReassignCategoryPayload,
    responses(
        (status = 200, description = "Categoria trocada e prazos recalculados", body = TicketView),
        (status = 404, description = "Chamado ou categoria inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn reassign_category(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<StaffOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReassignCategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let ticket = app_state
        .ticket_service
        .reassign_category(&mut *rls_conn, id, payload.category_id, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ticket)))
}

#[utoipa::path(
    delete,
    path = "/api/tickets/{id}",
    tag = "Tickets",
    params(("id" = Uuid, Path, description = "ID do chamado")),
    responses(
        (status = 204, description = "Excluído"),
        (status = 403, description = "Apenas administradores"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .ticket_service
        .delete(&mut *rls_conn, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// ---
// Handlers: comentários e anexos
// ---

#[utoipa::path(
    get,
    path = "/api/tickets/{id}/comments",
    tag = "Tickets",
    params(("id" = Uuid, Path, description = "ID do chamado")),
    responses((status = 200, description = "Conversa do chamado", body = Vec<TicketComment>)),
    security(("api_jwt" = []))
)]
pub async fn list_comments(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<StaffOnly>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let comments = app_state
        .ticket_service
        .list_comments(&mut *rls_conn, id, true)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(comments)))
}

#[utoipa::path(
    post,
    path = "/api/tickets/{id}/comments",
    tag = "Tickets",
    params(("id" = Uuid, Path, description = "ID do chamado")),
    request_body = CommentPayload,
    responses(
        (status = 201, description = "Comentário criado", body = TicketComment),
        (status = 404, description = "Chamado inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_comment(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<StaffOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CommentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let comment = app_state
        .ticket_service
        .add_comment(&mut *rls_conn, id, user.0.id, &payload.body, payload.is_internal)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    post,
    path = "/api/tickets/{id}/comments/image",
    tag = "Tickets",
    params(("id" = Uuid, Path, description = "ID do chamado")),
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Imagem enviada no chat", body = TicketComment),
        (status = 413, description = "Imagem acima de 5 MB"),
        (status = 415, description = "Apenas imagens")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_comment_image(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<StaffOnly>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (file, is_internal) = read_upload(multipart, UploadKind::CommentImage)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let comment = app_state
        .ticket_service
        .add_comment_image(&mut *rls_conn, id, user.0.id, file, is_internal.unwrap_or(false))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    get,
    path = "/api/tickets/{id}/attachments",
    tag = "Tickets",
    params(("id" = Uuid, Path, description = "ID do chamado")),
    responses((status = 200, description = "Anexos (sem o conteúdo)", body = Vec<TicketAttachment>)),
    security(("api_jwt" = []))
)]
pub async fn list_attachments(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<StaffOnly>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let attachments = app_state
        .ticket_service
        .list_attachments(&mut *rls_conn, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(attachments)))
}

#[utoipa::path(
    post,
    path = "/api/tickets/{id}/attachments",
    tag = "Tickets",
    params(("id" = Uuid, Path, description = "ID do chamado")),
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Anexo salvo", body = TicketAttachment),
        (status = 413, description = "Arquivo acima de 10 MB"),
        (status = 415, description = "Apenas imagens")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_attachment(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<StaffOnly>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (file, _) = read_upload(multipart, UploadKind::Attachment)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let attachment = app_state
        .ticket_service
        .add_attachment(&mut *rls_conn, id, user.0.id, file)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(attachment)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_statuses_comma_list() {
        assert_eq!(
            parse_statuses(Some("open, in_progress,,pending")).unwrap(),
            vec![TicketStatus::Open, TicketStatus::InProgress, TicketStatus::Pending]
        );
        assert!(parse_statuses(None).unwrap().is_empty());
        assert!(matches!(
            parse_statuses(Some("open,archived")),
            Err(AppError::InvalidField { field: "status", .. })
        ));
    }

    #[test]
    fn test_query_into_filter() {
        let query = TicketListQuery {
            kind: Some(TicketKind::Request),
            status: Some("resolved".into()),
            ..Default::default()
        };
        let filter = query.into_filter().unwrap();
        assert_eq!(filter.kind, Some(TicketKind::Request));
        assert_eq!(filter.statuses, vec![TicketStatus::Resolved]);
        assert_eq!(filter.requester_id, None);
    }
}
