// src/handlers/portal.rs
//
// Portal do solicitante: abre e acompanha apenas os próprios chamados.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    handlers::tickets::TicketListQuery,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::ticket::{Level, TicketComment, TicketDraft, TicketKind, TicketView},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortalTicketPayload {
    pub kind: Option<TicketKind>,
    #[validate(length(min = 1, max = 200, message = "required"))]
    #[schema(example = "Não consigo acessar o e-mail")]
    pub title: String,
    pub description: Option<String>,
    pub urgency: Option<Level>,
    pub impact: Option<Level>,
    pub category_id: Option<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/portal/tickets",
    tag = "Portal",
    request_body = PortalTicketPayload,
    responses(
        (status = 201, description = "Chamado aberto", body = TicketView),
        (status = 400, description = "Dados inválidos"),
        (status = 429, description = "Muitos chamados em pouco tempo")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<PortalTicketPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let now = Utc::now();
    app_state
        .rate_limiter
        .check("portal", &user.0.id.to_string(), now)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let draft = TicketDraft {
        kind: payload.kind,
        title: payload.title,
        description: payload.description,
        urgency: payload.urgency,
        impact: payload.impact,
        category_id: payload.category_id,
        ..Default::default()
    };

    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let ticket = app_state
        .ticket_service
        .create_for_requester(&mut *rls_conn, &user.0, draft, now)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(ticket)))
}

#[utoipa::path(
    get,
    path = "/api/portal/tickets",
    tag = "Portal",
    params(TicketListQuery),
    responses(
        (status = 200, description = "Meus chamados", body = Vec<TicketView>),
        (status = 400, description = "Filtro inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_tickets(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(query): Query<TicketListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    // Responsável e grupo são ignorados; o solicitante é sempre o usuário atual
    let filter = query
        .into_filter()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let tickets = app_state
        .ticket_service
        .list_for_requester(&mut *rls_conn, &user.0, filter, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(tickets)))
}

#[utoipa::path(
    get,
    path = "/api/portal/tickets/{id}",
    tag = "Portal",
    params(("id" = Uuid, Path, description = "ID do chamado")),
    responses(
        (status = 200, description = "Chamado", body = TicketView),
        (status = 404, description = "Não encontrado (ou de outro solicitante)")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let ticket = app_state
        .ticket_service
        .get_for_requester(&mut *rls_conn, &user.0, id, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ticket)))
}

// Solicitante não enxerga notas internas
#[utoipa::path(
    get,
    path = "/api/portal/tickets/{id}/comments",
    tag = "Portal",
    params(("id" = Uuid, Path, description = "ID do chamado")),
    responses((status = 200, description = "Conversa pública", body = Vec<TicketComment>)),
    security(("api_jwt" = []))
)]
pub async fn list_comments(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    // Garante a posse antes de listar
    app_state
        .ticket_service
        .get_for_requester(&mut *rls_conn, &user.0, id, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let comments = app_state
        .ticket_service
        .list_comments(&mut *rls_conn, id, false)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(comments)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortalCommentPayload {
    #[validate(length(min = 1, max = 10000, message = "required"))]
    pub body: String,
}

#[utoipa::path(
    post,
    path = "/api/portal/tickets/{id}/comments",
    tag = "Portal",
    params(("id" = Uuid, Path, description = "ID do chamado")),
    request_body = PortalCommentPayload,
    responses(
        (status = 201, description = "Resposta enviada", body = TicketComment),
        (status = 404, description = "Não encontrado (ou de outro solicitante)")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_comment(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PortalCommentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .ticket_service
        .get_for_requester(&mut *rls_conn, &user.0, id, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let comment = app_state
        .ticket_service
        .add_comment(&mut *rls_conn, id, user.0.id, &payload.body, false)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(comment)))
}
