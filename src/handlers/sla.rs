// src/handlers/sla.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
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
    middleware::{
        auth::AuthenticatedUser,
        cache::REPORT_CACHE,
        i18n::Locale,
        rbac::{AdminOnly, RequireRole, StaffOnly},
    },
    models::sla::{SlaPerformanceRow, SlaPolicy, SlaRiskEntry},
};

// ---
// Políticas
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlaPolicyPayload {
    #[validate(length(min = 1, max = 120, message = "required"))]
    #[schema(example = "Padrão 8x5")]
    pub name: String,
    #[validate(range(min = 1, message = "invalid_range"))]
    #[schema(example = 4)]
    pub response_hours: i32,
    #[validate(range(min = 1, message = "invalid_range"))]
    #[schema(example = 24)]
    pub resolution_hours: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[utoipa::path(
    get,
    path = "/api/sla-policies",
    tag = "SLA",
    responses((status = 200, description = "Políticas de SLA", body = Vec<SlaPolicy>)),
    security(("api_jwt" = []))
)]
pub async fn list_policies(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<StaffOnly>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let policies = app_state
        .sla_service
        .list_policies(&mut *rls_conn)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(policies)))
}

#[utoipa::path(
    post,
    path = "/api/sla-policies",
    tag = "SLA",
    request_body = SlaPolicyPayload,
    responses(
        (status = 201, description = "Política criada", body = SlaPolicy),
        (status = 400, description = "Resolução menor que a resposta")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_policy(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Json(payload): Json<SlaPolicyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let policy = app_state
        .sla_service
        .create_policy(
            &mut *rls_conn,
            &payload.name,
            payload.response_hours,
            payload.resolution_hours,
            payload.is_active,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(policy)))
}

#[utoipa::path(
    get,
    path = "/api/sla-policies/{id}",
    tag = "SLA",
    params(("id" = Uuid, Path, description = "ID da política")),
    responses(
        (status = 200, description = "Política", body = SlaPolicy),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_policy(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<StaffOnly>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let policy = app_state
        .sla_service
        .get_policy(&mut *rls_conn, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(policy)))
}

#[utoipa::path(
    put,
    path = "/api/sla-policies/{id}",
    tag = "SLA",
    params(("id" = Uuid, Path, description = "ID da política")),
    request_body = SlaPolicyPayload,
    responses(
        (status = 200, description = "Política atualizada (prazos existentes não mudam)", body = SlaPolicy),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_policy(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SlaPolicyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let policy = app_state
        .sla_service
        .update_policy(
            &mut *rls_conn,
            id,
            &payload.name,
            payload.response_hours,
            payload.resolution_hours,
            payload.is_active,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(policy)))
}

#[utoipa::path(
    delete,
    path = "/api/sla-policies/{id}",
    tag = "SLA",
    params(("id" = Uuid, Path, description = "ID da política")),
    responses(
        (status = 204, description = "Excluída"),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_policy(
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
        .sla_service
        .delete_policy(&mut *rls_conn, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// ---
// Relatórios
// ---

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PerformanceQuery {
    /// Início (inclusivo) pelo prazo de resolução
    pub from: Option<DateTime<Utc>>,
    /// Fim (exclusivo)
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RiskQuery {
    /// Janela em horas (padrão 4, máximo 720)
    pub hours: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/sla/performance",
    tag = "SLA",
    params(PerformanceQuery),
    responses(
        (status = 200, description = "Linha geral seguida de uma linha por tipo", body = Vec<SlaPerformanceRow>),
        (status = 400, description = "Intervalo inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_performance(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<StaffOnly>,
    Query(query): Query<PerformanceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let rows = app_state
        .sla_service
        .performance(&mut *rls_conn, query.from, query.to, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(([(header::CACHE_CONTROL, REPORT_CACHE)], Json(rows)))
}

#[utoipa::path(
    get,
    path = "/api/sla/risk",
    tag = "SLA",
    params(RiskQuery),
    responses(
        (status = 200, description = "Chamados em aberto vencidos ou perto do prazo", body = Vec<SlaRiskEntry>),
        (status = 400, description = "Janela fora do intervalo")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_risk(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<StaffOnly>,
    Query(query): Query<RiskQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let entries = app_state
        .sla_service
        .risk(&mut *rls_conn, query.hours, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(([(header::CACHE_CONTROL, REPORT_CACHE)], Json(entries)))
}
