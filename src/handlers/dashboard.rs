// src/handlers/dashboard.rs

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        cache::REPORT_CACHE,
        i18n::Locale,
        rbac::{RequireRole, StaffOnly},
    },
    models::dashboard::DashboardSummary,
};

// GET /api/dashboard/summary
#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Contadores do painel de atendimento", body = DashboardSummary),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Apenas equipe de atendimento")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<StaffOnly>,
) -> Result<impl IntoResponse, ApiError> {
    // As quatro contagens rodam em paralelo, cada uma na sua conexão da pool
    let summary = app_state
        .dashboard_service
        .get_summary(Utc::now())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(([(header::CACHE_CONTROL, REPORT_CACHE)], Json(summary)))
}
