// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_me,

        // --- Tickets ---
        handlers::tickets::create_ticket,
        handlers::tickets::list_tickets,
        handlers::tickets::get_ticket,
        handlers::tickets::update_ticket,
        handlers::tickets::transition_ticket,
        handlers::tickets::reassign_category,
        handlers::tickets::delete_ticket,
        handlers::tickets::list_comments,
        handlers::tickets::add_comment,
        handlers::tickets::add_comment_image,
        handlers::tickets::list_attachments,
        handlers::tickets::add_attachment,

        // --- Portal ---
        handlers::portal::create_ticket,
        handlers::portal::list_tickets,
        handlers::portal::get_ticket,
        handlers::portal::list_comments,
        handlers::portal::add_comment,

        // --- Categories ---
        handlers::categories::list_categories,
        handlers::categories::create_category,
        handlers::categories::get_category,
        handlers::categories::update_category,
        handlers::categories::delete_category,

        // --- SLA ---
        handlers::sla::list_policies,
        handlers::sla::create_policy,
        handlers::sla::get_policy,
        handlers::sla::update_policy,
        handlers::sla::delete_policy,
        handlers::sla::get_performance,
        handlers::sla::get_risk,

        // --- Dashboard ---
        handlers::dashboard::get_summary,

        // --- Admin ---
        handlers::admin::list_users,
        handlers::admin::update_user,
        handlers::admin::delete_user,
        handlers::admin::invite_user,
        handlers::admin::list_groups,
        handlers::admin::create_group,
        handlers::admin::get_group,
        handlers::admin::update_group,
        handlers::admin::delete_group,
        handlers::admin::list_clients,
        handlers::admin::create_client,
        handlers::admin::update_client,
        handlers::admin::delete_client,
        handlers::admin::test_webhook,
    ),
    components(
        schemas(
            // Auth
            models::auth::User,
            models::auth::UserRole,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // Tickets
            models::ticket::Ticket,
            models::ticket::TicketView,
            models::ticket::TicketKind,
            models::ticket::TicketStatus,
            models::ticket::Level,
            models::ticket::Priority,
            models::ticket::TicketComment,
            models::ticket::TicketAttachment,
            handlers::tickets::CreateTicketPayload,
            handlers::tickets::UpdateTicketPayload,
            handlers::tickets::TransitionPayload,
            handlers::tickets::ReassignCategoryPayload,
            handlers::tickets::CommentPayload,
            handlers::tickets::UploadForm,
            handlers::portal::PortalTicketPayload,
            handlers::portal::PortalCommentPayload,

            // Categorias e SLA
            models::category::Category,
            handlers::categories::CategoryPayload,
            models::sla::SlaPolicy,
            models::sla::SlaStatus,
            models::sla::SlaPerformanceRow,
            models::sla::SlaRiskRow,
            models::sla::SlaRiskEntry,
            handlers::sla::SlaPolicyPayload,

            // Dashboard
            models::dashboard::DashboardSummary,

            // Admin
            models::directory::Client,
            models::directory::Group,
            models::directory::GroupDetail,
            handlers::admin::UpdateUserPayload,
            handlers::admin::InviteUserPayload,
            handlers::admin::GroupPayload,
            handlers::admin::ClientPayload,
            services::integration_service::InviteResult,
            services::integration_service::WebhookTestResult,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Tickets", description = "Chamados (equipe de atendimento)"),
        (name = "Portal", description = "Portal do Solicitante"),
        (name = "Categories", description = "Categorias e padrões de atribuição"),
        (name = "SLA", description = "Políticas, desempenho e risco de SLA"),
        (name = "Dashboard", description = "Indicadores do painel"),
        (name = "Admin", description = "Usuários, grupos, clientes e integrações")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_sla_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/sla/performance"));
        assert!(doc.paths.paths.contains_key("/api/tickets/{id}/status"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
