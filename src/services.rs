pub mod admin_service;
pub mod auth;
pub mod category_service;
pub mod dashboard_service;
pub mod integration_service;
pub mod rate_limit;
pub mod sla_service;
pub mod ticket_service;
pub mod uploads;
