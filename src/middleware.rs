pub mod auth;
pub mod cache;
pub mod i18n;
pub mod rbac;
