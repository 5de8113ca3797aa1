pub mod admin;
pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod portal;
pub mod sla;
pub mod tickets;
