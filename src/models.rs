pub mod auth;
pub mod category;
pub mod dashboard;
pub mod directory;
pub mod sla;
pub mod ticket;
