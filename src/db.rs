pub mod user_repo;
pub use user_repo::UserRepository;
pub mod ticket_repo;
pub use ticket_repo::TicketRepository;
pub mod category_repo;
pub use category_repo::CategoryRepository;
pub mod sla_repo;
pub use sla_repo::SlaPolicyRepository;
pub mod directory_repo;
pub use directory_repo::DirectoryRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;
pub mod rate_limit_repo;
pub use rate_limit_repo::PgRateLimitStore;
