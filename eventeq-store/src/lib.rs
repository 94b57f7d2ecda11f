pub mod app_config;
pub mod booking_repo;
pub mod catalog_repo;
pub mod database;
#[cfg(feature = "kafka")]
pub mod events;
pub mod gateway;
pub mod mailer;
pub mod redis_repo;
pub mod user_repo;

pub use booking_repo::PgBookingRepository;
pub use catalog_repo::PgItemCatalog;
pub use database::DbClient;
#[cfg(feature = "kafka")]
pub use events::EventProducer;
pub use gateway::ToyyibPayGateway;
pub use mailer::SmtpNotifier;
pub use redis_repo::RedisClient;
pub use user_repo::PgUserDirectory;
