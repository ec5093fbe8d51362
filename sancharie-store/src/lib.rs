pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod redis_repo;
pub mod user_repo;

pub use app_config::{Settings, StorageBackend};
pub use booking_repo::PgBookingRepository;
pub use database::DbClient;
pub use redis_repo::RedisExpiringStore;
pub use user_repo::PgUserRepository;
