pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod flight_repo;
pub mod lock;
pub mod memory;

pub use booking_repo::PgBookingStore;
pub use database::DbClient;
pub use flight_repo::PgFlightLookup;
pub use lock::{MemoryLockManager, RedisLockManager};
pub use memory::MemoryBookingStore;
