pub mod app_config;
pub mod catalog_repo;
pub mod database;
pub mod directory_repo;
#[cfg(feature = "kafka")]
pub mod events;
pub mod ledger_repo;
pub mod redis_repo;

pub use catalog_repo::PgSlotCatalog;
pub use database::DbClient;
pub use directory_repo::PgDirectory;
#[cfg(feature = "kafka")]
pub use events::{EventProducer, KafkaNotifier};
pub use ledger_repo::PgBookingLedger;
pub use redis_repo::RedisHoldStore;
