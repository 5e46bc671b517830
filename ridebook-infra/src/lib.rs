pub mod app_config;
pub mod booking_repo;
pub mod catalog_repo;
pub mod checkout;
pub mod database;
pub mod events;
pub mod memory;

pub use app_config::Config;
pub use booking_repo::PgBookingRepository;
pub use catalog_repo::PgVehicleCatalog;
pub use checkout::{HttpCheckoutProcessor, SandboxProcessor, WebhookError, WebhookEvent, WebhookVerifier};
pub use database::DbClient;
pub use events::LogNotifier;
#[cfg(feature = "kafka")]
pub use events::KafkaNotifier;
pub use memory::{InMemoryBookingStore, StaticCatalog};
