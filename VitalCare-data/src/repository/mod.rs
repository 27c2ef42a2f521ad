// Repository module structure
pub mod errors;
mod account;
mod appointment;
mod health_record;
mod notification;

// Re-export commonly used types
pub use errors::RepositoryError;
pub use account::{AccountRepository, AccountRepositoryTrait};
pub use appointment::{AppointmentRepository, AppointmentRepositoryTrait};
pub use health_record::{HealthRecordRepository, HealthRecordRepositoryTrait};
pub use notification::{NotificationRepository, NotificationRepositoryTrait};
