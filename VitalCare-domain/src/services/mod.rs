// Domain services
// Business logic sits here; storage goes through the data crate's repository traits.

pub mod account;
pub mod appointment;
pub mod geolocation;
pub mod health_record;
pub mod notification;
pub mod realtime;
pub mod vitals;

// Re-export service traits and their errors
pub use account::{AccountService, AccountServiceError, AccountServiceTrait};
pub use appointment::{AppointmentService, AppointmentServiceError, AppointmentServiceTrait};
pub use geolocation::{GeolocationError, GeolocationProvider, GoogleGeolocation, Location};
pub use health_record::{HealthRecordService, HealthRecordServiceError, HealthRecordServiceTrait};
pub use notification::{NotificationDispatcher, NotificationError, NotificationServiceTrait, PushChannel};
pub use realtime::ConnectionRegistry;
pub use vitals::VitalThresholds;
