// Domain entities and value objects
pub mod account;
pub mod appointment;
pub mod conversions;
pub mod health_record;
pub mod notification;

// Re-export common types for easier imports
pub use account::{Doctor, Patient, RegisterDoctorRequest, RegisterPatientRequest, Role};
pub use appointment::{
    Appointment, AppointmentFilter, AppointmentStatus, CreateAppointmentRequest, UpdateAppointmentRequest,
};
pub use health_record::{
    Assessment, BloodPressureClassification, BloodPressureStatus, BmiClassification, BmiStatus, DailyHistoryEntry,
    DailyReadings, DailySummary, HealthRecord, HealthStatus, LevelClassification, LevelStatus, Metric,
    MetricReading, UpdateReadingRequest, VitalSigns,
};
pub use notification::{NewNotification, Notification, NotificationPush, NotificationType};

pub use vital_care_data::models::Pagination;

use validator::ValidationErrors;

/// Flatten validator field errors into a single message
pub fn validation_message(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let error_msgs: Vec<String> = errors
                .iter()
                .map(|err| match &err.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid {}", field),
                })
                .collect();
            format!("{}: {}", field, error_msgs.join(", "))
        })
        .collect();
    messages.sort();
    messages.join("; ")
}
