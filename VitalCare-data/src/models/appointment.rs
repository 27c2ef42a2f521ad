use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Storage model for an appointment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    /// Name of the person attending
    pub full_name: String,
    pub phone: String,
    pub notes: Option<String>,
    pub reason: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    /// When the meeting takes place
    pub date_meeting: DateTime<Utc>,
    /// Human readable time slot, e.g. "09:00 - 09:30"
    pub time_meeting: String,
    /// Lifecycle status (CREATED, APPROVED, REFUSED, CANCELED, COMPLETED)
    pub status: String,
    pub is_deleted: bool,
    pub created_by: String,
    pub updated_by: Option<String>,
    pub deleted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input data for creating an appointment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: String,
    pub doctor_id: String,
    pub full_name: String,
    pub phone: String,
    pub notes: Option<String>,
    pub reason: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub date_meeting: DateTime<Utc>,
    pub time_meeting: String,
    pub status: String,
    pub created_by: String,
}

/// Partial update of appointment details. `None` leaves a column unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentDetails {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub reason: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub date_meeting: Option<DateTime<Utc>>,
    pub time_meeting: Option<String>,
    pub updated_by: String,
}

/// Filters for appointment list queries. Deleted rows are always excluded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentFilter {
    pub doctor_id: Option<String>,
    pub patient_id: Option<String>,
    pub status: Option<String>,
    /// Inclusive lower bound on created_at
    pub created_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on created_at
    pub created_to: Option<DateTime<Utc>>,
    /// Substring match on the appointment id
    pub search: Option<String>,
    /// Restrict to these ids when non-empty
    pub ids: Vec<String>,
}
