use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use super::account::validate_phone;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Lifecycle state of an appointment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    /// Requested by the patient, waiting for the doctor
    Created,
    Approved,
    Refused,
    Canceled,
    /// Meeting time has passed
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Created => "CREATED",
            AppointmentStatus::Approved => "APPROVED",
            AppointmentStatus::Refused => "REFUSED",
            AppointmentStatus::Canceled => "CANCELED",
            AppointmentStatus::Completed => "COMPLETED",
        }
    }

    /// COMPLETED, REFUSED and CANCELED accept no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Refused | AppointmentStatus::Canceled
        )
    }

    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Created, Approved) | (Created, Refused) | (Created, Canceled) | (Approved, Canceled) | (Approved, Completed)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CREATED" => Ok(AppointmentStatus::Created),
            "APPROVED" => Ok(AppointmentStatus::Approved),
            "REFUSED" => Ok(AppointmentStatus::Refused),
            "CANCELED" => Ok(AppointmentStatus::Canceled),
            "COMPLETED" => Ok(AppointmentStatus::Completed),
            other => Err(format!("Unknown appointment status: {}", other)),
        }
    }
}

/// An appointment between a patient and a doctor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    /// Name the appointment was booked under
    pub full_name: String,
    pub phone: String,
    pub notes: Option<String>,
    pub reason: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    /// Meeting date and time
    pub date_meeting: DateTime<Utc>,
    /// Display label of the meeting slot, e.g. "09:30"
    pub time_meeting: String,
    pub status: AppointmentStatus,
    pub created_by: String,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for creating or booking an appointment
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CreateAppointmentRequest {
    #[validate(length(min = 1, max = 100, message = "Full name must be between 1 and 100 characters"))]
    pub full_name: String,

    #[validate(custom = "validate_phone")]
    pub phone: String,

    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,

    #[validate(length(max = 500, message = "Reason cannot exceed 500 characters"))]
    pub reason: Option<String>,

    pub date_of_birth: Option<NaiveDate>,

    pub date_meeting: DateTime<Utc>,

    #[validate(length(min = 1, max = 20, message = "Meeting time must be between 1 and 20 characters"))]
    pub time_meeting: String,
}

/// Request payload for editing appointment details. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UpdateAppointmentRequest {
    #[validate(length(min = 1, max = 100, message = "Full name must be between 1 and 100 characters"))]
    pub full_name: Option<String>,

    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,

    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,

    #[validate(length(max = 500, message = "Reason cannot exceed 500 characters"))]
    pub reason: Option<String>,

    pub date_of_birth: Option<NaiveDate>,

    pub date_meeting: Option<DateTime<Utc>>,

    #[validate(length(min = 1, max = 20, message = "Meeting time must be between 1 and 20 characters"))]
    pub time_meeting: Option<String>,
}

/// Filters shared by the appointment list operations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    /// Substring match on the appointment ID
    pub search: Option<String>,
    pub ids: Vec<String>,
}
