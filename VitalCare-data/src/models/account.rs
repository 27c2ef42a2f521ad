use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Storage model for a patient account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub full_name: String,
    pub phone: String,
    pub password_hash: String,
    pub date_of_birth: Option<NaiveDate>,
    /// Assigned doctor, if any
    pub doctor_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Storage model for a doctor account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    pub full_name: String,
    pub phone: String,
    pub password_hash: String,
    pub speciality: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input data for creating a patient together with its health record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub full_name: String,
    pub phone: String,
    pub password_hash: String,
    pub date_of_birth: Option<NaiveDate>,
    pub doctor_id: Option<String>,
}

/// Input data for creating a doctor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub full_name: String,
    pub phone: String,
    pub password_hash: String,
    pub speciality: Option<String>,
}
