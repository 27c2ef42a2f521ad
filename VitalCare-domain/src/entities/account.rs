use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Kind of account a user signs in with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// A patient account, without credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Patient {
    pub id: String,
    pub full_name: String,
    pub phone: String,
    pub date_of_birth: Option<NaiveDate>,
    /// Doctor who receives this patient's warnings and appointment requests
    pub doctor_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A doctor account, without credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Doctor {
    pub id: String,
    pub full_name: String,
    pub phone: String,
    pub speciality: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Phone numbers are 8 to 15 digits with an optional leading '+'
pub(crate) fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if (8..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        let mut error = ValidationError::new("phone");
        error.message = Some("Phone must contain 8 to 15 digits".into());
        Err(error)
    }
}

/// Request payload for registering a patient
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct RegisterPatientRequest {
    #[validate(length(min = 1, max = 100, message = "Full name must be between 1 and 100 characters"))]
    pub full_name: String,

    #[validate(custom = "validate_phone")]
    pub phone: String,

    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters"))]
    pub password: String,

    pub date_of_birth: Option<NaiveDate>,

    /// Assigned doctor, if already known
    pub doctor_id: Option<String>,
}

/// Request payload for registering a doctor
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct RegisterDoctorRequest {
    #[validate(length(min = 1, max = 100, message = "Full name must be between 1 and 100 characters"))]
    pub full_name: String,

    #[validate(custom = "validate_phone")]
    pub phone: String,

    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(max = 100, message = "Speciality cannot exceed 100 characters"))]
    pub speciality: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!("Doctor".parse::<Role>().unwrap(), Role::Doctor);
        assert_eq!(Role::Patient.to_string(), "patient");
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_register_patient_validation() {
        let request = RegisterPatientRequest {
            full_name: "Minh".to_string(),
            phone: "+84901234567".to_string(),
            password: "correct-horse".to_string(),
            date_of_birth: None,
            doctor_id: None,
        };
        assert!(request.validate().is_ok());

        let bad_phone = RegisterPatientRequest {
            phone: "09-12".to_string(),
            ..request.clone()
        };
        let errors = bad_phone.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("phone"));

        let short_password = RegisterPatientRequest {
            password: "short".to_string(),
            ..request
        };
        assert!(short_password.validate().is_err());
    }
}
