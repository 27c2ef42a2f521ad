use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};
use validator::Validate;

use crate::auth::logging::{log_failed_login, log_registration, log_successful_login};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::{self, SecurityError};
use crate::auth::{LoginRequest, LoginResponse, UserInfo};
use crate::entities::account::{Doctor, Patient, RegisterDoctorRequest, RegisterPatientRequest, Role};
use crate::entities::{conversions, validation_message};
use vital_care_data::models::account::{CreateDoctorRequest, CreatePatientRequest};
use vital_care_data::repository::{AccountRepositoryTrait, RepositoryError};

/// Account service errors
#[derive(Debug, Error)]
pub enum AccountServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid phone number or password")]
    InvalidCredentials,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Repository error: {0}")]
    RepositoryError(String),

    #[error("Token error: {0}")]
    TokenError(#[from] SecurityError),
}

/// Trait for account operations
#[async_trait]
pub trait AccountServiceTrait: Send + Sync {
    /// Register a patient together with their empty health record
    async fn register_patient(&self, request: RegisterPatientRequest) -> Result<Patient, AccountServiceError>;

    async fn register_doctor(&self, request: RegisterDoctorRequest) -> Result<Doctor, AccountServiceError>;

    /// Check credentials and issue an access token
    async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AccountServiceError>;

    async fn find_patient(&self, id: &str) -> Result<Patient, AccountServiceError>;

    async fn find_doctor(&self, id: &str) -> Result<Doctor, AccountServiceError>;
}

/// Registration and login of patients and doctors
pub struct AccountService<A: AccountRepositoryTrait> {
    accounts: A,
}

impl<A: AccountRepositoryTrait + Send + Sync> AccountService<A> {
    pub fn new(accounts: A) -> Self {
        Self { accounts }
    }

    fn map_repo_error(&self, err: RepositoryError) -> AccountServiceError {
        match err {
            RepositoryError::NotFound(msg) => AccountServiceError::NotFound(msg),
            RepositoryError::Validation(msg) => AccountServiceError::ValidationError(msg),
            RepositoryError::Conflict(_) => {
                AccountServiceError::Conflict("Phone number is already registered".to_string())
            }
            _ => AccountServiceError::RepositoryError(err.to_string()),
        }
    }

    /// Stored ID and password hash of the account with this phone and role
    async fn credentials(&self, phone: &str, role: Role) -> Result<Option<(String, String)>, AccountServiceError> {
        let found = match role {
            Role::Patient => self
                .accounts
                .find_patient_by_phone(phone)
                .await
                .map_err(|e| self.map_repo_error(e))?
                .map(|p| (p.id, p.password_hash)),
            Role::Doctor => self
                .accounts
                .find_doctor_by_phone(phone)
                .await
                .map_err(|e| self.map_repo_error(e))?
                .map(|d| (d.id, d.password_hash)),
        };
        Ok(found)
    }
}

#[async_trait]
impl<A: AccountRepositoryTrait + Send + Sync> AccountServiceTrait for AccountService<A> {
    async fn register_patient(&self, request: RegisterPatientRequest) -> Result<Patient, AccountServiceError> {
        request
            .validate()
            .map_err(|e| AccountServiceError::ValidationError(validation_message(&e)))?;

        if let Some(doctor_id) = request.doctor_id.as_deref() {
            self.accounts
                .find_doctor(doctor_id)
                .await
                .map_err(|e| self.map_repo_error(e))?
                .ok_or_else(|| AccountServiceError::NotFound(format!("Doctor with ID {} not found", doctor_id)))?;
        }

        let (patient, record) = self
            .accounts
            .create_patient(CreatePatientRequest {
                full_name: request.full_name,
                phone: request.phone,
                password_hash: hash_password(&request.password),
                date_of_birth: request.date_of_birth,
                doctor_id: request.doctor_id,
            })
            .await
            .map_err(|e| self.map_repo_error(e))?;

        info!("Registered patient {} with health record {}", patient.id, record.id);
        log_registration(&patient.id, Role::Patient.as_str());
        Ok(conversions::convert_to_domain_patient(patient))
    }

    async fn register_doctor(&self, request: RegisterDoctorRequest) -> Result<Doctor, AccountServiceError> {
        request
            .validate()
            .map_err(|e| AccountServiceError::ValidationError(validation_message(&e)))?;

        let doctor = self
            .accounts
            .create_doctor(CreateDoctorRequest {
                full_name: request.full_name,
                phone: request.phone,
                password_hash: hash_password(&request.password),
                speciality: request.speciality,
            })
            .await
            .map_err(|e| self.map_repo_error(e))?;

        info!("Registered doctor {}", doctor.id);
        log_registration(&doctor.id, Role::Doctor.as_str());
        Ok(conversions::convert_to_domain_doctor(doctor))
    }

    async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AccountServiceError> {
        let Some((user_id, password_hash)) = self.credentials(&request.phone, request.role).await? else {
            log_failed_login(&format!("No {} account for the given phone", request.role));
            return Err(AccountServiceError::InvalidCredentials);
        };

        if !verify_password(&request.password, &password_hash) {
            warn!("Wrong password for {} {}", request.role, user_id);
            log_failed_login("Password mismatch");
            return Err(AccountServiceError::InvalidCredentials);
        }

        let access_token = token::generate_token(&user_id, request.role)?;
        log_successful_login(&user_id, request.role.as_str());

        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: token::access_token_lifetime().num_seconds(),
            user: UserInfo::new(user_id, request.role),
        })
    }

    async fn find_patient(&self, id: &str) -> Result<Patient, AccountServiceError> {
        self.accounts
            .find_patient(id)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .map(conversions::convert_to_domain_patient)
            .ok_or_else(|| AccountServiceError::NotFound(format!("Patient with ID {} not found", id)))
    }

    async fn find_doctor(&self, id: &str) -> Result<Doctor, AccountServiceError> {
        self.accounts
            .find_doctor(id)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .map(conversions::convert_to_domain_doctor)
            .ok_or_else(|| AccountServiceError::NotFound(format!("Doctor with ID {} not found", id)))
    }
}
