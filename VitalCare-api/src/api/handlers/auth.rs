use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{info, instrument};

use super::json_body;
use crate::api::state::AccountServiceHandle;
use crate::entities::ErrorResponse;
use vital_care_domain::auth::{LoginRequest, LoginResponse};
use vital_care_domain::entities::{Doctor, Patient, RegisterDoctorRequest, RegisterPatientRequest};

/// Register a patient, creating their empty health record
#[utoipa::path(
    post,
    path = "/auth/register/patient",
    request_body = RegisterPatientRequest,
    responses(
        (status = 201, description = "Patient registered", body = Patient),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Assigned doctor not found", body = ErrorResponse),
        (status = 409, description = "Phone number already registered", body = ErrorResponse),
    ),
    tag = "Authentication"
)]
#[instrument(skip(accounts, payload))]
pub async fn register_patient(
    State(accounts): State<AccountServiceHandle>,
    payload: Result<Json<RegisterPatientRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let request = json_body(payload)?;
    info!("Registering patient");

    let patient = accounts.register_patient(request).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

/// Register a doctor
#[utoipa::path(
    post,
    path = "/auth/register/doctor",
    request_body = RegisterDoctorRequest,
    responses(
        (status = 201, description = "Doctor registered", body = Doctor),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Phone number already registered", body = ErrorResponse),
    ),
    tag = "Authentication"
)]
#[instrument(skip(accounts, payload))]
pub async fn register_doctor(
    State(accounts): State<AccountServiceHandle>,
    payload: Result<Json<RegisterDoctorRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let request = json_body(payload)?;
    info!("Registering doctor");

    let doctor = accounts.register_doctor(request).await?;
    Ok((StatusCode::CREATED, Json(doctor)))
}

/// Exchange phone and password for an access token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 401, description = "Invalid phone number or password", body = ErrorResponse),
    ),
    tag = "Authentication"
)]
#[instrument(skip(accounts, payload))]
pub async fn login(
    State(accounts): State<AccountServiceHandle>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ErrorResponse> {
    let request = json_body(payload)?;
    let response = accounts.login(request).await?;
    Ok(Json(response))
}
