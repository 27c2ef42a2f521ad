use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use tracing::{info, instrument, warn};

use super::json_body;
use crate::api::state::AppointmentServiceHandle;
use crate::entities::appointment::AppointmentListQuery;
use crate::entities::common::AppointmentPage;
use crate::entities::{ErrorResponse, PaginatedResponse};
use vital_care_domain::auth::UserInfo;
use vital_care_domain::entities::{Appointment, CreateAppointmentRequest, UpdateAppointmentRequest};

const BASE_URL: &str = "/api/v1/appointments";

/// List all appointments
#[utoipa::path(
    get,
    path = "/api/v1/appointments",
    params(AppointmentListQuery),
    responses(
        (status = 200, description = "Appointments", body = AppointmentPage),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 403, description = "Doctors only", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "appointments"
)]
#[instrument(skip(service))]
pub async fn list_appointments(
    State(service): State<AppointmentServiceHandle>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<PaginatedResponse<Appointment>>, ErrorResponse> {
    let filter = query.to_filter()?;
    let page = query.to_pagination()?;

    let (appointments, total) = service.find_all(filter, page).await?;
    Ok(Json(PaginatedResponse::new(appointments, total, page, BASE_URL, &query.link_filters())))
}

/// Request an appointment with the patient's doctor
#[utoipa::path(
    post,
    path = "/api/v1/appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment requested", body = Appointment),
        (status = 400, description = "Invalid request or no assigned doctor", body = ErrorResponse),
        (status = 403, description = "Patients only", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "appointments"
)]
#[instrument(skip(service, user, payload), fields(user_id = %user.user_id))]
pub async fn create_appointment(
    State(service): State<AppointmentServiceHandle>,
    Extension(user): Extension<UserInfo>,
    payload: Result<Json<CreateAppointmentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let request = json_body(payload)?;
    let appointment = service.create(&user.user_id, request).await?;
    info!("Appointment {} requested", appointment.id);
    Ok((StatusCode::CREATED, Json(appointment)))
}

/// Book an approved appointment for one of the doctor's patients
#[utoipa::path(
    post,
    path = "/api/v1/appointments/patients/{patient_id}",
    params(("patient_id" = String, Path, description = "Patient ID")),
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment booked", body = Appointment),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Doctors only", body = ErrorResponse),
        (status = 404, description = "Patient not found", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "appointments"
)]
#[instrument(skip(service, user, payload), fields(user_id = %user.user_id))]
pub async fn book_appointment(
    State(service): State<AppointmentServiceHandle>,
    Extension(user): Extension<UserInfo>,
    Path(patient_id): Path<String>,
    payload: Result<Json<CreateAppointmentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let request = json_body(payload)?;
    let appointment = service.book_for_patient(&user.user_id, &patient_id, request).await?;
    info!("Appointment {} booked for patient {}", appointment.id, patient_id);
    Ok((StatusCode::CREATED, Json(appointment)))
}

/// Appointments of the signed-in doctor
#[utoipa::path(
    get,
    path = "/api/v1/appointments/doctor",
    params(AppointmentListQuery),
    responses(
        (status = 200, description = "The doctor's appointments", body = AppointmentPage),
        (status = 403, description = "Doctors only", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "appointments"
)]
#[instrument(skip(service, user), fields(user_id = %user.user_id))]
pub async fn list_doctor_appointments(
    State(service): State<AppointmentServiceHandle>,
    Extension(user): Extension<UserInfo>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<PaginatedResponse<Appointment>>, ErrorResponse> {
    let filter = query.to_filter()?;
    let page = query.to_pagination()?;

    let (appointments, total) = service.list_for_doctor(&user.user_id, filter, page).await?;
    let base_url = format!("{}/doctor", BASE_URL);
    Ok(Json(PaginatedResponse::new(appointments, total, page, &base_url, &query.link_filters())))
}

/// Appointments of the signed-in patient. Approved appointments whose time has passed are completed first.
#[utoipa::path(
    get,
    path = "/api/v1/appointments/patient",
    params(AppointmentListQuery),
    responses(
        (status = 200, description = "The patient's appointments", body = AppointmentPage),
        (status = 403, description = "Patients only", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "appointments"
)]
#[instrument(skip(service, user), fields(user_id = %user.user_id))]
pub async fn list_patient_appointments(
    State(service): State<AppointmentServiceHandle>,
    Extension(user): Extension<UserInfo>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<PaginatedResponse<Appointment>>, ErrorResponse> {
    let filter = query.to_filter()?;
    let page = query.to_pagination()?;

    let (appointments, total) = service.list_for_patient(&user.user_id, filter, page).await?;
    let base_url = format!("{}/patient", BASE_URL);
    Ok(Json(PaginatedResponse::new(appointments, total, page, &base_url, &query.link_filters())))
}

/// Get one appointment; only its patient and doctor may read it
#[utoipa::path(
    get,
    path = "/api/v1/appointments/{id}",
    params(("id" = String, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment found", body = Appointment),
        (status = 403, description = "Not a participant", body = ErrorResponse),
        (status = 404, description = "Appointment not found", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "appointments"
)]
#[instrument(skip(service, user), fields(user_id = %user.user_id))]
pub async fn get_appointment(
    State(service): State<AppointmentServiceHandle>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, ErrorResponse> {
    let appointment = service.find_one(&id).await?;
    if appointment.patient_id != user.user_id && appointment.doctor_id != user.user_id {
        warn!("User {} is not part of appointment {}", user.user_id, id);
        return Err(ErrorResponse::forbidden("Not a participant of this appointment"));
    }
    Ok(Json(appointment))
}

/// Edit appointment details
#[utoipa::path(
    patch,
    path = "/api/v1/appointments/{id}",
    params(("id" = String, Path, description = "Appointment ID")),
    request_body = UpdateAppointmentRequest,
    responses(
        (status = 200, description = "Appointment updated", body = Appointment),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Not a participant", body = ErrorResponse),
        (status = 404, description = "Appointment not found", body = ErrorResponse),
        (status = 409, description = "Appointment is closed", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "appointments"
)]
#[instrument(skip(service, user, payload), fields(user_id = %user.user_id))]
pub async fn update_appointment(
    State(service): State<AppointmentServiceHandle>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateAppointmentRequest>, JsonRejection>,
) -> Result<Json<Appointment>, ErrorResponse> {
    let request = json_body(payload)?;
    let appointment = service.update(&user.user_id, &id, request).await?;
    Ok(Json(appointment))
}

/// Soft delete an appointment
#[utoipa::path(
    delete,
    path = "/api/v1/appointments/{id}",
    params(("id" = String, Path, description = "Appointment ID")),
    responses(
        (status = 204, description = "Appointment deleted"),
        (status = 403, description = "Not a participant", body = ErrorResponse),
        (status = 404, description = "Appointment not found", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "appointments"
)]
#[instrument(skip(service, user), fields(user_id = %user.user_id))]
pub async fn delete_appointment(
    State(service): State<AppointmentServiceHandle>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<StatusCode, ErrorResponse> {
    service.delete(&user.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Approve a requested appointment
#[utoipa::path(
    patch,
    path = "/api/v1/appointments/{id}/approve",
    params(("id" = String, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment approved", body = Appointment),
        (status = 403, description = "Not the appointment's doctor", body = ErrorResponse),
        (status = 404, description = "Appointment not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "appointments"
)]
#[instrument(skip(service, user), fields(user_id = %user.user_id))]
pub async fn approve_appointment(
    State(service): State<AppointmentServiceHandle>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, ErrorResponse> {
    Ok(Json(service.approve(&user.user_id, &id).await?))
}

/// Refuse a requested appointment
#[utoipa::path(
    patch,
    path = "/api/v1/appointments/{id}/refuse",
    params(("id" = String, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment refused", body = Appointment),
        (status = 403, description = "Not the appointment's doctor", body = ErrorResponse),
        (status = 404, description = "Appointment not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "appointments"
)]
#[instrument(skip(service, user), fields(user_id = %user.user_id))]
pub async fn refuse_appointment(
    State(service): State<AppointmentServiceHandle>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, ErrorResponse> {
    Ok(Json(service.refuse(&user.user_id, &id).await?))
}

/// Cancel an appointment on behalf of either participant
#[utoipa::path(
    patch,
    path = "/api/v1/appointments/{id}/cancel",
    params(("id" = String, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment canceled", body = Appointment),
        (status = 403, description = "Not a participant", body = ErrorResponse),
        (status = 404, description = "Appointment not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "appointments"
)]
#[instrument(skip(service, user), fields(user_id = %user.user_id))]
pub async fn cancel_appointment(
    State(service): State<AppointmentServiceHandle>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, ErrorResponse> {
    Ok(Json(service.cancel(&user.user_id, &id).await?))
}
