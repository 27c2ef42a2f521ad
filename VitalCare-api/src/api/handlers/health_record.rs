use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use tracing::{info, instrument, warn};

use super::{current_role, json_body};
use crate::api::state::HealthRecordServiceHandle;
use crate::entities::common::{HealthRecordPage, HistoryPage, ReadingPage};
use crate::entities::{ErrorResponse, PaginatedResponse, PaginationQuery};
use vital_care_domain::auth::UserInfo;
use vital_care_domain::entities::{
    DailyHistoryEntry, DailyReadings, DailySummary, HealthRecord, Metric, MetricReading, Notification,
    UpdateReadingRequest, VitalSigns,
};

const BASE_URL: &str = "/api/v1/health-records";

fn parse_metric(slug: &str) -> Result<Metric, ErrorResponse> {
    slug.parse().map_err(|e: String| {
        warn!("{}", e);
        ErrorResponse::not_found(e)
    })
}

/// Record today's vital signs and classify the day
#[utoipa::path(
    post,
    path = "/api/v1/health-records",
    request_body = VitalSigns,
    responses(
        (status = 200, description = "Day classified", body = DailySummary),
        (status = 400, description = "Invalid vital signs", body = ErrorResponse),
        (status = 403, description = "Patients only", body = ErrorResponse),
        (status = 404, description = "Health record not found", body = ErrorResponse),
        (status = 422, description = "Some of the day's readings are missing", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "health_records"
)]
#[instrument(skip(service, user, payload), fields(user_id = %user.user_id))]
pub async fn submit_vitals(
    State(service): State<HealthRecordServiceHandle>,
    Extension(user): Extension<UserInfo>,
    payload: Result<Json<VitalSigns>, JsonRejection>,
) -> Result<Json<DailySummary>, ErrorResponse> {
    let vitals = json_body(payload)?;
    let summary = service.submit(&user.user_id, vitals).await?;
    info!("Health record {} is now {}", summary.health_record_id, summary.status);
    Ok(Json(summary))
}

/// List health records, newest first
#[utoipa::path(
    get,
    path = "/api/v1/health-records",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Health records", body = HealthRecordPage),
        (status = 403, description = "Doctors only", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "health_records"
)]
#[instrument(skip(service))]
pub async fn list_health_records(
    State(service): State<HealthRecordServiceHandle>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<HealthRecord>>, ErrorResponse> {
    let page = query.to_pagination()?;
    let (records, total) = service.find_all(page).await?;
    Ok(Json(PaginatedResponse::new(records, total, page, BASE_URL, &[])))
}

/// The signed-in patient's health record
#[utoipa::path(
    get,
    path = "/api/v1/health-records/me",
    responses(
        (status = 200, description = "Health record", body = HealthRecord),
        (status = 404, description = "Health record not found", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "health_records"
)]
#[instrument(skip(service, user), fields(user_id = %user.user_id))]
pub async fn my_health_record(
    State(service): State<HealthRecordServiceHandle>,
    Extension(user): Extension<UserInfo>,
) -> Result<Json<HealthRecord>, ErrorResponse> {
    Ok(Json(service.my_record(&user.user_id).await?))
}

/// Readings recorded today; metrics not yet recorded are null
#[utoipa::path(
    get,
    path = "/api/v1/health-records/today",
    responses(
        (status = 200, description = "Today's readings", body = DailyReadings),
        (status = 404, description = "Health record not found", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "health_records"
)]
#[instrument(skip(service, user), fields(user_id = %user.user_id))]
pub async fn today_readings(
    State(service): State<HealthRecordServiceHandle>,
    Extension(user): Extension<UserInfo>,
) -> Result<Json<DailyReadings>, ErrorResponse> {
    Ok(Json(service.today(&user.user_id).await?))
}

/// Daily history of a patient, one entry per blood pressure day
#[utoipa::path(
    get,
    path = "/api/v1/health-records/patients/{patient_id}/history",
    params(
        ("patient_id" = String, Path, description = "Patient ID"),
        PaginationQuery
    ),
    responses(
        (status = 200, description = "Daily history", body = HistoryPage),
        (status = 403, description = "Neither the patient nor their doctor", body = ErrorResponse),
        (status = 404, description = "Patient not found", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "health_records"
)]
#[instrument(skip(service, user), fields(user_id = %user.user_id))]
pub async fn patient_history(
    State(service): State<HealthRecordServiceHandle>,
    Extension(user): Extension<UserInfo>,
    Path(patient_id): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<DailyHistoryEntry>>, ErrorResponse> {
    let role = current_role(&user)?;
    let page = query.to_pagination()?;

    let (entries, total) = service.history(&user.user_id, role, &patient_id, page).await?;
    let base_url = format!("{}/patients/{}/history", BASE_URL, patient_id);
    Ok(Json(PaginatedResponse::new(entries, total, page, &base_url, &[])))
}

/// Readings of one metric for the signed-in patient, newest first
#[utoipa::path(
    get,
    path = "/api/v1/health-records/readings/{metric}",
    params(
        ("metric" = String, Path, description = "bmi, blood-pressure, cholesterol, glucose or heartbeat"),
        PaginationQuery
    ),
    responses(
        (status = 200, description = "Readings", body = ReadingPage),
        (status = 404, description = "Unknown metric or health record", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "health_records"
)]
#[instrument(skip(service, user), fields(user_id = %user.user_id))]
pub async fn list_readings(
    State(service): State<HealthRecordServiceHandle>,
    Extension(user): Extension<UserInfo>,
    Path(metric): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<MetricReading>>, ErrorResponse> {
    let metric = parse_metric(&metric)?;
    let page = query.to_pagination()?;

    let (readings, total) = service.list_readings(&user.user_id, metric, page).await?;
    let base_url = format!("{}/readings/{}", BASE_URL, metric.slug());
    Ok(Json(PaginatedResponse::new(readings, total, page, &base_url, &[])))
}

/// One reading of a metric
#[utoipa::path(
    get,
    path = "/api/v1/health-records/readings/{metric}/{id}",
    params(
        ("metric" = String, Path, description = "bmi, blood-pressure, cholesterol, glucose or heartbeat"),
        ("id" = String, Path, description = "Reading ID")
    ),
    responses(
        (status = 200, description = "Reading found", body = MetricReading),
        (status = 404, description = "Reading not found", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "health_records"
)]
#[instrument(skip(service, user), fields(user_id = %user.user_id))]
pub async fn get_reading(
    State(service): State<HealthRecordServiceHandle>,
    Extension(user): Extension<UserInfo>,
    Path((metric, id)): Path<(String, String)>,
) -> Result<Json<MetricReading>, ErrorResponse> {
    let metric = parse_metric(&metric)?;
    Ok(Json(service.get_reading(&user.user_id, metric, &id).await?))
}

/// Correct one reading; a reading of today re-evaluates the record status
#[utoipa::path(
    patch,
    path = "/api/v1/health-records/readings/{metric}/{id}",
    params(
        ("metric" = String, Path, description = "bmi, blood-pressure, cholesterol, glucose or heartbeat"),
        ("id" = String, Path, description = "Reading ID")
    ),
    request_body = UpdateReadingRequest,
    responses(
        (status = 200, description = "Reading corrected", body = MetricReading),
        (status = 400, description = "Invalid or inapplicable values", body = ErrorResponse),
        (status = 404, description = "Reading not found", body = ErrorResponse),
        (status = 422, description = "Today's readings are no longer complete", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "health_records"
)]
#[instrument(skip(service, user, payload), fields(user_id = %user.user_id))]
pub async fn update_reading(
    State(service): State<HealthRecordServiceHandle>,
    Extension(user): Extension<UserInfo>,
    Path((metric, id)): Path<(String, String)>,
    payload: Result<Json<UpdateReadingRequest>, JsonRejection>,
) -> Result<Json<MetricReading>, ErrorResponse> {
    let metric = parse_metric(&metric)?;
    let request = json_body(payload)?;
    let reading = service.update_reading(&user.user_id, metric, &id, request).await?;
    info!("Corrected {} reading {}", metric.label(), reading.id);
    Ok(Json(reading))
}

/// Delete one reading of a past day
#[utoipa::path(
    delete,
    path = "/api/v1/health-records/readings/{metric}/{id}",
    params(
        ("metric" = String, Path, description = "bmi, blood-pressure, cholesterol, glucose or heartbeat"),
        ("id" = String, Path, description = "Reading ID")
    ),
    responses(
        (status = 204, description = "Reading deleted"),
        (status = 404, description = "Reading not found", body = ErrorResponse),
        (status = 422, description = "Today's readings cannot be removed", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "health_records"
)]
#[instrument(skip(service, user), fields(user_id = %user.user_id))]
pub async fn delete_reading(
    State(service): State<HealthRecordServiceHandle>,
    Extension(user): Extension<UserInfo>,
    Path((metric, id)): Path<(String, String)>,
) -> Result<StatusCode, ErrorResponse> {
    let metric = parse_metric(&metric)?;
    service.delete_reading(&user.user_id, metric, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Alert the patient's doctor, attaching a map link when the location is known
#[utoipa::path(
    post,
    path = "/api/v1/health-records/emergency",
    responses(
        (status = 201, description = "Doctor alerted", body = Notification),
        (status = 404, description = "No assigned doctor", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "health_records"
)]
#[instrument(skip(service, user), fields(user_id = %user.user_id))]
pub async fn emergency_alert(
    State(service): State<HealthRecordServiceHandle>,
    Extension(user): Extension<UserInfo>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let notification = service.emergency(&user.user_id).await?;
    warn!("Emergency raised by patient {}", user.user_id);
    Ok((StatusCode::CREATED, Json(notification)))
}
