use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Configure Swagger UI endpoints
pub fn configure_swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

/// Registers the bearer JWT scheme referenced by protected paths
struct JwtSecurity;

impl Modify for JwtSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}

// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health endpoints
        crate::api::handlers::health::health_check,

        // Auth endpoints
        crate::api::handlers::auth::login,
        crate::api::handlers::auth::register_patient,
        crate::api::handlers::auth::register_doctor,
        vital_care_domain::auth::auth_info,

        // Appointment endpoints
        crate::api::handlers::appointment::list_appointments,
        crate::api::handlers::appointment::create_appointment,
        crate::api::handlers::appointment::book_appointment,
        crate::api::handlers::appointment::list_doctor_appointments,
        crate::api::handlers::appointment::list_patient_appointments,
        crate::api::handlers::appointment::get_appointment,
        crate::api::handlers::appointment::update_appointment,
        crate::api::handlers::appointment::delete_appointment,
        crate::api::handlers::appointment::approve_appointment,
        crate::api::handlers::appointment::refuse_appointment,
        crate::api::handlers::appointment::cancel_appointment,

        // Health record endpoints
        crate::api::handlers::health_record::submit_vitals,
        crate::api::handlers::health_record::list_health_records,
        crate::api::handlers::health_record::my_health_record,
        crate::api::handlers::health_record::today_readings,
        crate::api::handlers::health_record::patient_history,
        crate::api::handlers::health_record::list_readings,
        crate::api::handlers::health_record::get_reading,
        crate::api::handlers::health_record::update_reading,
        crate::api::handlers::health_record::delete_reading,
        crate::api::handlers::health_record::emergency_alert,

        // Notification endpoints
        crate::api::handlers::notification::list_notifications,
        crate::api::handlers::notification::mark_notification_read,
        crate::api::handlers::realtime::notifications_ws
    ),
    components(
        schemas(
            // Common
            crate::entities::common::ErrorResponse,
            crate::entities::common::PaginationQuery,
            crate::entities::common::AppointmentPage,
            crate::entities::common::HealthRecordPage,
            crate::entities::common::HistoryPage,
            crate::entities::common::ReadingPage,
            crate::entities::common::NotificationPage,
            crate::entities::appointment::AppointmentListQuery,

            // Health
            crate::api::handlers::health::HealthResponse,
            crate::api::handlers::health::ComponentHealthStatus,

            // Accounts
            vital_care_domain::entities::Role,
            vital_care_domain::entities::Patient,
            vital_care_domain::entities::Doctor,
            vital_care_domain::entities::RegisterPatientRequest,
            vital_care_domain::entities::RegisterDoctorRequest,
            vital_care_domain::auth::LoginRequest,
            vital_care_domain::auth::LoginResponse,
            vital_care_domain::auth::UserInfo,
            vital_care_domain::auth::Claims,

            // Appointments
            vital_care_domain::entities::Appointment,
            vital_care_domain::entities::AppointmentStatus,
            vital_care_domain::entities::CreateAppointmentRequest,
            vital_care_domain::entities::UpdateAppointmentRequest,

            // Health records
            vital_care_domain::entities::HealthRecord,
            vital_care_domain::entities::HealthStatus,
            vital_care_domain::entities::VitalSigns,
            vital_care_domain::entities::DailySummary,
            vital_care_domain::entities::DailyReadings,
            vital_care_domain::entities::DailyHistoryEntry,
            vital_care_domain::entities::Metric,
            vital_care_domain::entities::MetricReading,
            vital_care_domain::entities::UpdateReadingRequest,
            vital_care_domain::entities::BmiStatus,
            vital_care_domain::entities::LevelStatus,
            vital_care_domain::entities::BloodPressureStatus,
            vital_care_domain::entities::BmiClassification,
            vital_care_domain::entities::LevelClassification,
            vital_care_domain::entities::BloodPressureClassification,

            // Notifications
            vital_care_domain::entities::Notification,
            vital_care_domain::entities::NotificationType,
            vital_care_domain::entities::NotificationPush
        )
    ),
    modifiers(&JwtSecurity),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "Authentication", description = "Registration, login and token information"),
        (name = "appointments", description = "Appointment lifecycle"),
        (name = "health_records", description = "Daily vital signs, classification and emergency alerts"),
        (name = "notifications", description = "Notification inbox and real-time push")
    ),
    info(
        title = "VitalCare API",
        version = "0.1.0",
        description = "Appointments, daily vital signs and doctor notifications",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        ),
    ),
    servers(
        (url = "/", description = "Local development server")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_doc_generation() {
        let openapi = ApiDoc::openapi();

        assert_eq!(openapi.info.title, "VitalCare API");
        assert_eq!(openapi.info.version, "0.1.0");

        let tags = openapi.tags.as_ref().unwrap();
        assert!(tags.iter().any(|tag| tag.name == "appointments"));
        assert!(tags.iter().any(|tag| tag.name == "health_records"));

        let paths = &openapi.paths.paths;
        for path in [
            "/health",
            "/auth/login",
            "/auth/register/patient",
            "/api/v1/appointments",
            "/api/v1/appointments/{id}/approve",
            "/api/v1/health-records",
            "/api/v1/health-records/patients/{patient_id}/history",
            "/api/v1/health-records/readings/{metric}/{id}",
            "/api/v1/health-records/emergency",
            "/api/v1/notifications/{id}/read",
            "/api/v1/notifications/ws",
        ] {
            assert!(paths.contains_key(path), "missing path {}", path);
        }

        // Both methods of a shared path are documented
        let appointments = &paths["/api/v1/appointments"];
        assert_eq!(appointments.operations.len(), 2);
        let reading = &paths["/api/v1/health-records/readings/{metric}/{id}"];
        assert_eq!(reading.operations.len(), 3);
    }

    #[test]
    fn test_bearer_scheme_is_registered() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.unwrap();
        assert!(components.security_schemes.contains_key("jwt_auth"));
    }
}
