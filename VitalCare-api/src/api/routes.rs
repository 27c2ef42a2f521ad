use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::api::handlers::{appointment, auth, health, health_record, notification, realtime};
use crate::api::state::AppState;
use crate::openapi::configure_swagger_routes;
use vital_care_domain::auth::{auth_info, auth_middleware, authorize, configure_auth};
use vital_care_domain::entities::Role;

/// Routes only doctors may call
fn doctor_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/appointments", get(appointment::list_appointments))
        .route("/appointments/doctor", get(appointment::list_doctor_appointments))
        .route("/appointments/patients/:patient_id", post(appointment::book_appointment))
        .route("/appointments/:id/approve", patch(appointment::approve_appointment))
        .route("/appointments/:id/refuse", patch(appointment::refuse_appointment))
        .route("/health-records", get(health_record::list_health_records))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authorize::require_role::<AppState>(Role::Doctor.as_str()),
        ))
}

/// Routes only patients may call
fn patient_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/appointments", post(appointment::create_appointment))
        .route("/appointments/patient", get(appointment::list_patient_appointments))
        .route("/health-records", post(health_record::submit_vitals))
        .route("/health-records/me", get(health_record::my_health_record))
        .route("/health-records/today", get(health_record::today_readings))
        .route("/health-records/readings/:metric", get(health_record::list_readings))
        .route(
            "/health-records/readings/:metric/:id",
            get(health_record::get_reading)
                .patch(health_record::update_reading)
                .delete(health_record::delete_reading),
        )
        .route("/health-records/emergency", post(health_record::emergency_alert))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authorize::require_role::<AppState>(Role::Patient.as_str()),
        ))
}

/// Routes open to any signed-in user; participation is checked by the services
fn member_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/appointments/:id",
            get(appointment::get_appointment)
                .patch(appointment::update_appointment)
                .delete(appointment::delete_appointment),
        )
        .route("/appointments/:id/cancel", patch(appointment::cancel_appointment))
        .route(
            "/health-records/patients/:patient_id/history",
            get(health_record::patient_history),
        )
        .route("/notifications", get(notification::list_notifications))
        .route("/notifications/:id/read", patch(notification::mark_notification_read))
}

/// Create the application router over the given services
pub fn create_app(state: AppState) -> Router {
    debug!("Creating application router");

    let api_routes = Router::new()
        .merge(doctor_routes(&state))
        .merge(patient_routes(&state))
        .merge(member_routes())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware::<AppState>));

    // The upgrade request authenticates itself, the token may come in the query string
    let realtime_routes = Router::new().route("/notifications/ws", get(realtime::notifications_ws));

    debug!("API routes configured");

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/auth/login", post(auth::login))
        .route("/auth/register/patient", post(auth::register_patient))
        .route("/auth/register/doctor", post(auth::register_doctor));

    let auth_routes = Router::new()
        .route("/auth/info", get(auth_info))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware::<AppState>));

    let app = Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .nest("/api/v1", api_routes.merge(realtime_routes))
        .with_state(state);

    debug!("Routes merged");

    let app = add_swagger_ui(app).layer(TraceLayer::new_for_http());

    configure_auth(app)
}

/// Add Swagger UI to the router
pub fn add_swagger_ui(app: Router) -> Router {
    app.merge(configure_swagger_routes())
}
