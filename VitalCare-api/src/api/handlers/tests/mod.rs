// Handler tests: the full router over an in-memory database, driven with oneshot


use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use crate::api::{create_app, AppState};
use vital_care_data::database::DatabasePool;
use vital_care_domain::auth::token::generate_token;
use vital_care_domain::entities::Role;
use vital_care_domain::services::{GeolocationProvider, VitalThresholds};
use vital_care_domain::testing::{self, FailingGeolocation};

pub(crate) fn setup_test_env() {
    std::env::set_var("JWT_SECRET", "test_secret_key_for_testing_only");
    std::env::set_var("JWT_ISSUER", "test-issuer");
    std::env::set_var("PASSWORD_HASH_ITERATIONS", "1000");
}

pub(crate) struct TestApp {
    pub router: Router,
    pub pool: DatabasePool,
    pub state: AppState,
}

pub(crate) fn test_app() -> TestApp {
    test_app_with(Arc::new(FailingGeolocation))
}

pub(crate) fn test_app_with(geolocation: Arc<dyn GeolocationProvider>) -> TestApp {
    setup_test_env();
    let pool = DatabasePool::in_memory().unwrap();
    let state = AppState::new(pool.clone(), geolocation, VitalThresholds::default());
    TestApp {
        router: create_app(state.clone()),
        pool,
        state,
    }
}

pub(crate) fn bearer(user_id: &str, role: Role) -> String {
    generate_token(user_id, role).unwrap()
}

/// Build a request with an optional bearer token and JSON body
pub(crate) fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

impl TestApp {
    /// Send a request and decode the JSON answer; empty bodies decode to null
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    /// A stored doctor and a token for them
    pub async fn doctor(&self, phone: &str) -> (String, String) {
        let doctor = testing::seed_doctor(&self.pool, "Lan", phone).await.unwrap();
        let token = bearer(&doctor.id, Role::Doctor);
        (doctor.id, token)
    }

    /// A stored patient, optionally assigned to a doctor, and a token for them
    pub async fn patient(&self, phone: &str, doctor_id: Option<&str>) -> (String, String) {
        let (patient, _) = testing::seed_patient(&self.pool, "Minh", phone, doctor_id).await.unwrap();
        let token = bearer(&patient.id, Role::Patient);
        (patient.id, token)
    }
}
