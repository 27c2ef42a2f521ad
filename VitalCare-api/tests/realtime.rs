// End-to-end push over a real listener: a connected doctor receives the
// notification created when a patient requests an appointment.

use chrono::{Duration, Utc};
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use vital_care_api::api::{create_app, AppState};
use vital_care_data::database::DatabasePool;
use vital_care_domain::auth::token::generate_token;
use vital_care_domain::entities::{CreateAppointmentRequest, Role};
use vital_care_domain::services::{AppointmentServiceTrait, VitalThresholds};
use vital_care_domain::testing::{seed_doctor, seed_patient, FailingGeolocation};

fn setup_test_env() {
    std::env::set_var("JWT_SECRET", "test_secret_key_for_testing_only");
    std::env::set_var("JWT_ISSUER", "test-issuer");
    std::env::set_var("PASSWORD_HASH_ITERATIONS", "1000");
}

async fn serve(state: AppState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_app(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{}/api/v1/notifications/ws", addr)
}

async fn wait_for_connection(state: &AppState, user_id: &str) {
    for _ in 0..50 {
        if state.connections.connection_count(user_id) > 0 {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("{} never registered a connection", user_id);
}

#[tokio::test]
async fn test_connected_doctor_receives_appointment_push() {
    setup_test_env();
    let pool = DatabasePool::in_memory().unwrap();
    let state = AppState::new(pool.clone(), Arc::new(FailingGeolocation), VitalThresholds::default());
    let url = serve(state.clone()).await;

    let doctor = seed_doctor(&pool, "Lan", "0900000001").await.unwrap();
    let (patient, _) = seed_patient(&pool, "Minh", "0900000002", Some(&doctor.id)).await.unwrap();

    let token = generate_token(&doctor.id, Role::Doctor).unwrap();
    let (mut socket, _) = connect_async(format!("{}?token={}", url, token)).await.unwrap();
    wait_for_connection(&state, &doctor.id).await;

    let appointment = state
        .appointments
        .create(
            &patient.id,
            CreateAppointmentRequest {
                full_name: "Minh".to_string(),
                phone: "0900000002".to_string(),
                notes: None,
                reason: Some("Headache".to_string()),
                date_of_birth: None,
                date_meeting: Utc::now() + Duration::days(1),
                time_meeting: "10:00".to_string(),
            },
        )
        .await
        .unwrap();

    let frame = tokio::time::timeout(std::time::Duration::from_secs(5), socket.next())
        .await
        .expect("no frame within five seconds")
        .unwrap()
        .unwrap();
    let text = match frame {
        Message::Text(text) => text,
        other => panic!("expected a text frame, got {:?}", other),
    };
    let push: Value = serde_json::from_str(&text).unwrap();

    assert_eq!(push["notification_id"], push["data"]["id"]);
    assert_eq!(push["data"]["user_id"], doctor.id.as_str());
    assert_eq!(push["data"]["notification_type"], "APPOINTMENT");
    assert!(!appointment.id.is_empty());
}

#[tokio::test]
async fn test_upgrade_without_token_is_rejected() {
    setup_test_env();
    let pool = DatabasePool::in_memory().unwrap();
    let state = AppState::new(pool, Arc::new(FailingGeolocation), VitalThresholds::default());
    let url = serve(state).await;

    assert!(connect_async(url).await.is_err());
}
