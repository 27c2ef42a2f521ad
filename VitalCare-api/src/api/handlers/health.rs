use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::api::state::HealthServiceHandle;
use vital_care_domain::health::{ComponentStatus, SystemStatus};

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// "ok", "degraded" or "error"
    pub status: String,
    /// Application version from the Cargo manifest
    pub version: String,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the service started
    pub uptime: u64,
    /// Status of each checked component, by name
    pub components: BTreeMap<String, ComponentHealthStatus>,
    pub environment: String,
}

/// Health status for an individual component
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealthStatus {
    /// "ok", "degraded" or "error"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn system_status_label(status: SystemStatus) -> &'static str {
    match status {
        SystemStatus::Healthy => "ok",
        SystemStatus::Degraded => "degraded",
        SystemStatus::Unhealthy => "error",
    }
}

fn component_status_label(status: ComponentStatus) -> &'static str {
    match status {
        ComponentStatus::Healthy => "ok",
        ComponentStatus::Degraded => "degraded",
        ComponentStatus::Unhealthy => "error",
    }
}

/// Health check endpoint to verify the API and its database
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "API is healthy", body = HealthResponse),
        (status = 500, description = "API is not healthy", body = HealthResponse),
        (status = 503, description = "API is degraded", body = HealthResponse)
    ),
    tag = "health"
)]
#[instrument(skip(health_service))]
pub async fn health_check(State(health_service): State<HealthServiceHandle>) -> impl IntoResponse {
    info!("Health check requested");

    let system_health = health_service.get_system_health().await;

    let components = system_health
        .components
        .into_iter()
        .map(|(name, component)| {
            (
                name,
                ComponentHealthStatus {
                    status: component_status_label(component.status).to_string(),
                    message: component.details,
                },
            )
        })
        .collect();

    let response = HealthResponse {
        status: system_status_label(system_health.status).to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        uptime: system_health.uptime_seconds,
        components,
        environment: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
    };

    let status = match system_health.status {
        SystemStatus::Healthy => StatusCode::OK,
        SystemStatus::Degraded => StatusCode::SERVICE_UNAVAILABLE,
        SystemStatus::Unhealthy => {
            warn!("Health check reports an unhealthy system");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, Json(response))
}
