use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Geolocation lookup errors
#[derive(Debug, Error)]
pub enum GeolocationError {
    #[error("Geolocation API key is not configured")]
    NotConfigured,

    #[error("Geolocation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Geolocation service answered {0}")]
    Status(u16),
}

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    /// Google Maps search link for this location
    pub fn map_url(&self) -> String {
        format!("https://www.google.com/maps/search/?api=1&query={},{}", self.lat, self.lng)
    }
}

/// Source of the caller's current location
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn locate(&self) -> Result<Location, GeolocationError>;
}

#[derive(Debug, Deserialize)]
struct GeolocateResponse {
    location: Location,
    #[serde(default)]
    accuracy: Option<f64>,
}

/// Client for the Google geolocation API
#[derive(Debug, Clone)]
pub struct GoogleGeolocation {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleGeolocation {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let client = match Client::builder().timeout(Duration::from_secs(10)).build() {
            Ok(client) => client,
            Err(e) => {
                warn!("Falling back to a default HTTP client for geolocation: {}", e);
                Client::new()
            }
        };
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Configure from `GEOLOCATION_URL` and `GEOLOCATION_API_KEY`
    pub fn from_env() -> Self {
        let base_url = env::var("GEOLOCATION_URL").unwrap_or_else(|_| "https://www.googleapis.com".to_string());
        let api_key = env::var("GEOLOCATION_API_KEY").ok().filter(|key| !key.is_empty());
        Self::new(base_url, api_key)
    }
}

#[async_trait]
impl GeolocationProvider for GoogleGeolocation {
    async fn locate(&self) -> Result<Location, GeolocationError> {
        let api_key = self.api_key.as_deref().ok_or(GeolocationError::NotConfigured)?;
        let url = format!("{}/geolocation/v1/geolocate", self.base_url);
        debug!("Requesting geolocation from {}", url);

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&serde_json::json!({ "considerIp": true }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeolocationError::Status(response.status().as_u16()));
        }

        let body: GeolocateResponse = response.json().await?;
        debug!("Located at {},{} (accuracy {:?})", body.location.lat, body.location.lng, body.accuracy);
        Ok(body.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, routing::post, Json, Router};
    use std::collections::HashMap;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_map_url() {
        let location = Location { lat: 10.5, lng: 106.25 };
        assert_eq!(
            location.map_url(),
            "https://www.google.com/maps/search/?api=1&query=10.5,106.25"
        );
    }

    #[tokio::test]
    async fn test_missing_key_fails_fast() {
        let provider = GoogleGeolocation::new("http://127.0.0.1:9", None);
        assert!(matches!(provider.locate().await, Err(GeolocationError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_locate_parses_google_shape() {
        let router = Router::new().route(
            "/geolocation/v1/geolocate",
            post(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("key").map(String::as_str), Some("secret"));
                Json(serde_json::json!({ "location": { "lat": 21.03, "lng": 105.85 }, "accuracy": 1200.0 }))
            }),
        );
        let base = serve(router).await;

        let location = GoogleGeolocation::new(base, Some("secret".to_string())).locate().await.unwrap();
        assert_eq!(location, Location { lat: 21.03, lng: 105.85 });
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let router = Router::new().route(
            "/geolocation/v1/geolocate",
            post(|| async { axum::http::StatusCode::FORBIDDEN }),
        );
        let base = serve(router).await;

        let result = GoogleGeolocation::new(base, Some("secret".to_string())).locate().await;
        assert!(matches!(result, Err(GeolocationError::Status(403))));
    }
}
