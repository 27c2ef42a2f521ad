//! Authentication module for the VitalCare API
//!
//! Provides JWT authentication middleware, role guards, password hashing
//! and structured auth event logging

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::auth::logging::{log_auth_event, AuthEvent, AuthEventType};
use crate::entities::account::Role;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

// JWT handling
pub mod token;

// Role-based access control
pub mod authorize;

// Structured auth event logging
pub mod logging;

// PBKDF2 password hashing
pub mod password;

/// Authentication claims for JSON Web Tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Claims {
    /// Subject (patient or doctor ID)
    pub sub: String,
    /// Account role, "patient" or "doctor"
    pub role: String,
    /// Issuer
    pub iss: String,
    /// Issued at (as timestamp)
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// User information extracted from authenticated requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UserInfo {
    /// Patient or doctor ID
    pub user_id: String,
    /// User roles
    pub roles: Vec<String>,
    /// Authentication source
    pub auth_source: String,
}

impl UserInfo {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            roles: vec![role.as_str().to_string()],
            auth_source: "jwt".to_string(),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.iter().any(|r| r == role.as_str())
    }

    /// The account role carried by the token, if recognised
    pub fn role(&self) -> Option<Role> {
        self.roles.iter().find_map(|r| r.parse().ok())
    }
}

/// Login request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct LoginRequest {
    /// Phone number the account was registered with
    pub phone: String,
    pub password: String,
    /// Which kind of account to sign in to
    pub role: Role,
}

/// Login response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct LoginResponse {
    /// JWT access token
    pub access_token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Seconds until the access token expires
    pub expires_in: i64,
    pub user: UserInfo,
}

/// Extract the bearer token from an Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;
    value
        .strip_prefix("Bearer ")
        .ok_or("Authorization header does not contain Bearer token")
}

/// Validate a token and build the user info it grants
pub fn authenticate(token: &str) -> Result<(UserInfo, Claims), token::SecurityError> {
    let claims = token::validate_token(token)?;
    let role: Role = claims
        .role
        .parse()
        .map_err(token::SecurityError::TokenValidation)?;
    Ok((UserInfo::new(claims.sub.clone(), role), claims))
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}

/// Authentication middleware for protected routes
pub async fn auth_middleware<S>(_state: State<S>, mut req: Request<Body>, next: Next) -> Response {
    let request_path = req.uri().path().to_string();
    let start_time = std::time::Instant::now();

    let token = match bearer_token(req.headers()) {
        Ok(token) => token.to_string(),
        Err(reason) => {
            debug!("{} for {}", reason, request_path);

            let event = AuthEvent::new(AuthEventType::TokenValidation, None, false)
                .with_details(reason)
                .with_resource(request_path)
                .with_duration(start_time.elapsed().as_millis() as u64)
                .with_auth_method("jwt");
            log_auth_event(event);

            return unauthorized(reason);
        }
    };

    match authenticate(&token) {
        Ok((user_info, claims)) => {
            debug!("Token validated for user: {}", claims.sub);

            let event = AuthEvent::new(AuthEventType::TokenValidation, Some(&claims.sub), true)
                .with_details("JWT validation successful")
                .with_resource(request_path)
                .with_duration(start_time.elapsed().as_millis() as u64)
                .with_auth_method("jwt");
            log_auth_event(event);

            req.extensions_mut().insert(user_info);
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(token::SecurityError::TokenExpired) => {
            warn!("Expired token for {}", request_path);

            let event = AuthEvent::new(AuthEventType::SessionExpired, None, false)
                .with_details("JWT token has expired")
                .with_resource(request_path)
                .with_duration(start_time.elapsed().as_millis() as u64)
                .with_auth_method("jwt");
            log_auth_event(event);

            unauthorized("Token has expired")
        }
        Err(e) => {
            warn!("Invalid token for {}: {}", request_path, e);

            let event = AuthEvent::new(AuthEventType::TokenValidation, None, false)
                .with_details(format!("JWT validation failed: {}", e))
                .with_resource(request_path)
                .with_duration(start_time.elapsed().as_millis() as u64)
                .with_auth_method("jwt");
            log_auth_event(event);

            unauthorized("Invalid token")
        }
    }
}

/// Apply CORS and security headers to the application
pub fn configure_auth(app: axum::Router) -> axum::Router {
    use axum::http::{HeaderName, HeaderValue, Method};
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::set_header::SetResponseHeaderLayer;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=63072000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static("camera=(), microphone=(), interest-cohort=()"),
        ));

    app.layer(cors).layer(security_headers)
}

/// Auth info endpoint
#[cfg_attr(feature = "with-api", utoipa::path(
    get,
    path = "/auth/info",
    responses(
        (status = 200, description = "Authentication information", body = UserInfo),
        (status = 401, description = "Not authenticated")
    ),
    tag = "Authentication",
    security(
        ("jwt_auth" = [])
    )
))]
pub async fn auth_info(Extension(user_info): Extension<UserInfo>) -> Json<UserInfo> {
    Json(user_info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::tests::setup_test_env;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    fn protected_app() -> Router {
        Router::new()
            .route("/auth/info", get(auth_info))
            .layer(middleware::from_fn_with_state((), auth_middleware::<()>))
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), Err("Missing Authorization header"));

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers), Ok("abc.def"));
    }

    #[tokio::test]
    async fn test_middleware_rejects_missing_token() {
        setup_test_env();
        let response = protected_app()
            .oneshot(Request::builder().uri("/auth/info").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_middleware_accepts_valid_token() {
        setup_test_env();
        let token = token::generate_token("patient-1", Role::Patient).unwrap();

        let response = protected_app()
            .oneshot(
                Request::builder()
                    .uri("/auth/info")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let info: UserInfo = serde_json::from_slice(&body).unwrap();
        assert_eq!(info.user_id, "patient-1");
        assert!(info.has_role(Role::Patient));
        assert_eq!(info.role(), Some(Role::Patient));
    }

    #[tokio::test]
    async fn test_configure_auth_sets_security_headers() {
        let app = configure_auth(Router::new().route("/", get(|| async { "ok" })));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    }
}
