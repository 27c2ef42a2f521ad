use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Types of authentication events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthEventType {
    /// Successful login
    Login,
    /// Account registration
    Registration,
    /// Failed login attempt
    FailedLogin,
    /// Access denied to resource
    AccessDenied,
    /// Session expired
    SessionExpired,
    /// Token validation
    TokenValidation,
}

impl std::fmt::Display for AuthEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthEventType::Login => write!(f, "LOGIN"),
            AuthEventType::Registration => write!(f, "REGISTRATION"),
            AuthEventType::FailedLogin => write!(f, "FAILED_LOGIN"),
            AuthEventType::AccessDenied => write!(f, "ACCESS_DENIED"),
            AuthEventType::SessionExpired => write!(f, "SESSION_EXPIRED"),
            AuthEventType::TokenValidation => write!(f, "TOKEN_VALIDATION"),
        }
    }
}

/// Authentication event record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    pub event_type: AuthEventType,
    /// Account ID (if known)
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub details: Option<String>,
    /// The resource being accessed (if applicable)
    pub resource: Option<String>,
    /// Duration of the operation in milliseconds
    pub duration_ms: Option<u64>,
    /// Authentication method used (password, jwt, rbac)
    pub auth_method: Option<String>,
}

impl AuthEvent {
    pub fn new(event_type: AuthEventType, user_id: Option<&str>, success: bool) -> Self {
        Self {
            event_type,
            user_id: user_id.map(String::from),
            timestamp: Utc::now(),
            success,
            details: None,
            resource: None,
            duration_ms: None,
            auth_method: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_auth_method(mut self, auth_method: impl Into<String>) -> Self {
        self.auth_method = Some(auth_method.into());
        self
    }
}

/// Log an authentication event. Failures go out at warn level.
pub fn log_auth_event(event: AuthEvent) {
    let user_id = event.user_id.as_deref().unwrap_or("anonymous");
    let details = event.details.as_deref().unwrap_or("");
    let resource = event.resource.as_deref().unwrap_or("-");

    if event.success {
        info!(
            event_type = %event.event_type,
            user_id,
            resource,
            duration_ms = event.duration_ms,
            "AUTH-LOG [{}] [{}] [SUCCESS] {}",
            event.event_type,
            user_id,
            details
        );
    } else {
        warn!(
            event_type = %event.event_type,
            user_id,
            resource,
            duration_ms = event.duration_ms,
            "AUTH-LOG [{}] [{}] [FAILURE] {}",
            event.event_type,
            user_id,
            details
        );
    }
}

/// Log a successful login
pub fn log_successful_login(user_id: &str, role: &str) {
    let event = AuthEvent::new(AuthEventType::Login, Some(user_id), true)
        .with_details(format!("Signed in as {}", role))
        .with_auth_method("password");
    log_auth_event(event);
}

/// Log a failed login attempt. The phone number is never logged.
pub fn log_failed_login(reason: &str) {
    let event = AuthEvent::new(AuthEventType::FailedLogin, None, false)
        .with_details(reason)
        .with_auth_method("password");
    log_auth_event(event);
}

/// Log a new account
pub fn log_registration(user_id: &str, role: &str) {
    let event = AuthEvent::new(AuthEventType::Registration, Some(user_id), true)
        .with_details(format!("Registered {} account", role))
        .with_auth_method("password");
    log_auth_event(event);
}

/// Log an access denied event
pub fn log_access_denied(user_id: &str, resource: &str, required_roles: &[String]) {
    let event = AuthEvent::new(AuthEventType::AccessDenied, Some(user_id), false)
        .with_resource(resource)
        .with_details(format!("Required roles: {}", required_roles.join(", ")))
        .with_auth_method("rbac");
    log_auth_event(event);
}
