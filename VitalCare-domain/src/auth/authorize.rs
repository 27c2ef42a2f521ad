use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use futures::future::BoxFuture;
use serde_json::json;
use tracing::{debug, warn};

use crate::auth::logging::{log_access_denied, log_auth_event, AuthEvent, AuthEventType};
use crate::auth::UserInfo;

/// Middleware for role-based access control
///
/// Lets the request through when the authenticated user holds any of the
/// required roles, otherwise answers 403 Forbidden. Must run after `auth_middleware`.
pub async fn require_roles<S, I>(_state: State<S>, req: Request<Body>, next: Next, required_roles: I) -> Response
where
    I: IntoIterator<Item = String>,
{
    let required_roles: Vec<String> = required_roles.into_iter().collect();
    let request_path = req.uri().path().to_string();

    let Some(user) = req.extensions().get::<UserInfo>() else {
        warn!("No user info found in request extensions for path: {}", request_path);

        let event = AuthEvent::new(AuthEventType::AccessDenied, None, false)
            .with_details("Authentication context missing in request extensions")
            .with_resource(request_path)
            .with_auth_method("rbac");
        log_auth_event(event);

        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "internal_error",
                "message": "Authentication context missing"
            })),
        )
            .into_response();
    };

    if required_roles.iter().any(|role| user.roles.contains(role)) {
        debug!("User {} may access {}", user.user_id, request_path);
        return next.run(req).await;
    }

    warn!(
        "User {} lacks required roles {:?} for {}",
        user.user_id, required_roles, request_path
    );
    log_access_denied(&user.user_id, &request_path, &required_roles);

    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "forbidden",
            "message": "You don't have the required permissions to access this resource",
            "required_roles": required_roles
        })),
    )
        .into_response()
}

/// Middleware factory that requires a specific role
///
/// ```ignore
/// let doctor_routes = Router::new()
///     .route("/appointments/:id/approve", patch(approve_appointment))
///     .layer(middleware::from_fn_with_state(state.clone(), require_role("doctor")));
/// ```
pub fn require_role<S: Clone + Send + Sync + 'static>(
    role: &str,
) -> impl Fn(State<S>, Request<Body>, Next) -> BoxFuture<'static, Response> + Clone + Send + 'static {
    let role = role.to_string();
    move |state, req, next| {
        let roles = vec![role.clone()];
        Box::pin(async move { require_roles(state, req, next, roles).await })
    }
}

/// Middleware factory that requires any of the given roles
pub fn require_any_role<S: Clone + Send + Sync + 'static>(
    roles: &[&str],
) -> impl Fn(State<S>, Request<Body>, Next) -> BoxFuture<'static, Response> + Clone + Send + 'static {
    let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
    move |state, req, next| {
        let roles = roles.clone();
        Box::pin(async move { require_roles(state, req, next, roles).await })
    }
}
