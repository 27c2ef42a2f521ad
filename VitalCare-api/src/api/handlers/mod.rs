pub mod appointment;
pub mod auth;
pub mod health;
pub mod health_record;
pub mod notification;
pub mod realtime;

// Tests module
#[cfg(test)]
mod tests;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use tracing::warn;

use crate::entities::ErrorResponse;
use vital_care_domain::auth::UserInfo;
use vital_care_domain::entities::Role;

pub use health::health_check;

/// Unwrap a JSON body, answering malformed input with a 400 in the API's error shape
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ErrorResponse> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            warn!("Rejected request body: {}", rejection.body_text());
            Err(ErrorResponse::bad_request(rejection.body_text()))
        }
    }
}

/// Role carried by the authenticated user's token
pub(crate) fn current_role(user: &UserInfo) -> Result<Role, ErrorResponse> {
    user.role()
        .ok_or_else(|| ErrorResponse::forbidden("Token carries no known role"))
}
