use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use tracing::{debug, instrument};

use crate::api::state::NotificationServiceHandle;
use crate::entities::common::NotificationPage;
use crate::entities::{ErrorResponse, PaginatedResponse, PaginationQuery};
use vital_care_domain::auth::UserInfo;
use vital_care_domain::entities::Notification;

/// Notifications addressed to the signed-in user, newest first
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Notifications", body = NotificationPage),
        (status = 400, description = "Invalid pagination", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "notifications"
)]
#[instrument(skip(service, user), fields(user_id = %user.user_id))]
pub async fn list_notifications(
    State(service): State<NotificationServiceHandle>,
    Extension(user): Extension<UserInfo>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<Notification>>, ErrorResponse> {
    let page = query.to_pagination()?;
    let (notifications, total) = service.list_for_user(&user.user_id, page).await?;
    debug!("{} of {} notifications returned", notifications.len(), total);
    Ok(Json(PaginatedResponse::new(
        notifications,
        total,
        page,
        "/api/v1/notifications",
        &[],
    )))
}

/// Mark one of the user's notifications as read
#[utoipa::path(
    patch,
    path = "/api/v1/notifications/{id}/read",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked as read", body = Notification),
        (status = 404, description = "No such notification for this user", body = ErrorResponse),
    ),
    security(("jwt_auth" = [])),
    tag = "notifications"
)]
#[instrument(skip(service, user), fields(user_id = %user.user_id))]
pub async fn mark_notification_read(
    State(service): State<NotificationServiceHandle>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, ErrorResponse> {
    Ok(Json(service.mark_read(&id, &user.user_id).await?))
}
