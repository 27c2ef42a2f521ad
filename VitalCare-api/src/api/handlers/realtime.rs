use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::entities::realtime::WsAuthQuery;
use crate::entities::ErrorResponse;
use vital_care_domain::auth::logging::{log_auth_event, AuthEvent, AuthEventType};
use vital_care_domain::auth::{authenticate, bearer_token, UserInfo};
use vital_care_domain::services::ConnectionRegistry;

/// Authenticate the upgrade request from `?token=` or the Authorization header
pub(crate) fn authenticate_upgrade(query: &WsAuthQuery, headers: &HeaderMap) -> Result<UserInfo, ErrorResponse> {
    let token = match query.token.as_deref() {
        Some(token) => token,
        None => bearer_token(headers).map_err(ErrorResponse::unauthorized)?,
    };

    match authenticate(token) {
        Ok((user, _claims)) => {
            log_auth_event(
                AuthEvent::new(AuthEventType::TokenValidation, Some(&user.user_id), true)
                    .with_resource("/api/v1/notifications/ws")
                    .with_auth_method("jwt"),
            );
            Ok(user)
        }
        Err(e) => {
            log_auth_event(
                AuthEvent::new(AuthEventType::TokenValidation, None, false)
                    .with_details(format!("WebSocket token rejected: {}", e))
                    .with_resource("/api/v1/notifications/ws")
                    .with_auth_method("jwt"),
            );
            Err(ErrorResponse::unauthorized("Invalid token"))
        }
    }
}

/// Real-time notification stream. Every notification dispatched to the user
/// while connected arrives as a JSON text frame `{notification_id, data}`.
#[utoipa::path(
    get,
    path = "/api/v1/notifications/ws",
    params(WsAuthQuery),
    responses(
        (status = 101, description = "Switching to the WebSocket protocol"),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    ),
    tag = "notifications"
)]
#[instrument(skip(ws, registry, query, headers))]
pub async fn notifications_ws(
    ws: WebSocketUpgrade,
    State(registry): State<Arc<ConnectionRegistry>>,
    Query(query): Query<WsAuthQuery>,
    headers: HeaderMap,
) -> Result<Response, ErrorResponse> {
    let user = authenticate_upgrade(&query, &headers)?;
    info!("WebSocket upgrade accepted for {}", user.user_id);
    Ok(ws.on_upgrade(move |socket| serve_socket(socket, registry, user.user_id)))
}

/// Forward pushes to the socket until either side goes away
async fn serve_socket(socket: WebSocket, registry: Arc<ConnectionRegistry>, user_id: String) {
    let (connection_id, mut pushes) = registry.register(&user_id);
    let (mut sink, mut stream) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(push) = pushes.recv().await {
            let frame = match serde_json::to_string(&push) {
                Ok(frame) => frame,
                Err(e) => {
                    error!("Failed to encode notification {}: {}", push.notification_id, e);
                    continue;
                }
            };
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
        if let Err(e) = sink.close().await {
            debug!("Closing socket failed: {}", e);
        }
    });

    // Incoming frames are not part of the protocol; only a close ends the session
    let mut recv_task = tokio::spawn(async move {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket receive error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    registry.unregister(&user_id, connection_id);
    info!("WebSocket closed for {}", user_id);
}
