use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters of the WebSocket upgrade. Browsers cannot set headers on
/// the upgrade request, so the access token may travel in the query string.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WsAuthQuery {
    /// Bearer access token; the Authorization header is used when absent
    pub token: Option<String>,
}
