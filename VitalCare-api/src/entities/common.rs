use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use utoipa::{IntoParams, ToSchema};

use vital_care_domain::entities::{
    Appointment, DailyHistoryEntry, HealthRecord, Metric, MetricReading, Notification, Pagination,
};
use vital_care_domain::services::{
    AccountServiceError, AppointmentServiceError, HealthRecordServiceError, NotificationError,
};

/// Largest page a client may request
pub const MAX_PAGE_SIZE: usize = 100;

/// Error response format for the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable identifier, also selects the HTTP status
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }

    /// A submission that lacks some of the day's readings
    pub fn incomplete_submission(missing: &[Metric]) -> Self {
        let labels: Vec<&str> = missing.iter().map(Metric::label).collect();
        Self::new("incomplete_submission", format!("Missing readings: {}", labels.join(", ")))
            .with_details(serde_json::json!({ "missing": missing }))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("forbidden", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("conflict", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }

    /// Internal failures never leak their cause to the client
    pub fn internal_error() -> Self {
        Self::new("internal_error", "An unexpected error occurred")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.as_str() {
            "validation_error" | "bad_request" => StatusCode::BAD_REQUEST,
            "incomplete_submission" => StatusCode::UNPROCESSABLE_ENTITY,
            "not_found" => StatusCode::NOT_FOUND,
            "forbidden" => StatusCode::FORBIDDEN,
            "conflict" | "invalid_transition" => StatusCode::CONFLICT,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<AccountServiceError> for ErrorResponse {
    fn from(err: AccountServiceError) -> Self {
        match err {
            AccountServiceError::ValidationError(msg) => Self::validation_error(msg),
            AccountServiceError::Conflict(msg) => Self::conflict(msg),
            AccountServiceError::InvalidCredentials => Self::unauthorized(err.to_string()),
            AccountServiceError::NotFound(msg) => Self::not_found(msg),
            AccountServiceError::RepositoryError(_) | AccountServiceError::TokenError(_) => {
                error!("Account operation failed: {}", err);
                Self::internal_error()
            }
        }
    }
}

impl From<AppointmentServiceError> for ErrorResponse {
    fn from(err: AppointmentServiceError) -> Self {
        match err {
            AppointmentServiceError::ValidationError(msg) => Self::validation_error(msg),
            AppointmentServiceError::NotFound(msg) => Self::not_found(msg),
            AppointmentServiceError::Forbidden(msg) => Self::forbidden(msg),
            AppointmentServiceError::InvalidTransition { from, to } => {
                warn!("Rejected appointment transition {} -> {}", from, to);
                Self::new("invalid_transition", err.to_string())
                    .with_details(serde_json::json!({ "from": from, "to": to }))
            }
            AppointmentServiceError::Closed(_) => Self::conflict(err.to_string()),
            AppointmentServiceError::RepositoryError(_) => {
                error!("Appointment operation failed: {}", err);
                Self::internal_error()
            }
        }
    }
}

impl From<HealthRecordServiceError> for ErrorResponse {
    fn from(err: HealthRecordServiceError) -> Self {
        match err {
            HealthRecordServiceError::ValidationError(msg) => Self::validation_error(msg),
            HealthRecordServiceError::IncompleteSubmission(missing) => Self::incomplete_submission(&missing),
            HealthRecordServiceError::NotFound(msg) => Self::not_found(msg),
            HealthRecordServiceError::Forbidden(msg) => Self::forbidden(msg),
            HealthRecordServiceError::RepositoryError(_) => {
                error!("Health record operation failed: {}", err);
                Self::internal_error()
            }
        }
    }
}

impl From<NotificationError> for ErrorResponse {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound(id) => Self::not_found(format!("Notification with ID {} not found", id)),
            NotificationError::RepositoryError(_) => {
                error!("Notification operation failed: {}", err);
                Self::internal_error()
            }
        }
    }
}

/// Query parameters for paginated requests
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PaginationQuery {
    /// Number of results to return (default: 20, max: 100)
    pub limit: Option<usize>,

    /// Number of results to skip (default: 0)
    pub offset: Option<usize>,
}

impl PaginationQuery {
    pub fn to_pagination(&self) -> Result<Pagination, ErrorResponse> {
        let defaults = Pagination::default();
        let limit = self.limit.unwrap_or(defaults.limit);
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(ErrorResponse::bad_request(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(Pagination {
            limit,
            offset: self.offset.unwrap_or(defaults.offset),
        })
    }
}

/// Paginated response
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    AppointmentPage = PaginatedResponse<Appointment>,
    HealthRecordPage = PaginatedResponse<HealthRecord>,
    HistoryPage = PaginatedResponse<DailyHistoryEntry>,
    ReadingPage = PaginatedResponse<MetricReading>,
    NotificationPage = PaginatedResponse<Notification>
)]
pub struct PaginatedResponse<T> {
    /// Total count of items available
    pub total_count: usize,

    pub offset: usize,

    pub limit: usize,

    /// URL for the next page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,

    /// URL for the previous page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,

    pub data: Vec<T>,
}

impl<T> PaginatedResponse<T> {
    /// Build a page with navigation links. `filters` are repeated on both links.
    pub fn new(data: Vec<T>, total_count: usize, page: Pagination, base_url: &str, filters: &[(&str, String)]) -> Self {
        let (next, previous) = generate_pagination_links(total_count, page.limit, page.offset, base_url, filters);
        Self {
            total_count,
            offset: page.offset,
            limit: page.limit,
            next,
            previous,
            data,
        }
    }
}

/// Next and previous links for an offset page
pub fn generate_pagination_links(
    total_count: usize,
    limit: usize,
    offset: usize,
    base_url: &str,
    filters: &[(&str, String)],
) -> (Option<String>, Option<String>) {
    let link = |offset: usize| {
        let mut query_parts: Vec<String> = filters
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        query_parts.push(format!("limit={}", limit));
        query_parts.push(format!("offset={}", offset));
        format!("{}?{}", base_url, query_parts.join("&"))
    };

    let next = (offset + limit < total_count).then(|| link(offset + limit));
    let previous = (offset > 0).then(|| link(offset.saturating_sub(limit)));
    (next, previous)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_pagination_links() {
        let (next, previous) = generate_pagination_links(50, 20, 0, "/api/v1/notifications", &[]);
        assert_eq!(next.as_deref(), Some("/api/v1/notifications?limit=20&offset=20"));
        assert!(previous.is_none());

        let filters = [("status", "PENDING".to_string())];
        let (next, previous) = generate_pagination_links(50, 20, 40, "/api/v1/appointments", &filters);
        assert!(next.is_none());
        assert_eq!(
            previous.as_deref(),
            Some("/api/v1/appointments?status=PENDING&limit=20&offset=20")
        );

        // Offsets inside the first page step back to zero
        let (_, previous) = generate_pagination_links(50, 20, 5, "/x", &[]);
        assert_eq!(previous.as_deref(), Some("/x?limit=20&offset=0"));
    }

    #[test]
    fn test_pagination_query_bounds() {
        let page = PaginationQuery::default().to_pagination().unwrap();
        assert_eq!(page, Pagination { limit: 20, offset: 0 });

        let too_big = PaginationQuery { limit: Some(500), offset: None };
        assert_eq!(too_big.to_pagination().unwrap_err().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(ErrorResponse::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorResponse::incomplete_submission(&[Metric::Glucose]).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ErrorResponse::internal_error().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let transition: ErrorResponse = AppointmentServiceError::InvalidTransition {
            from: vital_care_domain::entities::AppointmentStatus::Canceled,
            to: vital_care_domain::entities::AppointmentStatus::Approved,
        }
        .into();
        assert_eq!(transition.status(), StatusCode::CONFLICT);
        assert!(transition.details.is_some());

        let closed: ErrorResponse =
            AppointmentServiceError::Closed(vital_care_domain::entities::AppointmentStatus::Completed).into();
        assert_eq!(closed.status(), StatusCode::CONFLICT);
    }
}
