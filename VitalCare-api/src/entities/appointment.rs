use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use vital_care_domain::entities::{AppointmentFilter, AppointmentStatus, Pagination};

use super::common::{ErrorResponse, PaginationQuery};

/// Query parameters of the appointment list endpoints
#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AppointmentListQuery {
    /// Only appointments in this status
    pub status: Option<AppointmentStatus>,

    /// Created at or after (RFC 3339)
    pub created_from: Option<DateTime<Utc>>,

    /// Created at or before (RFC 3339)
    pub created_to: Option<DateTime<Utc>>,

    /// Substring of the appointment ID
    #[validate(length(min = 1, max = 64, message = "search must be between 1 and 64 characters"))]
    pub search: Option<String>,

    /// Comma-separated appointment IDs
    pub ids: Option<String>,

    pub limit: Option<usize>,

    pub offset: Option<usize>,
}

impl AppointmentListQuery {
    pub fn to_filter(&self) -> Result<AppointmentFilter, ErrorResponse> {
        self.validate()
            .map_err(|e| ErrorResponse::validation_error(vital_care_domain::entities::validation_message(&e)))?;

        if let (Some(from), Some(to)) = (self.created_from, self.created_to) {
            if from > to {
                return Err(ErrorResponse::bad_request("created_from must not be after created_to"));
            }
        }

        let ids = self
            .ids
            .as_deref()
            .map(|ids| {
                ids.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(AppointmentFilter {
            status: self.status,
            created_from: self.created_from,
            created_to: self.created_to,
            search: self.search.clone(),
            ids,
        })
    }

    pub fn to_pagination(&self) -> Result<Pagination, ErrorResponse> {
        PaginationQuery {
            limit: self.limit,
            offset: self.offset,
        }
        .to_pagination()
    }

    /// Filters repeated on the pagination links
    pub fn link_filters(&self) -> Vec<(&'static str, String)> {
        let mut filters = Vec::new();
        if let Some(status) = self.status {
            filters.push(("status", status.as_str().to_string()));
        }
        if let Some(from) = self.created_from {
            filters.push(("created_from", from.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)));
        }
        if let Some(to) = self.created_to {
            filters.push(("created_to", to.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)));
        }
        if let Some(search) = &self.search {
            filters.push(("search", search.clone()));
        }
        if let Some(ids) = &self.ids {
            filters.push(("ids", ids.clone()));
        }
        filters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_to_filter_splits_ids() {
        let query = AppointmentListQuery {
            status: Some(AppointmentStatus::Approved),
            ids: Some("a1, a2,,a3".to_string()),
            ..Default::default()
        };
        let filter = query.to_filter().unwrap();
        assert_eq!(filter.status, Some(AppointmentStatus::Approved));
        assert_eq!(filter.ids, vec!["a1", "a2", "a3"]);
        assert_eq!(query.link_filters()[0], ("status", "APPROVED".to_string()));
    }

    #[test]
    fn test_to_filter_rejects_inverted_range() {
        let query = AppointmentListQuery {
            created_from: Some(Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap()),
            created_to: Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!(query.to_filter().is_err());
    }
}
