use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage model for a notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    /// Addressee
    pub user_id: String,
    pub title: String,
    pub content: String,
    /// APPOINTMENT, WARNING or EMERGENCY
    pub notification_type: String,
    pub url: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Input data for creating a notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotificationRequest {
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub notification_type: String,
    pub url: Option<String>,
}
