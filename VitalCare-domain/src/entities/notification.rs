use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    /// Appointment lifecycle change
    Appointment,
    /// Abnormal vital signs
    Warning,
    /// Emergency alert raised by a patient
    Emergency,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Appointment => "APPOINTMENT",
            NotificationType::Warning => "WARNING",
            NotificationType::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPOINTMENT" => Ok(NotificationType::Appointment),
            "WARNING" => Ok(NotificationType::Warning),
            "EMERGENCY" => Ok(NotificationType::Emergency),
            other => Err(format!("Unknown notification type: {}", other)),
        }
    }
}

/// A stored notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Notification {
    pub id: String,
    /// Addressee
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub notification_type: NotificationType,
    /// Link attached to the notification, e.g. a map location
    pub url: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A notification waiting to be persisted and pushed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub notification_type: NotificationType,
    pub url: Option<String>,
}

impl NewNotification {
    pub fn new(
        user_id: impl Into<String>,
        notification_type: NotificationType,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            title: title.into(),
            content: content.into(),
            notification_type,
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Frame sent over the real-time channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct NotificationPush {
    pub notification_id: String,
    pub data: Notification,
}

impl From<Notification> for NotificationPush {
    fn from(notification: Notification) -> Self {
        Self {
            notification_id: notification.id.clone(),
            data: notification,
        }
    }
}
