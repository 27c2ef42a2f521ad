use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use crate::entities::conversions;
use crate::entities::notification::{NewNotification, Notification, NotificationPush};
use crate::entities::Pagination;
use vital_care_data::repository::{NotificationRepositoryTrait, RepositoryError};

/// Notification service errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification not found: {0}")]
    NotFound(String),

    #[error("Repository error: {0}")]
    RepositoryError(String),
}

/// Real-time delivery of notifications to connected users
#[cfg_attr(test, mockall::automock)]
pub trait PushChannel: Send + Sync {
    /// Deliver a frame to every live connection of `user_id`. Returns whether any connection took it.
    fn push(&self, user_id: &str, payload: NotificationPush) -> bool;
}

/// Trait for notification operations
#[async_trait]
pub trait NotificationServiceTrait: Send + Sync {
    /// Persist a notification, then push it to the addressee
    async fn dispatch(&self, notification: NewNotification) -> Result<Notification, NotificationError>;

    /// Notifications addressed to a user, newest first
    async fn list_for_user(
        &self,
        user_id: &str,
        page: Pagination,
    ) -> Result<(Vec<Notification>, usize), NotificationError>;

    /// Mark one of the user's notifications as read
    async fn mark_read(&self, id: &str, user_id: &str) -> Result<Notification, NotificationError>;
}

/// Persists notifications and pushes them over the real-time channel
pub struct NotificationDispatcher<R: NotificationRepositoryTrait> {
    repository: R,
    channel: Arc<dyn PushChannel>,
}

impl<R: NotificationRepositoryTrait> NotificationDispatcher<R> {
    pub fn new(repository: R, channel: Arc<dyn PushChannel>) -> Self {
        Self { repository, channel }
    }

    fn map_repo_error(&self, err: RepositoryError) -> NotificationError {
        match err {
            RepositoryError::NotFound(msg) => NotificationError::NotFound(msg),
            _ => NotificationError::RepositoryError(err.to_string()),
        }
    }
}

fn to_domain(data: vital_care_data::models::notification::Notification) -> Result<Notification, NotificationError> {
    conversions::convert_to_domain_notification(data).map_err(NotificationError::RepositoryError)
}

#[async_trait]
impl<R: NotificationRepositoryTrait + Send + Sync> NotificationServiceTrait for NotificationDispatcher<R> {
    async fn dispatch(&self, notification: NewNotification) -> Result<Notification, NotificationError> {
        let stored = self
            .repository
            .create(conversions::convert_to_data_create_notification(&notification))
            .await
            .map_err(|e| self.map_repo_error(e))?;
        let stored = to_domain(stored)?;

        if self.channel.push(&stored.user_id, NotificationPush::from(stored.clone())) {
            debug!("Pushed notification {} to {}", stored.id, stored.user_id);
        } else {
            debug!("User {} has no live connection for notification {}", stored.user_id, stored.id);
        }

        Ok(stored)
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        page: Pagination,
    ) -> Result<(Vec<Notification>, usize), NotificationError> {
        let (data, total) = self
            .repository
            .list_for_user(user_id, page)
            .await
            .map_err(|e| self.map_repo_error(e))?;

        let notifications = data.into_iter().map(to_domain).collect::<Result<Vec<_>, _>>()?;
        Ok((notifications, total))
    }

    async fn mark_read(&self, id: &str, user_id: &str) -> Result<Notification, NotificationError> {
        let data = self
            .repository
            .mark_read(id, user_id)
            .await
            .map_err(|e| self.map_repo_error(e))?;
        to_domain(data)
    }
}

/// Dispatch a notification as a side effect. Failures are logged, never returned.
pub async fn dispatch_logged(dispatcher: &dyn NotificationServiceTrait, notification: NewNotification) {
    let addressee = notification.user_id.clone();
    let kind = notification.notification_type;
    if let Err(e) = dispatcher.dispatch(notification).await {
        error!("Failed to dispatch {} notification to {}: {}", kind, addressee, e);
    }
}
