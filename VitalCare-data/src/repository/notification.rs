use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::errors::RepositoryError;
use crate::database::time::{parse_db_timestamp, to_db_timestamp};
use crate::database::DatabasePool;
use crate::models::notification::{CreateNotificationRequest, Notification};
use crate::models::Pagination;

/// Repository trait for stored notifications
#[async_trait]
pub trait NotificationRepositoryTrait {
    /// Persist a new unread notification
    async fn create(&self, request: CreateNotificationRequest) -> Result<Notification, RepositoryError>;

    /// Notifications addressed to a user, newest first, with the total count
    async fn list_for_user(
        &self,
        user_id: &str,
        page: Pagination,
    ) -> Result<(Vec<Notification>, usize), RepositoryError>;

    /// Mark a notification as read. Fails with NotFound unless `user_id` owns it.
    async fn mark_read(&self, id: &str, user_id: &str) -> Result<Notification, RepositoryError>;
}

/// SQLite-backed notification repository
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: DatabasePool,
}

impl NotificationRepository {
    /// Create a new repository over the given pool
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

const NOTIFICATION_COLUMNS: &str = "id, user_id, title, content, notification_type, url, is_read, created_at";

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        notification_type: row.get(4)?,
        url: row.get(5)?,
        is_read: row.get(6)?,
        created_at: parse_db_timestamp(7, row.get(7)?)?,
    })
}

#[async_trait]
impl NotificationRepositoryTrait for NotificationRepository {
    async fn create(&self, request: CreateNotificationRequest) -> Result<Notification, RepositoryError> {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: request.user_id,
            title: request.title,
            content: request.content,
            notification_type: request.notification_type,
            url: request.url,
            is_read: false,
            created_at: Utc::now(),
        };

        debug!("Storing {} notification for {}", notification.notification_type, notification.user_id);

        let conn = self.pool.get()?;
        conn.execute(
            &format!(
                "INSERT INTO notifications ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
                NOTIFICATION_COLUMNS
            ),
            params![
                notification.id,
                notification.user_id,
                notification.title,
                notification.content,
                notification.notification_type,
                notification.url,
                to_db_timestamp(&notification.created_at),
            ],
        )?;

        Ok(notification)
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        page: Pagination,
    ) -> Result<(Vec<Notification>, usize), RepositoryError> {
        let conn = self.pool.get()?;
        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT {} OFFSET {}",
            NOTIFICATION_COLUMNS, page.limit, page.offset
        ))?;
        let rows = stmt.query_map([user_id], notification_from_row)?;

        let mut result = Vec::new();
        for notification in rows {
            result.push(notification?);
        }
        Ok((result, total as usize))
    }

    async fn mark_read(&self, id: &str, user_id: &str) -> Result<Notification, RepositoryError> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(format!("Notification with ID {} not found", id)));
        }

        conn.query_row(
            &format!("SELECT {} FROM notifications WHERE id = ?1", NOTIFICATION_COLUMNS),
            [id],
            notification_from_row,
        )
        .optional()?
        .ok_or_else(|| RepositoryError::NotFound(format!("Notification with ID {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user_id: &str, title: &str) -> CreateNotificationRequest {
        CreateNotificationRequest {
            user_id: user_id.to_string(),
            title: title.to_string(),
            content: "content".to_string(),
            notification_type: "APPOINTMENT".to_string(),
            url: None,
        }
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_user() {
        let repo = NotificationRepository::new(DatabasePool::in_memory().unwrap());
        repo.create(request("doctor-1", "first")).await.unwrap();
        repo.create(request("doctor-1", "second")).await.unwrap();
        repo.create(request("patient-1", "other")).await.unwrap();

        let (items, total) = repo
            .list_for_user("doctor-1", Pagination { limit: 1, offset: 0 })
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(items.len(), 1);
        assert!(items.iter().all(|n| n.user_id == "doctor-1" && !n.is_read));
    }

    #[tokio::test]
    async fn test_mark_read_checks_owner() {
        let repo = NotificationRepository::new(DatabasePool::in_memory().unwrap());
        let created = repo.create(request("doctor-1", "first")).await.unwrap();

        let denied = repo.mark_read(&created.id, "someone-else").await;
        assert!(matches!(denied, Err(RepositoryError::NotFound(_))));

        let read = repo.mark_read(&created.id, "doctor-1").await.unwrap();
        assert!(read.is_read);
    }
}
