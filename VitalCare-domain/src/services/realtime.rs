use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::entities::notification::NotificationPush;
use crate::services::notification::PushChannel;

/// Buffered frames per connection before pushes start being dropped
const CHANNEL_CAPACITY: usize = 64;

/// Handle identifying one live connection of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

/// Live real-time connections, keyed by user ID. A user may hold several.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, Vec<(ConnectionId, mpsc::Sender<NotificationPush>)>>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and return the receiver its writer task drains
    pub fn register(&self, user_id: &str) -> (ConnectionId, mpsc::Receiver<NotificationPush>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        match self.connections.write() {
            Ok(mut connections) => {
                connections.entry(user_id.to_string()).or_default().push((id, tx));
                debug!("Registered connection {:?} for {}", id, user_id);
            }
            Err(_) => error!("Connection registry lock poisoned, {} will not receive pushes", user_id),
        }
        (id, rx)
    }

    /// Remove a connection on disconnect
    pub fn unregister(&self, user_id: &str, id: ConnectionId) {
        if let Ok(mut connections) = self.connections.write() {
            if let Some(senders) = connections.get_mut(user_id) {
                senders.retain(|(existing, _)| *existing != id);
                if senders.is_empty() {
                    connections.remove(user_id);
                }
            }
            debug!("Unregistered connection {:?} for {}", id, user_id);
        }
    }

    /// Number of live connections of a user
    pub fn connection_count(&self, user_id: &str) -> usize {
        self.connections
            .read()
            .map(|c| c.get(user_id).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }
}

impl PushChannel for ConnectionRegistry {
    fn push(&self, user_id: &str, payload: NotificationPush) -> bool {
        let senders = match self.connections.read() {
            Ok(connections) => match connections.get(user_id) {
                Some(senders) => senders.clone(),
                None => return false,
            },
            Err(_) => {
                error!("Connection registry lock poisoned");
                return false;
            }
        };

        let mut delivered = false;
        for (id, tx) in senders {
            match tx.try_send(payload.clone()) {
                Ok(()) => delivered = true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("Connection {:?} of {} is full, dropping {}", id, user_id, payload.notification_id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => self.unregister(user_id, id),
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::notification::{Notification, NotificationType};
    use chrono::Utc;

    fn payload(id: &str) -> NotificationPush {
        NotificationPush::from(Notification {
            id: id.to_string(),
            user_id: "doctor-1".to_string(),
            title: "title".to_string(),
            content: "content".to_string(),
            notification_type: NotificationType::Warning,
            url: None,
            is_read: false,
            created_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_push_reaches_every_connection_of_user() {
        let registry = ConnectionRegistry::new();
        let (_, mut first) = registry.register("doctor-1");
        let (_, mut second) = registry.register("doctor-1");
        let (_, mut other) = registry.register("patient-1");

        assert!(registry.push("doctor-1", payload("n1")));
        assert_eq!(first.recv().await.unwrap().notification_id, "n1");
        assert_eq!(second.recv().await.unwrap().notification_id, "n1");
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn test_push_without_connection_is_not_delivered() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.push("nobody", payload("n1")));
    }

    #[test]
    fn test_closed_connections_are_pruned() {
        let registry = ConnectionRegistry::new();
        let (id, rx) = registry.register("doctor-1");
        drop(rx);

        assert!(!registry.push("doctor-1", payload("n1")));
        assert_eq!(registry.connection_count("doctor-1"), 0);

        // unregistering twice is harmless
        registry.unregister("doctor-1", id);
    }
}
