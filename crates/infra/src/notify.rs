//! In-memory notification dispatch for tests/dev.
//!
//! Persists notification records in process memory. There is no delivery
//! loop here: scheduled records become *visible* immediately, and `due(now)`
//! is the filter a delivery worker must apply before pushing anything to a
//! real channel.

use std::sync::RwLock;

use chrono::{DateTime, Utc};

use flock_core::{MemberId, TenantId};
use flock_notifications::{
    Notification, NotificationDispatch, NotificationError, NotificationId, NotificationType,
};

/// In-memory notification store implementing the dispatch façade.
#[derive(Debug, Default)]
pub struct InMemoryNotificationDispatch {
    records: RwLock<Vec<Notification>>,
}

impl InMemoryNotificationDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded notifications, in write order.
    pub fn all(&self) -> Vec<Notification> {
        self.records.read().map(|r| r.clone()).unwrap_or_default()
    }

    /// Records deliverable at `now` (the worker's filter precondition).
    pub fn due(&self, now: DateTime<Utc>) -> Vec<Notification> {
        self.all().into_iter().filter(|n| n.is_due(now)).collect()
    }

    /// Records addressed to one recipient.
    pub fn for_recipient(&self, recipient_id: MemberId) -> Vec<Notification> {
        self.all()
            .into_iter()
            .filter(|n| n.recipient_id == recipient_id)
            .collect()
    }

    /// Records of one kind.
    pub fn of_type(&self, notification_type: NotificationType) -> Vec<Notification> {
        self.all()
            .into_iter()
            .filter(|n| n.notification_type == notification_type)
            .collect()
    }

    fn push(&self, notification: Notification) -> Result<NotificationId, NotificationError> {
        let id = notification.id;
        let mut records = self
            .records
            .write()
            .map_err(|_| NotificationError::Storage("lock poisoned".to_string()))?;
        records.push(notification);
        Ok(id)
    }
}

impl NotificationDispatch for InMemoryNotificationDispatch {
    fn create_notification(
        &self,
        tenant_id: TenantId,
        recipient_id: MemberId,
        notification_type: NotificationType,
        payload: serde_json::Value,
    ) -> Result<NotificationId, NotificationError> {
        self.push(Notification::immediate(
            tenant_id,
            recipient_id,
            notification_type,
            payload,
            Utc::now(),
        ))
    }

    fn schedule_notification(
        &self,
        tenant_id: TenantId,
        recipient_id: MemberId,
        notification_type: NotificationType,
        fire_at: DateTime<Utc>,
        payload: serde_json::Value,
    ) -> Result<NotificationId, NotificationError> {
        self.push(Notification::scheduled(
            tenant_id,
            recipient_id,
            notification_type,
            fire_at,
            payload,
            Utc::now(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_filters_on_scheduled_fire_time() {
        let dispatch = InMemoryNotificationDispatch::new();
        let tenant = TenantId::new();
        let recipient = MemberId::new();
        let now = Utc::now();

        dispatch
            .create_notification(
                tenant,
                recipient,
                NotificationType::NewRoster,
                serde_json::json!({}),
            )
            .unwrap();
        dispatch
            .schedule_notification(
                tenant,
                recipient,
                NotificationType::Reminder24h,
                now + chrono::Duration::hours(6),
                serde_json::json!({}),
            )
            .unwrap();

        // Scheduled records are visible immediately...
        assert_eq!(dispatch.all().len(), 2);
        // ...but only the unscheduled one is due right now.
        let due_now = dispatch.due(now);
        assert_eq!(due_now.len(), 1);
        assert_eq!(due_now[0].notification_type, NotificationType::NewRoster);

        // Past the fire time, both are due.
        assert_eq!(dispatch.due(now + chrono::Duration::hours(7)).len(), 2);
    }
}
