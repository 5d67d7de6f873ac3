//! Notification records and the dispatch façade contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use flock_core::{MemberId, TenantId};

/// Unique notification identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub Uuid);

impl NotificationId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of notification kinds this core emits.
///
/// The façade's template renderer keys off this value; the payload is a
/// free-form map it interprets per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    NewRoster,
    #[serde(rename = "reminder_24h")]
    Reminder24h,
    #[serde(rename = "reminder_1h")]
    Reminder1h,
    PresenceConfirmed,
    SubstitutionRequested,
    SubstitutionReceived,
    RosterCancelled,
    RosterUpdated,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::NewRoster => "new_roster",
            NotificationType::Reminder24h => "reminder_24h",
            NotificationType::Reminder1h => "reminder_1h",
            NotificationType::PresenceConfirmed => "presence_confirmed",
            NotificationType::SubstitutionRequested => "substitution_requested",
            NotificationType::SubstitutionReceived => "substitution_received",
            NotificationType::RosterCancelled => "roster_cancelled",
            NotificationType::RosterUpdated => "roster_updated",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification record as handed to the dispatch façade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub tenant_id: TenantId,
    pub recipient_id: MemberId,
    pub notification_type: NotificationType,
    /// Free-form key/value map consumed by the façade's template renderer.
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// Intended fire time for scheduled notifications.
    ///
    /// Scheduling only records this value; nothing here defers delivery. A
    /// delivery worker must filter on it (`is_due`) before dispatching, or
    /// the record is visible immediately.
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn immediate(
        tenant_id: TenantId,
        recipient_id: MemberId,
        notification_type: NotificationType,
        payload: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            tenant_id,
            recipient_id,
            notification_type,
            payload,
            created_at,
            scheduled_for: None,
        }
    }

    pub fn scheduled(
        tenant_id: TenantId,
        recipient_id: MemberId,
        notification_type: NotificationType,
        fire_at: DateTime<Utc>,
        payload: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            tenant_id,
            recipient_id,
            notification_type,
            payload,
            created_at,
            scheduled_for: Some(fire_at),
        }
    }

    /// Whether the record may be delivered at `now`.
    ///
    /// The filter precondition for any delivery worker: unscheduled records
    /// are always due, scheduled ones only once their fire time has passed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.scheduled_for {
            Some(fire_at) => fire_at <= now,
            None => true,
        }
    }
}

/// Notification dispatch error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NotificationError {
    #[error("notification dispatch failed: {0}")]
    Dispatch(String),
    #[error("notification storage failed: {0}")]
    Storage(String),
}

/// Dispatch façade (external collaborator).
///
/// Persists notification records and optionally pushes them to a delivery
/// channel. Consumed by the substitution workflow and the reminder
/// scheduler; never owned by this core. Callers treat failures as
/// best-effort side effects: logged, never rolled back into the primary
/// state transition.
pub trait NotificationDispatch: Send + Sync {
    /// Persist an immediately-visible notification.
    fn create_notification(
        &self,
        tenant_id: TenantId,
        recipient_id: MemberId,
        notification_type: NotificationType,
        payload: serde_json::Value,
    ) -> Result<NotificationId, NotificationError>;

    /// Persist a notification tagged with a future fire time.
    fn schedule_notification(
        &self,
        tenant_id: TenantId,
        recipient_id: MemberId,
        notification_type: NotificationType,
        fire_at: DateTime<Utc>,
        payload: serde_json::Value,
    ) -> Result<NotificationId, NotificationError>;
}

impl<D> NotificationDispatch for &D
where
    D: NotificationDispatch + ?Sized,
{
    fn create_notification(
        &self,
        tenant_id: TenantId,
        recipient_id: MemberId,
        notification_type: NotificationType,
        payload: serde_json::Value,
    ) -> Result<NotificationId, NotificationError> {
        (**self).create_notification(tenant_id, recipient_id, notification_type, payload)
    }

    fn schedule_notification(
        &self,
        tenant_id: TenantId,
        recipient_id: MemberId,
        notification_type: NotificationType,
        fire_at: DateTime<Utc>,
        payload: serde_json::Value,
    ) -> Result<NotificationId, NotificationError> {
        (**self).schedule_notification(tenant_id, recipient_id, notification_type, fire_at, payload)
    }
}

impl<D> NotificationDispatch for std::sync::Arc<D>
where
    D: NotificationDispatch + ?Sized,
{
    fn create_notification(
        &self,
        tenant_id: TenantId,
        recipient_id: MemberId,
        notification_type: NotificationType,
        payload: serde_json::Value,
    ) -> Result<NotificationId, NotificationError> {
        (**self).create_notification(tenant_id, recipient_id, notification_type, payload)
    }

    fn schedule_notification(
        &self,
        tenant_id: TenantId,
        recipient_id: MemberId,
        notification_type: NotificationType,
        fire_at: DateTime<Utc>,
        payload: serde_json::Value,
    ) -> Result<NotificationId, NotificationError> {
        (**self).schedule_notification(tenant_id, recipient_id, notification_type, fire_at, payload)
    }
}
